//! HTTP-level behaviour of the demo server against mocked payment services.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use paylink::PaymentSettings;
use paylink_server::{ServerConfig, app, gate};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRANSFER_PATH: &str = "/api/v1/wallets/transfer";

const CONFIG: &str = r#"
[policies]
add = 0.10
subtract = { base_cost = 0.10, require_evaluation = true }
"#;

struct Harness {
    wallet: MockServer,
    evaluator: MockServer,
    router: axum::Router,
}

impl Harness {
    async fn start(toml: &str) -> Self {
        let wallet = MockServer::start().await;
        let evaluator = MockServer::start().await;
        let settings = PaymentSettings::default()
            .with_receiving_wallet("mcp-wallet")
            .with_wallet_base_url(&wallet.uri())
            .unwrap()
            .with_evaluator_base_url(&evaluator.uri())
            .unwrap();
        let config = ServerConfig::parse_with(toml, |_| None).unwrap();
        let router = app(&config, gate(&config, &settings)).unwrap();
        Self {
            wallet,
            evaluator,
            router,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn call(&self, wallet: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut request = Request::post("/tools/call").header("content-type", "application/json");
        if let Some(wallet) = wallet {
            request = request.header("wallet_connection_string", wallet);
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

fn add(a: f64, b: f64) -> Value {
    json!({ "name": "add", "arguments": { "a": a, "b": b } })
}

#[tokio::test]
async fn health_reports_ok() {
    let harness = Harness::start("").await;
    let (status, body) = harness
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn lists_calculator_tools() {
    let harness = Harness::start(CONFIG).await;
    let (status, body) = harness
        .send(Request::get("/tools").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, ["add", "divide", "multiply", "subtract"]);
    assert_eq!(body["tools"][0]["inputSchema"]["required"], json!(["a", "b"]));
}

#[tokio::test]
async fn flat_priced_call_charges_the_header_wallet() {
    let harness = Harness::start(CONFIG).await;
    Mock::given(method("POST"))
        .and(path(TRANSFER_PATH))
        .and(body_json(json!({
            "from_token": "payer-1",
            "to_token": "mcp-wallet",
            "amount": 0.1,
            "currency": "TRX",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&harness.wallet)
        .await;

    let (status, body) = harness.call(Some("payer-1"), add(2.0, 3.0)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isError"], false);
    assert_eq!(body["content"][0]["text"], "5");
}

#[tokio::test]
async fn missing_wallet_header_is_reported_without_network_calls() {
    let harness = Harness::start(CONFIG).await;

    let (status, body) = harness.call(None, add(2.0, 3.0)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isError"], true);
    assert_eq!(body["_meta"]["paylink/error"], "missing_wallet");
    assert_eq!(
        body["content"][0]["text"],
        "Missing agent wallet connection string for payment of tool 'add'."
    );
    assert!(harness.wallet.received_requests().await.unwrap().is_empty());
    assert!(harness.evaluator.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_result_is_not_charged() {
    let harness = Harness::start(CONFIG).await;
    Mock::given(method("POST"))
        .and(path("/evaluate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_acceptable": false,
            "reason": "wrong answer",
        })))
        .expect(1)
        .mount(&harness.evaluator)
        .await;
    Mock::given(method("POST"))
        .and(path(TRANSFER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&harness.wallet)
        .await;

    let (_, body) = harness
        .call(
            Some("payer-1"),
            json!({ "name": "subtract", "arguments": { "a": 5, "b": 2 } }),
        )
        .await;

    assert_eq!(body["isError"], true);
    assert_eq!(body["_meta"]["paylink/error"], "evaluation_rejected");
    assert!(
        body["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("wrong answer")
    );
}

#[tokio::test]
async fn free_tool_needs_no_wallet() {
    let harness = Harness::start(CONFIG).await;

    let (_, body) = harness
        .call(None, json!({ "name": "divide", "arguments": { "a": 1, "b": 4 } }))
        .await;

    assert_eq!(body["isError"], false);
    assert_eq!(body["content"][0]["text"], "0.25");
}

#[tokio::test]
async fn tool_errors_are_results_not_payments() {
    let harness = Harness::start(CONFIG).await;

    let (status, body) = harness
        .call(
            Some("payer-1"),
            json!({ "name": "divide", "arguments": { "a": 1, "b": 0 } }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isError"], true);
    assert_eq!(body["content"][0]["text"], "Division by zero.");
    assert!(body.get("_meta").is_none());
}

#[tokio::test]
async fn custom_wallet_header_is_honoured() {
    let harness = Harness::start(&format!("wallet_header = \"x-payer\"\n{CONFIG}")).await;
    Mock::given(method("POST"))
        .and(path(TRANSFER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&harness.wallet)
        .await;

    let request = Request::post("/tools/call")
        .header("content-type", "application/json")
        .header("X-Payer", "payer-2")
        .body(Body::from(add(1.0, 1.0).to_string()))
        .unwrap();
    let (_, body) = harness.send(request).await;

    assert_eq!(body["isError"], false);
    let transfer: Value = harness.wallet.received_requests().await.unwrap()[0]
        .body_json()
        .unwrap();
    assert_eq!(transfer["from_token"], "payer-2");
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let harness = Harness::start(CONFIG).await;
    let request = Request::post("/tools/call")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
}

#[tokio::test]
async fn invalid_wallet_header_is_rejected() {
    let config = ServerConfig::parse_with("wallet_header = \"bad header\"", |_| None).unwrap();
    let state = gate(&config, &PaymentSettings::default());
    assert!(app(&config, state).is_err());
}
