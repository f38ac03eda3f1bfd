//! Axum route handlers for the demo tool server.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use paylink::PaymentGate;
use paylink_mcp::{CallToolParams, CallToolResult, ToolInfo, ToolRegistry, call_tool};
use serde::Serialize;

use crate::error::ServerError;

/// Shared application state: the calculator behind its payment gate.
pub type AppState = Arc<PaymentGate<ToolRegistry>>;

/// Body of `GET /tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolList {
    /// Registered tools, sorted by name.
    pub tools: Vec<ToolInfo>,
}

/// `GET /health` - Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /tools` - Lists the registered tools.
pub async fn list_tools(State(gate): State<AppState>) -> Json<ToolList> {
    Json(ToolList {
        tools: gate.inner().tools(),
    })
}

/// `POST /tools/call` - Runs one tool through the payment gate.
///
/// Tool and payment failures are reported inside the [`CallToolResult`].
///
/// # Errors
///
/// Returns [`ServerError::InvalidBody`] if the body is not a tool call.
pub async fn post_call(
    State(gate): State<AppState>,
    body: Result<Json<CallToolParams>, JsonRejection>,
) -> Result<Json<CallToolResult>, ServerError> {
    let Json(params) = body?;
    Ok(Json(call_tool(gate.as_ref(), params).await))
}

/// Creates the tool routes.
///
/// Endpoints:
/// - `GET /health` - liveness probe
/// - `GET /tools` - list tools
/// - `POST /tools/call` - call a tool
pub fn tool_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(post_call))
        .with_state(state)
}
