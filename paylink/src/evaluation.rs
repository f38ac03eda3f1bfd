//! Evaluation client.
//!
//! Asks an external evaluator whether a tool result is good enough to be
//! charged for:
//!
//! ```text
//! POST {EVALUATOR_BASE_URL}/evaluate
//! { "tool_name": "...", "tool_input": "<json>", "tool_result": "<json>" }
//! ```
//!
//! The evaluator answers with `is_acceptable` and optionally `quality_score`,
//! `reason` and `issues`. A verdict whose `is_acceptable` is missing or `null`
//! is treated as a rejection.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::PaymentError;
use crate::invoker::BoxFuture;
use crate::settings::{self, PaymentSettings};

/// The evaluator's judgement of one tool result.
///
/// Absent and `null` fields read as their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationVerdict {
    /// Whether the result may be charged for.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_acceptable: bool,
    /// Optional quality score.
    #[serde(default)]
    pub quality_score: Option<f64>,
    /// Optional human-readable explanation.
    #[serde(default)]
    pub reason: Option<String>,
    /// Itemised problems.
    #[serde(default, deserialize_with = "null_as_default")]
    pub issues: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl EvaluationVerdict {
    /// Converts a negative verdict into the matching [`PaymentError`].
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::EvaluationRejected`] if the result is not acceptable.
    pub fn into_result(self) -> Result<Self, PaymentError> {
        if self.is_acceptable {
            Ok(self)
        } else {
            Err(PaymentError::EvaluationRejected {
                reason: self.reason,
                issues: self.issues,
            })
        }
    }
}

/// What is submitted for evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    /// Name of the tool that ran.
    pub tool_name: &'a str,
    /// Arguments the tool was called with.
    pub arguments: &'a Map<String, Value>,
    /// Tool output, already serialised to JSON.
    pub result: &'a Value,
}

/// Judges tool results.
pub trait Evaluator: Send + Sync {
    /// Evaluates one tool result.
    fn evaluate<'a>(
        &'a self,
        request: EvaluationRequest<'a>,
    ) -> BoxFuture<'a, Result<EvaluationVerdict, PaymentError>>;
}

#[derive(Debug, Serialize)]
struct EvaluateBody<'a> {
    tool_name: &'a str,
    tool_input: String,
    tool_result: String,
}

/// [`Evaluator`] backed by the evaluator service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpEvaluator {
    client: reqwest::Client,
    url: Url,
}

impl HttpEvaluator {
    /// Creates a client for the evaluator described by `settings`.
    #[must_use]
    pub fn new(settings: &PaymentSettings) -> Self {
        Self {
            client: settings::http_client(),
            url: settings.evaluate_url().clone(),
        }
    }

    /// Replaces the underlying HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Full evaluation endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    async fn post_evaluate(
        &self,
        request: EvaluationRequest<'_>,
    ) -> Result<EvaluationVerdict, PaymentError> {
        let body = EvaluateBody {
            tool_name: request.tool_name,
            tool_input: Value::Object(request.arguments.clone()).to_string(),
            tool_result: request.result.to_string(),
        };

        #[cfg(feature = "telemetry")]
        tracing::info!(tool = request.tool_name, url = %self.url, "Evaluating tool result");

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("HTTP {status}: {text}")));
        }

        let verdict: EvaluationVerdict = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid response: {e}")))?;

        #[cfg(feature = "telemetry")]
        {
            tracing::info!(
                tool = request.tool_name,
                is_acceptable = verdict.is_acceptable,
                quality_score = ?verdict.quality_score,
                "Tool evaluation received"
            );
            if let Some(reason) = &verdict.reason {
                tracing::debug!(%reason, "Evaluation reason");
            }
            if !verdict.issues.is_empty() {
                tracing::warn!(issues = ?verdict.issues, "Evaluation found issues");
            }
        }

        Ok(verdict)
    }
}

fn unavailable(detail: String) -> PaymentError {
    #[cfg(feature = "telemetry")]
    tracing::error!(error = %detail, "Tool evaluation failed");
    PaymentError::EvaluationUnavailable(detail)
}

impl Evaluator for HttpEvaluator {
    fn evaluate<'a>(
        &'a self,
        request: EvaluationRequest<'a>,
    ) -> BoxFuture<'a, Result<EvaluationVerdict, PaymentError>> {
        Box::pin(self.post_evaluate(request))
    }
}
