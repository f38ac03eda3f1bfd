//! Turns invoker outcomes into MCP tool results.
//!
//! Failures follow the MCP convention of tool errors rather than transport
//! errors: the result carries `isError: true` and the message as text. Payment
//! failures additionally name their category under
//! [`ERROR_META_KEY`](crate::ERROR_META_KEY) in `_meta`, so clients can tell a
//! missing wallet from a rejected result without parsing the message.

use paylink::invoker::{ToolCall, ToolInvoker};
use paylink::InvokeError;
use serde_json::{Map, Value};

use crate::ERROR_META_KEY;
use crate::types::{CallToolParams, CallToolResult, ContentItem};

/// Runs `params` through `invoker` and wraps the outcome.
pub async fn call_tool<I>(invoker: &I, params: CallToolParams) -> CallToolResult
where
    I: ToolInvoker<Output = Vec<ContentItem>> + ?Sized,
{
    let call = ToolCall::from(params);
    match invoker.invoke(&call).await {
        Ok(content) => CallToolResult::success(content),
        Err(err) => {
            #[cfg(feature = "telemetry")]
            {
                if let Some(payment) = err.as_payment() {
                    tracing::warn!(
                        tool = %call.name,
                        kind = %payment.kind(),
                        error = %payment,
                        "Tool call not paid for"
                    );
                } else {
                    tracing::info!(tool = %call.name, error = %err, "Tool call failed");
                }
            }
            error_result(&err)
        }
    }
}

/// Builds the error result for a failed call.
#[must_use]
pub fn error_result(err: &InvokeError) -> CallToolResult {
    let mut result = CallToolResult::error(err.to_string());
    if let Some(payment) = err.as_payment() {
        let mut meta = Map::new();
        meta.insert(
            ERROR_META_KEY.to_owned(),
            Value::String(payment.kind().as_str().to_owned()),
        );
        result.meta = Some(meta);
    }
    result
}
