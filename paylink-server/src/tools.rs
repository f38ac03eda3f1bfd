//! Calculator tools served by the demo.

use paylink::InvokeError;
use paylink::invoker::ToolCall;
use paylink_mcp::{ContentItem, ToolError, ToolInfo, ToolRegistry};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, Deserialize)]
struct Operands {
    a: f64,
    b: f64,
}

fn operands_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "a": { "type": "number" },
            "b": { "type": "number" }
        },
        "required": ["a", "b"]
    })
}

fn parse_operands(call: &ToolCall) -> Result<Operands, InvokeError> {
    call.parse_arguments::<Operands>().map_err(|err| {
        InvokeError::tool(ToolError::InvalidArguments {
            tool: call.name.clone(),
            reason: err.to_string(),
        })
    })
}

fn number(value: f64) -> Vec<ContentItem> {
    vec![ContentItem::text(value.to_string())]
}

fn binary(name: &str, description: &str) -> ToolInfo {
    ToolInfo::new(name)
        .with_description(description)
        .with_input_schema(operands_schema())
}

/// Builds the registry with `add`, `subtract`, `multiply` and `divide`.
#[must_use]
pub fn calculator() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(binary("add", "Add two numbers."), add)
        .with_tool(binary("subtract", "Subtract b from a."), subtract)
        .with_tool(binary("multiply", "Multiply two numbers."), multiply)
        .with_tool(binary("divide", "Divide a by b."), divide)
}

async fn add(call: ToolCall) -> Result<Vec<ContentItem>, InvokeError> {
    let Operands { a, b } = parse_operands(&call)?;
    Ok(number(a + b))
}

async fn subtract(call: ToolCall) -> Result<Vec<ContentItem>, InvokeError> {
    let Operands { a, b } = parse_operands(&call)?;
    Ok(number(a - b))
}

async fn multiply(call: ToolCall) -> Result<Vec<ContentItem>, InvokeError> {
    let Operands { a, b } = parse_operands(&call)?;
    Ok(number(a * b))
}

async fn divide(call: ToolCall) -> Result<Vec<ContentItem>, InvokeError> {
    let Operands { a, b } = parse_operands(&call)?;
    if b == 0.0 {
        return Err(InvokeError::tool(ToolError::Failed(
            "Division by zero.".to_owned(),
        )));
    }
    Ok(number(a / b))
}
