//! Name-dispatching tool registry.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use paylink::invoker::{BoxFuture, ToolCall, ToolInvoker};
use paylink::InvokeError;

use crate::error::ToolError;
use crate::types::{ContentItem, ToolInfo};

type Handler =
    Arc<dyn Fn(ToolCall) -> BoxFuture<'static, Result<Vec<ContentItem>, InvokeError>> + Send + Sync>;

struct RegisteredTool {
    info: ToolInfo,
    handler: Handler,
}

/// A set of named tools, dispatched by [`ToolCall::name`].
///
/// The registry is itself a [`ToolInvoker`], so it can be wrapped in a
/// [`PaymentGate`](paylink::PaymentGate) as a whole.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `info.name`, replacing any previous tool of
    /// that name.
    pub fn register<F, Fut>(&mut self, info: ToolInfo, handler: F)
    where
        F: Fn(ToolCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<ContentItem>, InvokeError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(
            move |call: ToolCall| -> BoxFuture<'static, Result<Vec<ContentItem>, InvokeError>> {
                Box::pin(handler(call))
            },
        );
        self.tools
            .insert(info.name.clone(), RegisteredTool { info, handler });
    }

    /// Builder-style [`ToolRegistry::register`].
    #[must_use]
    pub fn with_tool<F, Fut>(mut self, info: ToolInfo, handler: F) -> Self
    where
        F: Fn(ToolCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<ContentItem>, InvokeError>> + Send + 'static,
    {
        self.register(info, handler);
        self
    }

    /// Descriptions of all tools, sorted by name.
    #[must_use]
    pub fn tools(&self) -> Vec<ToolInfo> {
        self.tools.values().map(|t| t.info.clone()).collect()
    }

    /// Whether a tool named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolInvoker for ToolRegistry {
    type Output = Vec<ContentItem>;

    fn invoke<'a>(
        &'a self,
        call: &'a ToolCall,
    ) -> BoxFuture<'a, Result<Vec<ContentItem>, InvokeError>> {
        match self.tools.get(&call.name) {
            Some(tool) => (tool.handler)(call.clone()),
            None => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(tool = %call.name, "Call to unknown tool");
                let err = InvokeError::tool(ToolError::UnknownTool(call.name.clone()));
                Box::pin(std::future::ready(Err(err)))
            }
        }
    }
}
