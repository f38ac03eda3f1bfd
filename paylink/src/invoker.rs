//! The tool invocation seam.
//!
//! [`ToolInvoker`] is the capability "run the tool named in a [`ToolCall`]".
//! Cross-cutting wrappers such as [`PaymentGate`](crate::gate::PaymentGate)
//! implement it on top of another `ToolInvoker`, so they stack freely.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::InvokeError;

/// Boxed, sendable future used at the dyn-compatible trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request to run one tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name.
    pub name: String,
    /// Named arguments.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Creates a call without arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Adds one argument.
    #[must_use]
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Deserialises the arguments into a typed struct.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Tool`] if the arguments do not match `T`.
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> Result<T, InvokeError> {
        serde_json::from_value(Value::Object(self.arguments.clone())).map_err(InvokeError::tool)
    }
}

/// Runs tools.
pub trait ToolInvoker: Send + Sync {
    /// What a successful call produces.
    type Output: Serialize + Send + Sync;

    /// Runs the tool named in `call`.
    fn invoke<'a>(&'a self, call: &'a ToolCall) -> BoxFuture<'a, Result<Self::Output, InvokeError>>;
}

impl<I: ToolInvoker + ?Sized> ToolInvoker for Arc<I> {
    type Output = I::Output;

    fn invoke<'a>(&'a self, call: &'a ToolCall) -> BoxFuture<'a, Result<Self::Output, InvokeError>> {
        (**self).invoke(call)
    }
}

/// [`ToolInvoker`] built from an async closure. See [`invoker_fn`].
#[derive(Clone, Copy)]
pub struct InvokerFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for InvokerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokerFn").finish_non_exhaustive()
    }
}

/// Wraps an async closure as a [`ToolInvoker`].
///
/// ```rust
/// use paylink::invoker::{invoker_fn, ToolCall, ToolInvoker};
///
/// # async fn demo() {
/// let echo = invoker_fn(|call: ToolCall| async move {
///     Ok::<_, paylink::InvokeError>(call.name)
/// });
/// let out = echo.invoke(&ToolCall::new("ping")).await.unwrap();
/// assert_eq!(out, "ping");
/// # }
/// ```
pub fn invoker_fn<F, Fut, T>(f: F) -> InvokerFn<F>
where
    F: Fn(ToolCall) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, InvokeError>> + Send + 'static,
    T: Serialize + Send + Sync,
{
    InvokerFn { f }
}

impl<F, Fut, T> ToolInvoker for InvokerFn<F>
where
    F: Fn(ToolCall) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, InvokeError>> + Send + 'static,
    T: Serialize + Send + Sync,
{
    type Output = T;

    fn invoke<'a>(&'a self, call: &'a ToolCall) -> BoxFuture<'a, Result<T, InvokeError>> {
        Box::pin((self.f)(call.clone()))
    }
}
