#![cfg_attr(docsrs, feature(doc_cfg))]

//! MCP-shaped tool surface for PayLink payment gating.
//!
//! Provides the JSON shapes of MCP tool calls, a [`ToolRegistry`] that
//! dispatches calls by tool name, and [`call_tool`], which runs a call through
//! any [`ToolInvoker`](paylink::ToolInvoker) (typically a
//! [`PaymentGate`](paylink::PaymentGate) around a registry) and turns the
//! outcome into a [`CallToolResult`].
//!
//! # Server Usage
//!
//! ```rust,ignore
//! use paylink_mcp::{call_tool, ToolInfo, ToolRegistry};
//!
//! let tools = ToolRegistry::new().with_tool(ToolInfo::new("add"), add);
//! let gate = PaymentGate::from_settings(tools, policies, &settings);
//!
//! // inside a request handler, within a wallet scope
//! let result = call_tool(&gate, params).await;
//! ```
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod call;
pub mod error;
pub mod registry;
pub mod types;

pub use call::{call_tool, error_result};
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use types::{CallToolParams, CallToolResult, ContentItem, ToolInfo};

/// MCP `_meta` key naming the category of a payment failure.
pub const ERROR_META_KEY: &str = "paylink/error";
