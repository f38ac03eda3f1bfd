//! Error types for the tool surface.

/// A tool call could not be dispatched or failed inside the tool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The arguments did not match what the tool expects.
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// What was wrong.
        reason: String,
    },

    /// The tool ran and reported a failure.
    #[error("{0}")]
    Failed(String),
}
