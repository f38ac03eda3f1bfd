//! Error types for payment gating.
//!
//! [`PaymentError`] is the single failure kind surfaced when a priced tool
//! call could not be paid for. [`InvokeError`] is the error type of the
//! [`ToolInvoker`](crate::invoker::ToolInvoker) seam and separates payment
//! failures from failures of the wrapped tool itself.

use std::fmt;

/// Boxed error produced by a wrapped tool.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A payment for a tool call could not be completed.
///
/// All variants share one meaning: the tool's result must not be released to
/// the caller. Use [`PaymentError::kind`] to branch on the category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PaymentError {
    /// The service's own receiving wallet is not configured.
    #[error(
        "Missing MCP_WALLET_CONNECTION_STRING environment configuration for MCP wallet connection string."
    )]
    MissingReceivingWallet,

    /// A priced tool was called without a payer wallet in the request context.
    #[error("Missing agent wallet connection string for payment of tool '{tool}'.")]
    MissingPayerWallet {
        /// Name of the priced tool.
        tool: String,
    },

    /// The evaluator could not be reached or answered with garbage.
    #[error("Tool evaluation failed: {0}")]
    EvaluationUnavailable(String),

    /// The evaluator judged the tool result unacceptable.
    #[error("{}", rejection_message(.reason.as_deref(), .issues))]
    EvaluationRejected {
        /// Evaluator's explanation, if any.
        reason: Option<String>,
        /// Itemised problems reported by the evaluator.
        issues: Vec<String>,
    },

    /// The wallet service could not be reached or answered with garbage.
    #[error("Wallet transfer failed: {0}")]
    TransferUnavailable(String),

    /// The wallet service processed the transfer and reported failure.
    #[error("{0}")]
    TransferRejected(String),
}

fn rejection_message(reason: Option<&str>, issues: &[String]) -> String {
    let mut message = String::from("Tool result failed evaluation; not charging.");
    if let Some(reason) = reason.filter(|r| !r.is_empty()) {
        message.push_str(" Reason: ");
        message.push_str(reason);
    }
    if !issues.is_empty() {
        message.push_str(" Issues: ");
        message.push_str(&issues.join("; "));
    }
    message
}

/// Flat category of a [`PaymentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentErrorKind {
    /// Deployment is misconfigured; retrying will not help.
    Misconfigured,
    /// The request lacked a payer wallet.
    MissingWallet,
    /// Evaluator unreachable or malformed response.
    Evaluation,
    /// Evaluator rejected the result.
    Rejected,
    /// Wallet service unreachable, malformed response, or reported failure.
    Transfer,
}

impl PaymentErrorKind {
    /// Stable machine-readable name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Misconfigured => "misconfigured",
            Self::MissingWallet => "missing_wallet",
            Self::Evaluation => "evaluation_failed",
            Self::Rejected => "evaluation_rejected",
            Self::Transfer => "transfer_failed",
        }
    }
}

impl fmt::Display for PaymentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PaymentError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> PaymentErrorKind {
        match self {
            Self::MissingReceivingWallet => PaymentErrorKind::Misconfigured,
            Self::MissingPayerWallet { .. } => PaymentErrorKind::MissingWallet,
            Self::EvaluationUnavailable(_) => PaymentErrorKind::Evaluation,
            Self::EvaluationRejected { .. } => PaymentErrorKind::Rejected,
            Self::TransferUnavailable(_) | Self::TransferRejected(_) => PaymentErrorKind::Transfer,
        }
    }
}

/// Error returned by a [`ToolInvoker`](crate::invoker::ToolInvoker).
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The tool itself failed; no payment was attempted.
    #[error(transparent)]
    Tool(BoxError),

    /// The tool ran but its payment could not be completed.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl InvokeError {
    /// Wraps any error raised by a tool.
    pub fn tool(err: impl Into<BoxError>) -> Self {
        Self::Tool(err.into())
    }

    /// Returns the payment error, if this is one.
    #[must_use]
    pub const fn as_payment(&self) -> Option<&PaymentError> {
        match self {
            Self::Payment(err) => Some(err),
            Self::Tool(_) => None,
        }
    }
}

/// A policy declaration could not be accepted.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// A cost was below zero.
    #[error("cost for tool '{tool}' must be non-negative, got {amount}")]
    NegativeAmount {
        /// Offending tool name.
        tool: String,
        /// Declared amount.
        amount: rust_decimal::Decimal,
    },

    /// The policy document could not be parsed.
    #[error("invalid policy declaration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Environment configuration could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A URL setting is not an absolute `http(s)` URL.
    #[error("{key} must be an http(s) URL, got '{value}'")]
    InvalidUrl {
        /// Environment variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// The wallet context store was used outside an established scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no wallet context scope is active for the current task")]
pub struct ContextError;
