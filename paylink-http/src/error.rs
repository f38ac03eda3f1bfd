//! Error types for the HTTP plumbing.

/// Client configuration could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientConfigError {
    /// An `mpesa` provider was configured without all of its settings.
    #[error("Missing M-Pesa settings: {}", .0.join(", "))]
    IncompleteMpesa(Vec<&'static str>),

    /// Monetization was requested with a blank wallet.
    #[error("`wallet_connection_string` is required for monetization.")]
    MissingWalletConnection,

    /// A header name is not a valid HTTP header name.
    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    /// A configured value cannot be sent as an HTTP header.
    #[error("value for header '{0}' is not a valid HTTP header value")]
    InvalidHeaderValue(String),
}
