//! Header and environment names shared by PayLink clients and servers.

/// Header carrying the payer wallet on inbound tool calls.
///
/// Header names are case-insensitive, so this matches the
/// [`WALLET_CONNECTION_HEADER`] that clients send.
pub const DEFAULT_WALLET_HEADER: &str = "wallet_connection_string";

/// API key header (also the environment variable it is read from).
pub const PAYLINK_API_KEY_HEADER: &str = "PAYLINK_API_KEY";

/// Project header (also the environment variable it is read from).
pub const PAYLINK_PROJECT_HEADER: &str = "PAYLINK_PROJECT";

/// Tracing header (also the environment variable it is read from).
pub const PAYLINK_TRACING_HEADER: &str = "PAYLINK_TRACING";

/// Payment provider header; the value is a JSON list of provider names.
pub const PAYMENT_PROVIDER_HEADER: &str = "PAYMENT_PROVIDER";

/// Wallet connection header sent by monetizing clients.
pub const WALLET_CONNECTION_HEADER: &str = "WALLET_CONNECTION_STRING";

/// Headers a PayLink server expects by default.
pub const DEFAULT_REQUIRED_HEADERS: [&str; 4] = [
    PAYLINK_API_KEY_HEADER,
    PAYLINK_PROJECT_HEADER,
    PAYLINK_TRACING_HEADER,
    PAYMENT_PROVIDER_HEADER,
];

/// Value of [`PAYLINK_TRACING_HEADER`] that turns tracing on.
pub const TRACING_ENABLED: &str = "enabled";

/// Provider name that requires M-Pesa settings.
pub const MPESA_PROVIDER: &str = "mpesa";

/// M-Pesa settings, each sent as a header of the same name.
pub const MPESA_KEYS: [&str; 6] = [
    "MPESA_BUSINESS_SHORTCODE",
    "MPESA_CONSUMER_SECRET",
    "MPESA_CONSUMER_KEY",
    "MPESA_CALLBACK_URL",
    "MPESA_PASSKEY",
    "MPESA_BASE_URL",
];
