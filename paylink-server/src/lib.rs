//! Demo tool server for PayLink payment gating.
//!
//! Serves four calculator tools over HTTP. Each request's payer wallet is
//! taken from a header by [`WalletLayer`], and tool calls go through a
//! [`PaymentGate`] configured from [`ServerConfig::policies`] and the
//! environment's [`PaymentSettings`].
//!
//! # Modules
//!
//! - [`config`] - TOML server configuration
//! - [`error`] - Server error types
//! - [`handlers`] - Axum route handlers and router builder
//! - [`tools`] - The calculator tools

pub mod config;
pub mod error;
pub mod handlers;
pub mod tools;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderName;
use paylink::{PaymentGate, PaymentSettings};
use paylink_http::WalletLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::{ConfigError, ServerError, StartupError};
pub use handlers::{AppState, tool_router};

/// Builds the gate around the calculator tools.
#[must_use]
pub fn gate(config: &ServerConfig, settings: &PaymentSettings) -> AppState {
    Arc::new(PaymentGate::from_settings(
        tools::calculator(),
        config.policies.clone(),
        settings,
    ))
}

/// Builds the full application router.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidHeader`] if `config.wallet_header` is not a
/// valid header name.
pub fn app(config: &ServerConfig, state: AppState) -> Result<Router, ConfigError> {
    let header = HeaderName::try_from(config.wallet_header.as_str())
        .map_err(|_| ConfigError::InvalidHeader(config.wallet_header.clone()))?;
    Ok(tool_router(state)
        .layer(WalletLayer::with_header(header))
        .layer(TraceLayer::new_for_http()))
}
