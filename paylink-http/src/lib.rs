#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP plumbing for PayLink payment gating.
//!
//! On the server side, [`WalletLayer`] takes the payer's wallet from a request
//! header and scopes it to that request, where the
//! [`PaymentGate`](paylink::PaymentGate) picks it up. On the client side,
//! [`ClientConfig`] produces the headers a PayLink client sends.
//!
//! # Modules
//!
//! - [`constants`] - Header and environment names
//! - [`error`] - Error types
//! - [`layer`] - Tower wallet layer (feature: `server`)
//! - [`client`] - Client header configuration (feature: `client`)
//!
//! # Feature Flags
//!
//! - `server` - Tower middleware for inbound requests
//! - `client` - Outbound header configuration on top of `reqwest`
//! - `telemetry` - Enables tracing instrumentation
//! - `full` - All of the above
//!
//! The `client` and `server` modules are feature-gated, tests included; run
//! them with `cargo test-all` (`cargo test --workspace --all-features`).

pub mod constants;
pub mod error;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "server")]
pub mod layer;

#[cfg(feature = "client")]
pub use client::{ClientConfig, ClientConfigBuilder, MpesaSettings};
pub use error::ClientConfigError;
#[cfg(feature = "server")]
pub use layer::{WalletLayer, WalletService, extract_wallet};
