#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Wallet-based payment gating for tool-calling servers.
//!
//! A tool server declares which of its tools cost money. Each call to a priced
//! tool is executed, optionally checked by an external evaluator, and then
//! paid for by moving funds from the caller's wallet to the server's wallet.
//! The result is released only once the payment succeeded.
//!
//! # Overview
//!
//! The caller's wallet travels as request-scoped state: an HTTP layer installs
//! it in the [`context`] store when a request arrives, and the
//! [`PaymentGate`] reads it from there without touching the tool's signature.
//!
//! ```rust,no_run
//! use paylink::invoker::{invoker_fn, ToolCall, ToolInvoker};
//! use paylink::{context, PaymentGate, PaymentSettings, PolicyTable, WalletId};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let tools = invoker_fn(|call: ToolCall| async move {
//!     Ok::<_, paylink::InvokeError>(format!("ran {}", call.name))
//! });
//! let policies = PolicyTable::from_json(r#"{"add": 0.10}"#)?;
//! let gate = PaymentGate::from_settings(tools, policies, &PaymentSettings::from_env()?);
//!
//! let reply = context::with_wallet(Some(WalletId::new("w1")), gate.invoke(&ToolCall::new("add")))
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`context`] - Task-local store for the payer wallet
//! - [`evaluation`] - Client for the result evaluator
//! - [`gate`] - The payment gate
//! - [`invoker`] - The tool invocation seam
//! - [`policy`] - Per-tool payment policies
//! - [`settings`] - Environment configuration
//! - [`transfer`] - Client for the wallet service
//! - [`wallet`] - Wallet identifiers
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod context;
pub mod error;
pub mod evaluation;
pub mod gate;
pub mod invoker;
pub mod policy;
pub mod settings;
pub mod transfer;
pub mod wallet;

pub use error::{
    BoxError, ContextError, InvokeError, PaymentError, PaymentErrorKind, PolicyError,
    SettingsError,
};
pub use evaluation::{EvaluationVerdict, Evaluator, HttpEvaluator};
pub use gate::{PaymentGate, PaymentGateBuilder};
pub use invoker::{ToolCall, ToolInvoker};
pub use policy::{Amount, CostPolicy, PolicyEntry, PolicyTable, ToolConfig};
pub use settings::PaymentSettings;
pub use transfer::{HttpWalletTransfer, TransferRecord, WalletTransfer};
pub use wallet::WalletId;
