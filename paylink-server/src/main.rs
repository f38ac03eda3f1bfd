//! PayLink demo tool server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (paylink.toml in current directory)
//! cargo run -p paylink-server --release
//!
//! # Run with custom config path
//! CONFIG=/path/to/paylink.toml cargo run -p paylink-server
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p paylink-server
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `paylink.toml`)
//! - `HOST` / `PORT` - Override the bind address
//! - `MCP_WALLET_CONNECTION_STRING` - Wallet receiving the payments
//! - `PAYMENT_WALLET_BASE_URL`, `PAYMENT_TRANSFER_ENDPOINT` - Wallet service
//! - `EVALUATOR_BASE_URL` - Result evaluator
//! - `PAYMENT_CURRENCY` - Currency charged (default: `TRX`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::path::PathBuf;

use clap::Parser;
use paylink::PaymentSettings;
use tracing_subscriber::EnvFilter;

use paylink_server::config::DEFAULT_CONFIG_PATH;
use paylink_server::{ServerConfig, StartupError};

#[derive(Debug, Parser)]
#[command(version, about = "Calculator tools behind PayLink payment gating")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), StartupError> {
    let config = ServerConfig::load(&args.config)?;
    let settings = PaymentSettings::from_env()?;
    tracing::info!(
        addr = %config.addr(),
        wallet_header = %config.wallet_header,
        priced_tools = config.policies.len(),
        currency = %settings.currency,
        "Loaded configuration"
    );

    if settings.receiving_wallet.is_none() {
        tracing::warn!("MCP_WALLET_CONNECTION_STRING is not set; priced tools will fail to charge");
    }
    for (tool, policy) in config.policies.iter() {
        tracing::info!(tool, ?policy, "Priced tool");
    }

    let state = paylink_server::gate(&config, &settings);
    let app = paylink_server::app(&config, state)?;

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!("Tool server listening on http://{}", config.addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Tool server shut down gracefully");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM (Unix) to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down..."),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for Ctrl-C");
        tracing::info!("Received Ctrl-C, shutting down...");
    }
}
