//! Environment-driven configuration for the payment clients.
//!
//! # Environment Variables
//!
//! - `MCP_WALLET_CONNECTION_STRING` - wallet that receives payments. Required
//!   as soon as any tool is priced; its absence surfaces per call as
//!   [`PaymentError::MissingReceivingWallet`](crate::PaymentError::MissingReceivingWallet).
//! - `PAYMENT_WALLET_BASE_URL` - wallet service base URL (default: `http://localhost:3001`)
//! - `PAYMENT_TRANSFER_ENDPOINT` - transfer path (default: `/api/v1/wallets/transfer`)
//! - `EVALUATOR_BASE_URL` - evaluator base URL (default: `https://evaluator.paylinkai.app`)
//! - `PAYMENT_CURRENCY` - currency code charged (default: `TRX`)
//!
//! Empty values count as unset.

use std::time::Duration;

use url::Url;

use crate::error::SettingsError;
use crate::wallet::WalletId;

/// Variable holding the receiving wallet connection string.
pub const RECEIVING_WALLET_ENV: &str = "MCP_WALLET_CONNECTION_STRING";
/// Variable overriding the wallet service base URL.
pub const WALLET_BASE_URL_ENV: &str = "PAYMENT_WALLET_BASE_URL";
/// Variable overriding the transfer endpoint path.
pub const TRANSFER_ENDPOINT_ENV: &str = "PAYMENT_TRANSFER_ENDPOINT";
/// Variable overriding the evaluator base URL.
pub const EVALUATOR_BASE_URL_ENV: &str = "EVALUATOR_BASE_URL";
/// Variable overriding the charging currency.
pub const CURRENCY_ENV: &str = "PAYMENT_CURRENCY";

/// Default wallet service base URL.
pub const DEFAULT_WALLET_BASE_URL: &str = "http://localhost:3001";
/// Default transfer endpoint path.
pub const DEFAULT_TRANSFER_ENDPOINT: &str = "/api/v1/wallets/transfer";
/// Default evaluator base URL.
pub const DEFAULT_EVALUATOR_BASE_URL: &str = "https://evaluator.paylinkai.app";
/// Default currency code.
pub const DEFAULT_CURRENCY: &str = "TRX";

const EVALUATE_ENDPOINT: &str = "evaluate";

/// Connect timeout for wallet service and evaluator calls.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Read timeout for wallet service and evaluator calls.
pub const READ_TIMEOUT: Duration = Duration::from_secs(20);

/// Resolved payment configuration.
///
/// Service URLs are validated when set, so the endpoint URLs handed to the
/// HTTP clients are always well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettings {
    /// Wallet receiving the payments.
    pub receiving_wallet: Option<WalletId>,
    /// Currency code charged.
    pub currency: String,
    wallet_base_url: Url,
    transfer_endpoint: String,
    evaluator_base_url: Url,
    transfer_url: Url,
    evaluate_url: Url,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        let wallet_base_url =
            Url::parse(DEFAULT_WALLET_BASE_URL).expect("Invalid wallet service URL");
        let evaluator_base_url =
            Url::parse(DEFAULT_EVALUATOR_BASE_URL).expect("Invalid evaluator URL");
        let transfer_url = join_endpoint(
            TRANSFER_ENDPOINT_ENV,
            &wallet_base_url,
            DEFAULT_TRANSFER_ENDPOINT,
        )
        .expect("Invalid transfer endpoint");
        let evaluate_url =
            join_endpoint(EVALUATOR_BASE_URL_ENV, &evaluator_base_url, EVALUATE_ENDPOINT)
                .expect("Invalid evaluate endpoint");
        Self {
            receiving_wallet: None,
            currency: DEFAULT_CURRENCY.to_owned(),
            wallet_base_url,
            transfer_endpoint: DEFAULT_TRANSFER_ENDPOINT.to_owned(),
            evaluator_base_url,
            transfer_url,
            evaluate_url,
        }
    }
}

impl PaymentSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if a URL variable is not a valid `http(s)` URL.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if a URL variable is not a valid `http(s)` URL,
    /// or the transfer endpoint does not resolve against the wallet service.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(endpoint) = read(TRANSFER_ENDPOINT_ENV) {
            settings.transfer_url =
                join_endpoint(TRANSFER_ENDPOINT_ENV, &settings.wallet_base_url, &endpoint)?;
            settings.transfer_endpoint = endpoint.trim().to_owned();
        }
        if let Some(url) = read(WALLET_BASE_URL_ENV) {
            settings = settings.with_wallet_base_url(&url)?;
        }
        if let Some(url) = read(EVALUATOR_BASE_URL_ENV) {
            settings = settings.with_evaluator_base_url(&url)?;
        }
        settings.receiving_wallet = read(RECEIVING_WALLET_ENV).and_then(WalletId::non_empty);
        if let Some(currency) = read(CURRENCY_ENV) {
            settings.currency = currency.trim().to_owned();
        }

        Ok(settings)
    }

    /// Sets the receiving wallet.
    #[must_use]
    pub fn with_receiving_wallet(mut self, wallet: impl Into<WalletId>) -> Self {
        self.receiving_wallet = Some(wallet.into());
        self
    }

    /// Sets the wallet service base URL, keeping the transfer endpoint path.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] if `url` is not a valid `http(s)` URL.
    pub fn with_wallet_base_url(mut self, url: &str) -> Result<Self, SettingsError> {
        let base = parse_base_url(WALLET_BASE_URL_ENV, url)?;
        self.transfer_url = join_endpoint(TRANSFER_ENDPOINT_ENV, &base, &self.transfer_endpoint)?;
        self.wallet_base_url = base;
        Ok(self)
    }

    /// Sets the evaluator base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] if `url` is not a valid `http(s)` URL.
    pub fn with_evaluator_base_url(mut self, url: &str) -> Result<Self, SettingsError> {
        let base = parse_base_url(EVALUATOR_BASE_URL_ENV, url)?;
        self.evaluate_url = join_endpoint(EVALUATOR_BASE_URL_ENV, &base, EVALUATE_ENDPOINT)?;
        self.evaluator_base_url = base;
        Ok(self)
    }

    /// Sets the currency code.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Wallet service base URL.
    #[must_use]
    pub const fn wallet_base_url(&self) -> &Url {
        &self.wallet_base_url
    }

    /// Transfer endpoint path, relative to the wallet service.
    #[must_use]
    pub fn transfer_endpoint(&self) -> &str {
        &self.transfer_endpoint
    }

    /// Evaluator base URL.
    #[must_use]
    pub const fn evaluator_base_url(&self) -> &Url {
        &self.evaluator_base_url
    }

    /// Full URL of the transfer endpoint.
    #[must_use]
    pub const fn transfer_url(&self) -> &Url {
        &self.transfer_url
    }

    /// Full URL of the evaluation endpoint.
    #[must_use]
    pub const fn evaluate_url(&self) -> &Url {
        &self.evaluate_url
    }
}

fn parse_base_url(key: &'static str, value: &str) -> Result<Url, SettingsError> {
    let invalid = || SettingsError::InvalidUrl {
        key,
        value: value.to_owned(),
    };
    let url = Url::parse(value.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

/// Resolves `path` below `base`, keeping any path prefix `base` already has.
fn join_endpoint(key: &'static str, base: &Url, path: &str) -> Result<Url, SettingsError> {
    let invalid = || SettingsError::InvalidUrl {
        key,
        value: path.to_owned(),
    };
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    let joined = base
        .join(path.trim().trim_start_matches('/'))
        .map_err(|_| invalid())?;
    if joined.origin() != base.origin() {
        return Err(invalid());
    }
    Ok(joined)
}

/// Builds the HTTP client shared by the wallet and evaluator clients.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(READ_TIMEOUT)
        .build()
        .expect("failed to build reqwest::Client")
}
