//! Wallet transfer client.
//!
//! Moves funds from the payer's wallet to the service's receiving wallet via
//! the external wallet service:
//!
//! ```text
//! POST {PAYMENT_WALLET_BASE_URL}{PAYMENT_TRANSFER_ENDPOINT}
//! { "from_token": "...", "to_token": "...", "amount": 0.1, "currency": "TRX" }
//! ```
//!
//! The response must carry a boolean `success`; failures carry a `message`,
//! successes an opaque `data` payload. No retries are performed here.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::PaymentError;
use crate::invoker::BoxFuture;
use crate::policy::Amount;
use crate::settings::{self, PaymentSettings};
use crate::wallet::WalletId;

const REPORTED_FAILURE: &str = "Wallet transfer reported failure.";

/// Outcome of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Always `true` for a returned record.
    pub success: bool,
    /// Provider payload, passed through untouched.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Moves funds from a payer wallet to the service's receiving wallet.
pub trait WalletTransfer: Send + Sync {
    /// Debits `amount` of `currency` from `from`.
    fn transfer<'a>(
        &'a self,
        from: &'a WalletId,
        amount: Amount,
        currency: &'a str,
    ) -> BoxFuture<'a, Result<TransferRecord, PaymentError>>;
}

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    from_token: &'a str,
    to_token: &'a str,
    amount: Amount,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// [`WalletTransfer`] backed by the wallet service's HTTP API.
#[derive(Clone)]
pub struct HttpWalletTransfer {
    client: reqwest::Client,
    url: Url,
    receiving_wallet: Option<WalletId>,
}

impl std::fmt::Debug for HttpWalletTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWalletTransfer")
            .field("url", &self.url)
            .field("receiving_wallet", &self.receiving_wallet)
            .finish_non_exhaustive()
    }
}

impl HttpWalletTransfer {
    /// Creates a client for the wallet service described by `settings`.
    #[must_use]
    pub fn new(settings: &PaymentSettings) -> Self {
        Self {
            client: settings::http_client(),
            url: settings.transfer_url().clone(),
            receiving_wallet: settings.receiving_wallet.clone(),
        }
    }

    /// Replaces the underlying HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Full transfer endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    async fn post_transfer(
        &self,
        from: &WalletId,
        amount: Amount,
        currency: &str,
    ) -> Result<TransferRecord, PaymentError> {
        let to = self
            .receiving_wallet
            .as_ref()
            .ok_or(PaymentError::MissingReceivingWallet)?;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            %amount,
            currency,
            from = %from.redacted(),
            to = %to.redacted(),
            "Initiating wallet transfer"
        );

        let body = TransferRequest {
            from_token: from.as_str(),
            to_token: to.as_str(),
            amount,
            currency,
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("HTTP {status}: {text}")));
        }

        let reply: TransferResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid response: {e}")))?;

        if !reply.success {
            let message = reply
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| REPORTED_FAILURE.to_owned());
            #[cfg(feature = "telemetry")]
            tracing::error!(%message, "Wallet transfer rejected");
            return Err(PaymentError::TransferRejected(message));
        }

        #[cfg(feature = "telemetry")]
        tracing::info!(data = %reply.data, "Wallet transfer successful");

        Ok(TransferRecord {
            success: true,
            data: reply.data,
        })
    }
}

fn unavailable(detail: String) -> PaymentError {
    #[cfg(feature = "telemetry")]
    tracing::error!(error = %detail, "Wallet transfer failed");
    PaymentError::TransferUnavailable(detail)
}

impl WalletTransfer for HttpWalletTransfer {
    fn transfer<'a>(
        &'a self,
        from: &'a WalletId,
        amount: Amount,
        currency: &'a str,
    ) -> BoxFuture<'a, Result<TransferRecord, PaymentError>> {
        Box::pin(self.post_transfer(from, amount, currency))
    }
}
