//! Outbound PayLink headers for SDK clients.
//!
//! A [`ClientConfig`] gathers the credentials and payment preferences a client
//! sends to a PayLink server, either from explicit values or from the
//! environment, and renders them as request headers.
//!
//! | Header / variable          | Source                                        |
//! |----------------------------|-----------------------------------------------|
//! | `PAYLINK_API_KEY`          | explicit or environment                       |
//! | `PAYLINK_PROJECT`          | explicit or environment                       |
//! | `PAYLINK_TRACING`          | sent only when the value is `enabled`         |
//! | `PAYMENT_PROVIDER`         | JSON list, explicit or environment            |
//! | `MPESA_*`                  | environment, required when `mpesa` is chosen  |
//! | `WALLET_CONNECTION_STRING` | environment or [`ClientConfig::with_monetization`] |

use std::collections::BTreeMap;
use std::fmt;

use paylink::WalletId;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::constants::{
    DEFAULT_REQUIRED_HEADERS, MPESA_KEYS, MPESA_PROVIDER, PAYLINK_API_KEY_HEADER,
    PAYLINK_PROJECT_HEADER, PAYLINK_TRACING_HEADER, PAYMENT_PROVIDER_HEADER, TRACING_ENABLED,
    WALLET_CONNECTION_HEADER,
};
use crate::error::ClientConfigError;

/// M-Pesa credentials forwarded as headers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MpesaSettings {
    values: BTreeMap<&'static str, String>,
}

impl fmt::Debug for MpesaSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

impl MpesaSettings {
    /// Reads every `MPESA_*` key through `lookup`; empty values are dropped.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let values = MPESA_KEYS
            .iter()
            .filter_map(|&key| {
                lookup(key)
                    .filter(|v| !v.is_empty())
                    .map(|v| (key, v))
            })
            .collect();
        Self { values }
    }

    /// Value of one `MPESA_*` key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Keys that have no value, in declaration order.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        MPESA_KEYS
            .iter()
            .copied()
            .filter(|key| !self.values.contains_key(key))
            .collect()
    }

    /// Fails unless every key has a value.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::IncompleteMpesa`] listing the missing keys.
    pub fn ensure_complete(&self) -> Result<(), ClientConfigError> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClientConfigError::IncompleteMpesa(missing))
        }
    }
}

/// Resolved client-side configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    api_key: Option<String>,
    project: Option<String>,
    tracing: Option<String>,
    payment_providers: Vec<String>,
    required_headers: Vec<String>,
    mpesa: Option<MpesaSettings>,
    monetization: Option<WalletId>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("project", &self.project)
            .field("tracing", &self.tracing)
            .field("payment_providers", &self.payment_providers)
            .field("required_headers", &self.required_headers)
            .field("mpesa", &self.mpesa)
            .field("monetization", &self.monetization)
            .finish()
    }
}

impl ClientConfig {
    /// Starts resolving a configuration for the server at `base_url`.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            base_url: base_url.into(),
            api_key: None,
            project: None,
            tracing: None,
            payment_providers: None,
            required_headers: None,
            monetization_from_env: true,
        }
    }

    /// Server base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API key, if any.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Project name, if any.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Whether tracing was requested.
    #[must_use]
    pub fn tracing_enabled(&self) -> bool {
        self.tracing
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(TRACING_ENABLED))
    }

    /// Payment providers, trimmed and without blanks.
    #[must_use]
    pub fn payment_providers(&self) -> &[String] {
        &self.payment_providers
    }

    /// Header names the server is expected to require.
    #[must_use]
    pub fn required_headers(&self) -> &[String] {
        &self.required_headers
    }

    /// M-Pesa settings, present when an `mpesa` provider is configured.
    #[must_use]
    pub const fn mpesa(&self) -> Option<&MpesaSettings> {
        self.mpesa.as_ref()
    }

    /// Wallet paying for monetized tool calls, if any.
    #[must_use]
    pub const fn monetization(&self) -> Option<&WalletId> {
        self.monetization.as_ref()
    }

    /// Returns a copy that pays with `wallet` and requires `extra` headers.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::MissingWalletConnection`] if `wallet` is blank.
    pub fn with_monetization(
        &self,
        wallet: impl Into<String>,
        extra: &[&str],
    ) -> Result<Self, ClientConfigError> {
        let wallet = WalletId::non_empty(wallet).ok_or(ClientConfigError::MissingWalletConnection)?;
        let mut next = self.clone();
        next.monetization = Some(wallet);
        push_unique(&mut next.required_headers, WALLET_CONNECTION_HEADER);
        for header in extra {
            push_unique(&mut next.required_headers, header);
        }
        Ok(next)
    }

    /// Header name/value pairs, sorted by name.
    #[must_use]
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs: Vec<(&'static str, String)> = Vec::new();
        if let Some(key) = &self.api_key {
            pairs.push((PAYLINK_API_KEY_HEADER, key.clone()));
        }
        if self.tracing_enabled() {
            pairs.push((PAYLINK_TRACING_HEADER, TRACING_ENABLED.to_owned()));
        }
        if let Some(project) = &self.project {
            pairs.push((PAYLINK_PROJECT_HEADER, project.clone()));
        }
        if !self.payment_providers.is_empty() {
            pairs.push((
                PAYMENT_PROVIDER_HEADER,
                serde_json::Value::from(self.payment_providers.clone()).to_string(),
            ));
        }
        if let Some(mpesa) = &self.mpesa {
            pairs.extend(mpesa.values.iter().map(|(k, v)| (*k, v.clone())));
        }
        if let Some(wallet) = &self.monetization {
            pairs.push((WALLET_CONNECTION_HEADER, wallet.as_str().to_owned()));
        }
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
    }

    /// Renders the configuration as request headers.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::InvalidHeaderValue`] if a value cannot be
    /// sent as an HTTP header.
    pub fn headers(&self) -> Result<HeaderMap, ClientConfigError> {
        let mut map = HeaderMap::new();
        for (name, value) in self.header_pairs() {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientConfigError::InvalidHeaderName(name.to_owned()))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|_| ClientConfigError::InvalidHeaderValue(name.to_owned()))?;
            map.insert(header, value);
        }
        Ok(map)
    }
}

/// Builder for [`ClientConfig`]; explicit values take precedence over the
/// environment.
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    base_url: String,
    api_key: Option<String>,
    project: Option<String>,
    tracing: Option<String>,
    payment_providers: Option<Vec<String>>,
    required_headers: Option<Vec<String>>,
    monetization_from_env: bool,
}

impl ClientConfigBuilder {
    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the project.
    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Sets the tracing flag; only `enabled` turns tracing on.
    #[must_use]
    pub fn tracing(mut self, tracing: impl Into<String>) -> Self {
        self.tracing = Some(tracing.into());
        self
    }

    /// Sets the payment providers, ignoring the environment.
    #[must_use]
    pub fn payment_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.payment_providers = Some(providers.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the default required header list.
    #[must_use]
    pub fn required_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `WALLET_CONNECTION_STRING` is picked up from the environment
    /// (default: yes).
    #[must_use]
    pub const fn monetization_from_env(mut self, enabled: bool) -> Self {
        self.monetization_from_env = enabled;
        self
    }

    /// Resolves against the process environment.
    ///
    /// # Errors
    ///
    /// See [`ClientConfigBuilder::resolve_with`].
    pub fn resolve(self) -> Result<ClientConfig, ClientConfigError> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolves against an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::IncompleteMpesa`] when an `mpesa` provider
    /// is configured without every `MPESA_*` value.
    pub fn resolve_with<F>(self, lookup: F) -> Result<ClientConfig, ClientConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let api_key = non_empty(self.api_key).or_else(|| non_empty(lookup(PAYLINK_API_KEY_HEADER)));
        let project = non_empty(self.project).or_else(|| non_empty(lookup(PAYLINK_PROJECT_HEADER)));
        let tracing = non_empty(self.tracing)
            .or_else(|| lookup(PAYLINK_TRACING_HEADER))
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());

        let payment_providers = match self.payment_providers {
            Some(providers) => normalise_providers(providers),
            None => providers_from(lookup(PAYMENT_PROVIDER_HEADER).as_deref()),
        };

        let mpesa = if payment_providers
            .iter()
            .any(|p| p.eq_ignore_ascii_case(MPESA_PROVIDER))
        {
            let settings = MpesaSettings::from_lookup(&lookup);
            settings.ensure_complete()?;
            Some(settings)
        } else {
            None
        };

        let monetization = if self.monetization_from_env {
            lookup(WALLET_CONNECTION_HEADER).and_then(WalletId::non_empty)
        } else {
            None
        };

        let mut required_headers = self.required_headers.unwrap_or_else(|| {
            DEFAULT_REQUIRED_HEADERS
                .iter()
                .map(|&h| h.to_owned())
                .collect()
        });
        if monetization.is_some() {
            push_unique(&mut required_headers, WALLET_CONNECTION_HEADER);
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            providers = ?payment_providers,
            mpesa = mpesa.is_some(),
            monetized = monetization.is_some(),
            "Resolved PayLink client configuration"
        );

        Ok(ClientConfig {
            base_url: self.base_url,
            api_key,
            project,
            tracing,
            payment_providers,
            required_headers,
            mpesa,
            monetization,
        })
    }
}

fn normalise_providers(providers: Vec<String>) -> Vec<String> {
    providers
        .into_iter()
        .map(|p| p.trim().to_owned())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Parses a JSON list of provider names; anything else yields no providers.
fn providers_from(raw: Option<&str>) -> Vec<String> {
    let Some(Ok(serde_json::Value::Array(items))) =
        raw.map(serde_json::from_str::<serde_json::Value>)
    else {
        return Vec::new();
    };
    let names = items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();
    normalise_providers(names)
}

fn push_unique(list: &mut Vec<String>, header: &str) {
    if !list.iter().any(|h| h == header) {
        list.push(header.to_owned());
    }
}
