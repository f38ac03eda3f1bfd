//! Opaque wallet identifiers.
//!
//! A [`WalletId`] is the connection string that names a funding source at the
//! wallet service. It carries no structure this crate relies on; it is only
//! ever forwarded to the wallet service as-is.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of leading characters kept visible by [`WalletId::redacted`].
const VISIBLE_PREFIX: usize = 4;

/// Opaque token identifying a wallet at the wallet service.
///
/// `Debug` prints the redacted form so identifiers do not end up in logs by
/// accident. Use [`WalletId::as_str`] when the raw value is needed on the wire.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(String);

impl WalletId {
    /// Wraps a raw wallet connection string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Wraps `value` unless it is empty or only whitespace.
    #[must_use]
    pub fn non_empty(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a log-safe rendering that keeps only a short prefix.
    #[must_use]
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(VISIBLE_PREFIX).collect();
        if prefix.len() == self.0.len() {
            "****".to_owned()
        } else {
            format!("{prefix}****")
        }
    }
}

impl fmt::Debug for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WalletId").field(&self.redacted()).finish()
    }
}

impl From<&str> for WalletId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WalletId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
