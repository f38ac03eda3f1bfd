//! Per-tool payment policies.
//!
//! Tool-server authors declare a mapping from tool name to either a bare
//! non-negative cost (charged unconditionally) or a structured entry:
//!
//! ```json
//! {
//!   "add": 0.10,
//!   "subtract": { "base_cost": 0.10, "require_evaluation": true }
//! }
//! ```
//!
//! Declarations are resolved once, when the [`PolicyTable`] is built, into a
//! [`CostPolicy`]. Tools without an entry are [`CostPolicy::Free`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PolicyError;

/// A non-negative monetary amount.
///
/// Serialised as a JSON number, which is what the wallet service expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Returns `None` if `value` is negative.
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the underlying decimal.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())?;
        Self::new(value)
            .ok_or_else(|| rust_decimal::Error::ErrorString("amount must be non-negative".to_owned()))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

/// Structured policy declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Amount charged per successful call.
    #[serde(default)]
    pub base_cost: Decimal,
    /// Whether the result must pass the evaluator before charging.
    #[serde(default)]
    pub require_evaluation: bool,
}

/// One entry of a policy declaration, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyEntry {
    /// Bare cost: charged without evaluation.
    Cost(Decimal),
    /// Structured declaration.
    Config(ToolConfig),
}

impl From<Decimal> for PolicyEntry {
    fn from(cost: Decimal) -> Self {
        Self::Cost(cost)
    }
}

impl From<ToolConfig> for PolicyEntry {
    fn from(config: ToolConfig) -> Self {
        Self::Config(config)
    }
}

/// Resolved payment rule for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostPolicy {
    /// No charge, no evaluation.
    Free,
    /// Charged unconditionally after execution.
    Flat {
        /// Amount charged.
        amount: Amount,
    },
    /// Charged only after the evaluator accepts the result.
    Evaluated {
        /// Amount charged.
        amount: Amount,
    },
}

impl CostPolicy {
    /// Resolves a declaration for `tool`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::NegativeAmount`] for negative costs.
    pub fn from_entry(tool: &str, entry: &PolicyEntry) -> Result<Self, PolicyError> {
        let (cost, evaluated) = match entry {
            PolicyEntry::Cost(cost) => (*cost, false),
            PolicyEntry::Config(config) => (config.base_cost, config.require_evaluation),
        };
        let amount = Amount::new(cost).ok_or_else(|| PolicyError::NegativeAmount {
            tool: tool.to_owned(),
            amount: cost,
        })?;
        Ok(if evaluated {
            Self::Evaluated { amount }
        } else {
            Self::Flat { amount }
        })
    }

    /// Amount charged under this policy, `None` for [`CostPolicy::Free`].
    #[must_use]
    pub const fn amount(&self) -> Option<Amount> {
        match self {
            Self::Free => None,
            Self::Flat { amount } | Self::Evaluated { amount } => Some(*amount),
        }
    }

    /// Whether the result must be evaluated before charging.
    #[must_use]
    pub const fn requires_evaluation(&self) -> bool {
        matches!(self, Self::Evaluated { .. })
    }
}

/// Immutable mapping of tool name to [`CostPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTable {
    policies: HashMap<String, CostPolicy>,
}

impl PolicyTable {
    /// Creates an empty table: every tool is free.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from raw declarations.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::NegativeAmount`] if any cost is negative.
    pub fn from_entries<I, K>(entries: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (K, PolicyEntry)>,
        K: Into<String>,
    {
        let policies = entries
            .into_iter()
            .map(|(name, entry)| {
                let name = name.into();
                let policy = CostPolicy::from_entry(&name, &entry)?;
                Ok((name, policy))
            })
            .collect::<Result<_, PolicyError>>()?;
        Ok(Self { policies })
    }

    /// Parses a JSON policy document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] on malformed JSON or negative costs.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let entries: HashMap<String, PolicyEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Adds a flat-priced tool.
    #[must_use]
    pub fn with_flat(mut self, tool: impl Into<String>, amount: Amount) -> Self {
        self.policies
            .insert(tool.into(), CostPolicy::Flat { amount });
        self
    }

    /// Adds an evaluation-gated tool.
    #[must_use]
    pub fn with_evaluated(mut self, tool: impl Into<String>, amount: Amount) -> Self {
        self.policies
            .insert(tool.into(), CostPolicy::Evaluated { amount });
        self
    }

    /// Returns the policy for `tool`; unknown tools are free.
    #[must_use]
    pub fn resolve(&self, tool: &str) -> CostPolicy {
        self.policies.get(tool).copied().unwrap_or(CostPolicy::Free)
    }

    /// Whether any tool is priced.
    #[must_use]
    pub fn is_priced(&self) -> bool {
        !self.policies.is_empty()
    }

    /// Number of priced tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no tool is priced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Iterates over the priced tools.
    pub fn iter(&self) -> impl Iterator<Item = (&str, CostPolicy)> {
        self.policies.iter().map(|(name, policy)| (name.as_str(), *policy))
    }
}

impl<'de> Deserialize<'de> for PolicyTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = HashMap::<String, PolicyEntry>::deserialize(deserializer)?;
        Self::from_entries(entries).map_err(serde::de::Error::custom)
    }
}
