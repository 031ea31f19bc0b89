//! Named quotas and their limits.

use super::identity::KeyStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

/// Quota classes selected by request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaName {
    /// Conversational turns.
    Chat,
    /// Search queries.
    Search,
    /// General API calls.
    Api,
    /// File uploads.
    Upload,
    /// Generic analysis jobs.
    Analysis,
    /// Facility-wide analysis, the most expensive class.
    FacilityAnalysis,
    /// Document export.
    Export,
    /// Administrative operations.
    Admin,
    /// Anything without a dedicated class.
    Default,
}

impl QuotaName {
    /// Every quota, in display order.
    pub const ALL: [QuotaName; 9] = [
        QuotaName::Chat,
        QuotaName::Search,
        QuotaName::Api,
        QuotaName::Upload,
        QuotaName::Analysis,
        QuotaName::FacilityAnalysis,
        QuotaName::Export,
        QuotaName::Admin,
        QuotaName::Default,
    ];

    /// Stable label used in config, logs and counter keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaName::Chat => "chat",
            QuotaName::Search => "search",
            QuotaName::Api => "api",
            QuotaName::Upload => "upload",
            QuotaName::Analysis => "analysis",
            QuotaName::FacilityAnalysis => "facility_analysis",
            QuotaName::Export => "export",
            QuotaName::Admin => "admin",
            QuotaName::Default => "default",
        }
    }
}

impl fmt::Display for QuotaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuotaName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        QuotaName::ALL
            .into_iter()
            .find(|name| name.as_str() == normalized)
            .ok_or_else(|| format!("unknown quota '{}'", s))
    }
}

/// Limit applied to one quota class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Requests admitted per window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// How callers are keyed.
    #[serde(default)]
    pub key_strategy: KeyStrategy,
}

impl Quota {
    /// Creates a quota keyed by caller identity.
    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self { max_requests, window_ms, key_strategy: KeyStrategy::Identity }
    }

    /// Sets the key strategy.
    #[must_use]
    pub const fn with_key_strategy(mut self, key_strategy: KeyStrategy) -> Self {
        self.key_strategy = key_strategy;
        self
    }

    /// Built-in limit for a quota class.
    pub const fn default_for(name: QuotaName) -> Self {
        match name {
            QuotaName::Chat => Self::new(100, HOUR_MS),
            QuotaName::Search => Self::new(200, HOUR_MS),
            QuotaName::Api => Self::new(1000, HOUR_MS),
            QuotaName::Upload => Self::new(50, HOUR_MS),
            QuotaName::Analysis => Self::new(20, HOUR_MS),
            QuotaName::FacilityAnalysis => Self::new(5, 15 * MINUTE_MS),
            QuotaName::Export => Self::new(30, HOUR_MS),
            QuotaName::Admin => Self::new(100, HOUR_MS),
            QuotaName::Default => Self::new(500, HOUR_MS),
        }
    }
}

/// Effective limits for every quota class.
///
/// Lookups are total: a class without an override uses its built-in limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaTable {
    overrides: HashMap<QuotaName, Quota>,
}

impl QuotaTable {
    /// Creates a table with the built-in limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the limit for one class.
    #[must_use]
    pub fn with(mut self, name: QuotaName, quota: Quota) -> Self {
        self.set(name, quota);
        self
    }

    /// Replaces the limit for one class in place.
    pub fn set(&mut self, name: QuotaName, quota: Quota) {
        self.overrides.insert(name, quota);
    }

    /// Effective limit for a class.
    pub fn get(&self, name: QuotaName) -> Quota {
        self.overrides.get(&name).copied().unwrap_or_else(|| Quota::default_for(name))
    }

    /// Every class with its effective limit, in display order.
    pub fn iter(&self) -> impl Iterator<Item = (QuotaName, Quota)> + '_ {
        QuotaName::ALL.into_iter().map(|name| (name, self.get(name)))
    }
}
