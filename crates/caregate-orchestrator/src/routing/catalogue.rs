//! Backend catalogue and its TOML configuration.

use super::types::{BackendProfile, BackendTier};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while building a catalogue.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// I/O error reading the file.
    #[error("Failed to read catalogue file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("Failed to parse catalogue TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Catalogue validation error.
    #[error("Invalid catalogue: {0}")]
    Validation(String),
}

/// Result type for catalogue operations.
pub type Result<T> = std::result::Result<T, CatalogueError>;

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    backends: Vec<BackendProfile>,
}

/// Immutable table of the backends the router may select.
///
/// Every tier is guaranteed to have at least one backend, so tier lookups are
/// total. When a tier lists several backends the first one listed serves it.
#[derive(Debug, Clone)]
pub struct BackendCatalogue {
    profiles: Vec<BackendProfile>,
    top: usize,
    mid: usize,
    low_latency: usize,
    cheapest: usize,
}

impl BackendCatalogue {
    /// Builds a catalogue from explicit profiles.
    ///
    /// # Errors
    /// Returns `CatalogueError::Validation` if an id is empty or repeated, a
    /// cost is negative or not finite, `max_tokens` is zero, or a tier has no
    /// backend.
    pub fn from_profiles(profiles: Vec<BackendProfile>) -> Result<Self> {
        let mut seen = HashSet::new();
        for profile in &profiles {
            if profile.id.trim().is_empty() {
                return Err(CatalogueError::Validation("backend id must not be empty".to_string()));
            }
            if !seen.insert(profile.id.as_str()) {
                return Err(CatalogueError::Validation(format!(
                    "backend '{}' is listed more than once",
                    profile.id
                )));
            }
            if !profile.cost_per_1k_tokens.is_finite() || profile.cost_per_1k_tokens < 0.0 {
                return Err(CatalogueError::Validation(format!(
                    "backend '{}': cost_per_1k_tokens must be a finite value >= 0.0",
                    profile.id
                )));
            }
            if profile.max_tokens == 0 {
                return Err(CatalogueError::Validation(format!(
                    "backend '{}': max_tokens must be greater than 0",
                    profile.id
                )));
            }
        }

        let position = |tier: BackendTier| {
            profiles.iter().position(|p| p.tier == tier).ok_or_else(|| {
                CatalogueError::Validation(format!("no backend configured for tier '{}'", tier))
            })
        };
        let top = position(BackendTier::Top)?;
        let mid = position(BackendTier::Mid)?;
        let low_latency = position(BackendTier::LowLatency)?;

        // Ties keep the earliest entry.
        let cheapest = profiles
            .iter()
            .enumerate()
            .fold(0, |best, (idx, p)| {
                if p.cost_per_1k_tokens < profiles[best].cost_per_1k_tokens { idx } else { best }
            });

        Ok(Self { profiles, top, mid, low_latency, cheapest })
    }

    /// Parses a catalogue from TOML text with a `[[backends]]` array.
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed or the catalogue is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogueFile = toml::from_str(content)?;
        Self::from_profiles(file.backends)
    }

    /// Loads a catalogue from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The backend serving a tier.
    pub fn for_tier(&self, tier: BackendTier) -> &BackendProfile {
        let idx = match tier {
            BackendTier::Top => self.top,
            BackendTier::Mid => self.mid,
            BackendTier::LowLatency => self.low_latency,
        };
        &self.profiles[idx]
    }

    /// The backend with the lowest cost per 1k tokens.
    pub fn cheapest(&self) -> &BackendProfile {
        &self.profiles[self.cheapest]
    }

    /// Looks up a backend by id.
    pub fn get(&self, id: &str) -> Option<&BackendProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// All catalogued backends in configuration order.
    pub fn profiles(&self) -> &[BackendProfile] {
        &self.profiles
    }
}

impl Default for BackendCatalogue {
    fn default() -> Self {
        let profiles = vec![
            BackendProfile::new("claude-3-opus", BackendTier::Top, 0.045, 4096).with_tags(
                &["regulatory reasoning", "long documents", "multi-step analysis"],
                &["latency", "cost"],
            ),
            BackendProfile::new("claude-3-5-sonnet", BackendTier::Mid, 0.009, 8192).with_tags(
                &["document drafting", "balanced quality"],
                &["deep regulatory nuance"],
            ),
            BackendProfile::new("claude-3-haiku", BackendTier::LowLatency, 0.00075, 4096)
                .with_tags(&["fast replies", "titles", "short answers"], &["complex reasoning"]),
        ];
        Self { profiles, top: 0, mid: 1, low_latency: 2, cheapest: 2 }
    }
}
