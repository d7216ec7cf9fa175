use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Runtime switches for dynamic filtering, loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicFilterSettings {
    /// Master switch. When off, queries run without rewriting.
    pub enabled: bool,
    /// Filter names whose descriptors are produced disabled.
    pub disabled_filters: Vec<String>,
}

impl Default for DynamicFilterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_filters: Vec::new(),
        }
    }
}

impl DynamicFilterSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        info!(
            "Loaded dynamic filter settings (enabled: {}, disabled filters: {:?})",
            settings.enabled, settings.disabled_filters
        );
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
