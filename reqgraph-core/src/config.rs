//! Engine configuration.
//!
//! Thresholds and the active business phase load from a YAML file under
//! the user's config directory, with `REQGRAPH_CONFIG` overriding the
//! path. Missing file means defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::scoring::phase::BusinessPhase;
use crate::taxonomy::TAXONOMY_VERSION;

/// Tunable knobs for one analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Taxonomy version stamped into every report
    pub taxonomy_version: String,
    /// Business phase driving score weighting
    pub phase: BusinessPhase,
    /// Similarity at or above which requirements form a duplicate group
    pub duplicate_threshold: f64,
    /// Similarity at or above which requirements are flagged related
    pub related_threshold: f64,
    /// Days without mutation before a requirement is obsolescence-eligible
    pub obsolescence_days: i64,
    /// Dependency chains longer than this are a structural violation
    pub max_traversal_depth: usize,
    /// Same-metric values whose ratio exceeds this conflict
    pub numeric_conflict_ratio: f64,
    /// Descriptions shorter than this are a convention violation
    pub min_description_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            taxonomy_version: TAXONOMY_VERSION.to_string(),
            phase: BusinessPhase::Growth,
            duplicate_threshold: 0.85,
            related_threshold: 0.70,
            obsolescence_days: 90,
            max_traversal_depth: 5,
            numeric_conflict_ratio: 2.0,
            min_description_len: 10,
        }
    }
}

impl EngineConfig {
    /// Default config file location: `$REQGRAPH_CONFIG` if set, else
    /// `<config_dir>/reqgraph/config.yaml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("REQGRAPH_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let base = dirs::config_dir().context("could not determine config directory")?;
        Ok(base.join("reqgraph").join("config.yaml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(self).context("failed to serialize config")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let unit = |name, v: f64| {
            if !(0.0..=1.0).contains(&v) {
                Err(EngineError::Config(format!(
                    "{name} must be within [0, 1], got {v}"
                )))
            } else {
                Ok(())
            }
        };
        unit("duplicate_threshold", self.duplicate_threshold)?;
        unit("related_threshold", self.related_threshold)?;
        if self.related_threshold > self.duplicate_threshold {
            return Err(EngineError::Config(format!(
                "related_threshold ({}) must not exceed duplicate_threshold ({})",
                self.related_threshold, self.duplicate_threshold
            )));
        }
        if self.obsolescence_days <= 0 {
            return Err(EngineError::Config(format!(
                "obsolescence_days must be positive, got {}",
                self.obsolescence_days
            )));
        }
        if self.max_traversal_depth == 0 {
            return Err(EngineError::Config(
                "max_traversal_depth must be at least 1".to_string(),
            ));
        }
        if self.numeric_conflict_ratio <= 1.0 {
            return Err(EngineError::Config(format!(
                "numeric_conflict_ratio must exceed 1.0, got {}",
                self.numeric_conflict_ratio
            )));
        }
        Ok(())
    }
}
