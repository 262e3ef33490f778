//! Storage abstraction for stable scores.
//!
//! Violations are recomputed every pass and never persisted; the one
//! durable artifact is the stable score. The backend contract enforces
//! the write-once baseline: `establish_baseline` returns the stored
//! score untouched when one already exists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::scoring::StableScore;

/// Types of score storage backends available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Single YAML file with advisory locking
    Yaml,
    /// SQLite database
    Sqlite,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Yaml => write!(f, "YAML"),
            BackendType::Sqlite => write!(f, "SQLite"),
        }
    }
}

/// Configuration for score storage.
#[derive(Debug, Clone)]
pub struct ScoreStoreConfig {
    pub path: PathBuf,
    pub backend_type: BackendType,
}

impl ScoreStoreConfig {
    /// Picks the backend from the file extension; anything that is not
    /// recognizably SQLite stores as YAML.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let backend_type = match path.extension().and_then(|e| e.to_str()) {
            Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
            _ => BackendType::Yaml,
        };
        Self { path, backend_type }
    }
}

impl Default for ScoreStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("scores.yaml"),
            backend_type: BackendType::Yaml,
        }
    }
}

/// Core trait for score storage backends.
pub trait ScoreBackend: Send + Sync {
    fn backend_type(&self) -> BackendType;

    fn path(&self) -> &Path;

    /// Loads every stored score, keyed by requirement id.
    fn load_all(&self) -> Result<BTreeMap<String, StableScore>>;

    /// Loads one requirement's score.
    fn get(&self, id: &str) -> Result<Option<StableScore>>;

    /// Stores `candidate` for this requirement unless a score already
    /// exists, and returns the authoritative stored score either way.
    /// The baseline is write-once; this is the only way one gets in.
    fn establish_baseline(&self, id: &str, candidate: &StableScore) -> Result<StableScore>;

    /// Updates the current score and history for a requirement whose
    /// baseline is already established.
    fn record_current(&self, id: &str, score: &StableScore) -> Result<()>;
}
