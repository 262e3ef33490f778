//! Score persistence.
//!
//! Trait-based abstraction over storage backends so the engine can keep
//! stable scores in a YAML file for small setups or SQLite where
//! concurrent access matters.

mod sqlite_backend;
mod traits;
mod yaml_backend;

pub use sqlite_backend::SqliteBackend;
pub use traits::{BackendType, ScoreBackend, ScoreStoreConfig};
pub use yaml_backend::YamlBackend;

use anyhow::Result;

/// Creates the score backend a store configuration names.
pub fn create_backend(config: &ScoreStoreConfig) -> Result<Box<dyn ScoreBackend>> {
    match config.backend_type {
        BackendType::Yaml => Ok(Box::new(YamlBackend::new(&config.path))),
        BackendType::Sqlite => Ok(Box::new(SqliteBackend::new(&config.path)?)),
    }
}
