//! YAML file score storage.
//!
//! All scores live in one YAML file. Writes take an exclusive advisory
//! lock on a sidecar `.lock` file with a bounded wait, so two processes
//! scoring the same graph cannot interleave a read-modify-write.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::traits::{BackendType, ScoreBackend};
use crate::scoring::StableScore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScoreFile {
    scores: BTreeMap<String, StableScore>,
}

/// YAML score backend.
pub struct YamlBackend {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl YamlBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let file_path = path.as_ref().to_path_buf();
        let lock_file_path = file_path.with_extension("yaml.lock");
        Self {
            file_path,
            lock_file_path,
        }
    }

    /// Acquire an exclusive lock for a read-modify-write, waiting up to
    /// five seconds before giving up.
    fn acquire_write_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(5);

        loop {
            match lock_file.try_lock_exclusive() {
                Ok(()) => return Ok(lock_file),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > timeout {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another process may be scoring: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    fn read_file(&self) -> Result<ScoreFile> {
        if !self.file_path.exists() {
            return Ok(ScoreFile::default());
        }
        let contents = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read score file: {:?}", self.file_path))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse score file: {:?}", self.file_path))
    }

    fn write_file(&self, file: &ScoreFile) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(file).context("Failed to serialize scores")?;
        // Write to a temp file then rename so readers never see a
        // half-written file.
        let tmp_path = self.file_path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml)
            .with_context(|| format!("Failed to write score file: {:?}", tmp_path))?;
        fs::rename(&tmp_path, &self.file_path)
            .with_context(|| format!("Failed to replace score file: {:?}", self.file_path))?;
        Ok(())
    }
}

impl ScoreBackend for YamlBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Yaml
    }

    fn path(&self) -> &Path {
        &self.file_path
    }

    fn load_all(&self) -> Result<BTreeMap<String, StableScore>> {
        Ok(self.read_file()?.scores)
    }

    fn get(&self, id: &str) -> Result<Option<StableScore>> {
        Ok(self.read_file()?.scores.remove(id))
    }

    fn establish_baseline(&self, id: &str, candidate: &StableScore) -> Result<StableScore> {
        let lock = self.acquire_write_lock()?;
        let mut file = self.read_file()?;
        let stored = file
            .scores
            .entry(id.to_string())
            .or_insert_with(|| candidate.clone())
            .clone();
        self.write_file(&file)?;
        fs2::FileExt::unlock(&lock)?;
        Ok(stored)
    }

    fn record_current(&self, id: &str, score: &StableScore) -> Result<()> {
        let lock = self.acquire_write_lock()?;
        let mut file = self.read_file()?;
        match file.scores.get(id) {
            Some(existing) => {
                // Baseline is immutable; only current and history move.
                let updated = StableScore::from_parts(
                    existing.baseline(),
                    score.current(),
                    score.history().to_vec(),
                );
                file.scores.insert(id.to_string(), updated);
            }
            None => anyhow::bail!("no baseline established for requirement `{id}`"),
        }
        self.write_file(&file)?;
        fs2::FileExt::unlock(&lock)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_baseline_is_write_once() {
        let dir = tempdir().unwrap();
        let backend = YamlBackend::new(dir.path().join("scores.yaml"));

        let first = StableScore::from_parts(80, 80, vec![]);
        let stored = backend.establish_baseline("REQ-001", &first).unwrap();
        assert_eq!(stored.baseline(), 80);

        // A second establish with a different candidate changes nothing.
        let second = StableScore::from_parts(40, 40, vec![]);
        let stored = backend.establish_baseline("REQ-001", &second).unwrap();
        assert_eq!(stored.baseline(), 80);
    }

    #[test]
    fn test_record_current_preserves_baseline() {
        let dir = tempdir().unwrap();
        let backend = YamlBackend::new(dir.path().join("scores.yaml"));

        backend
            .establish_baseline("REQ-001", &StableScore::from_parts(90, 90, vec![]))
            .unwrap();
        backend
            .record_current("REQ-001", &StableScore::from_parts(10, 55, vec![]))
            .unwrap();

        let stored = backend.get("REQ-001").unwrap().unwrap();
        assert_eq!(stored.baseline(), 90);
        assert_eq!(stored.current(), 55);
    }

    #[test]
    fn test_record_without_baseline_fails() {
        let dir = tempdir().unwrap();
        let backend = YamlBackend::new(dir.path().join("scores.yaml"));
        let result = backend.record_current("REQ-404", &StableScore::from_parts(10, 10, vec![]));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_all_roundtrip() {
        let dir = tempdir().unwrap();
        let backend = YamlBackend::new(dir.path().join("scores.yaml"));
        backend
            .establish_baseline("a", &StableScore::from_parts(100, 100, vec![]))
            .unwrap();
        backend
            .establish_baseline("b", &StableScore::from_parts(70, 60, vec![]))
            .unwrap();

        let all = backend.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["b"].current(), 60);
    }
}
