//! SQLite score storage.
//!
//! Scores live in two tables: `stable_score` holding the write-once
//! baseline and the moving current, and `score_history` holding trend
//! points. The baseline guard is the database itself: establishment is
//! an `INSERT OR IGNORE`, so a concurrent establish can never clobber
//! an existing baseline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::traits::{BackendType, ScoreBackend};
use crate::scoring::{HistoryPoint, StableScore};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let backend = Self {
            path,
            conn: Mutex::new(conn),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(include_str!("schema.sql"))?;
        } else if current_version < SCHEMA_VERSION {
            anyhow::bail!(
                "Score database schema version {} is outdated, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }

    fn history_for(conn: &Connection, id: &str) -> Result<Vec<HistoryPoint>> {
        let mut stmt = conn.prepare(
            "SELECT day_offset, score FROM score_history
             WHERE requirement_id = ?1 ORDER BY day_offset",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(HistoryPoint {
                day_offset: row.get(0)?,
                score: row.get(1)?,
            })
        })?;
        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }

    fn row_to_score(conn: &Connection, id: &str) -> Result<Option<StableScore>> {
        let row: Option<(i64, i64)> = conn
            .query_row(
                "SELECT baseline, current FROM stable_score WHERE requirement_id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((baseline, current)) => {
                let history = Self::history_for(conn, id)?;
                Ok(Some(StableScore::from_parts(baseline, current, history)))
            }
            None => Ok(None),
        }
    }
}

impl ScoreBackend for SqliteBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load_all(&self) -> Result<BTreeMap<String, StableScore>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT requirement_id FROM stable_score ORDER BY requirement_id")?;
        let ids: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        let mut scores = BTreeMap::new();
        for id in ids {
            if let Some(score) = Self::row_to_score(&conn, &id)? {
                scores.insert(id, score);
            }
        }
        Ok(scores)
    }

    fn get(&self, id: &str) -> Result<Option<StableScore>> {
        let conn = self.conn.lock().unwrap();
        Self::row_to_score(&conn, id)
    }

    fn establish_baseline(&self, id: &str, candidate: &StableScore) -> Result<StableScore> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO stable_score (requirement_id, baseline, current)
             VALUES (?1, ?2, ?3)",
            params![id, candidate.baseline(), candidate.current()],
        )?;
        Self::row_to_score(&conn, id)?
            .with_context(|| format!("score for `{id}` vanished after establishment"))
    }

    fn record_current(&self, id: &str, score: &StableScore) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE stable_score SET current = ?2 WHERE requirement_id = ?1",
            params![id, score.current()],
        )?;
        if updated == 0 {
            anyhow::bail!("no baseline established for requirement `{id}`");
        }
        tx.execute(
            "DELETE FROM score_history WHERE requirement_id = ?1",
            params![id],
        )?;
        for point in score.history() {
            tx.execute(
                "INSERT INTO score_history (requirement_id, day_offset, score)
                 VALUES (?1, ?2, ?3)",
                params![id, point.day_offset, point.score],
            )?;
        }
        tx.commit()?;
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
        let backend = SqliteBackend::new(dir.path().join("scores.db")).unwrap();

        let stored = backend
            .establish_baseline("REQ-001", &StableScore::from_parts(80, 80, vec![]))
            .unwrap();
        assert_eq!(stored.baseline(), 80);

        let stored = backend
            .establish_baseline("REQ-001", &StableScore::from_parts(40, 40, vec![]))
            .unwrap();
        assert_eq!(stored.baseline(), 80);
        assert_eq!(stored.current(), 80);
    }

    #[test]
    fn test_history_roundtrip() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("scores.db")).unwrap();

        backend
            .establish_baseline("REQ-001", &StableScore::from_parts(100, 100, vec![]))
            .unwrap();
        let with_history = StableScore::from_parts(
            100,
            75,
            vec![
                HistoryPoint { day_offset: 0, score: 85 },
                HistoryPoint { day_offset: 30, score: 80 },
                HistoryPoint { day_offset: 60, score: 75 },
            ],
        );
        backend.record_current("REQ-001", &with_history).unwrap();

        let stored = backend.get("REQ-001").unwrap().unwrap();
        assert_eq!(stored.current(), 75);
        assert_eq!(stored.history().len(), 3);
        assert_eq!(stored.predict(90), 70);
    }

    #[test]
    fn test_record_without_baseline_fails() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("scores.db")).unwrap();
        let result = backend.record_current("REQ-404", &StableScore::from_parts(10, 10, vec![]));
        assert!(result.is_err());
    }

    #[test]
    fn test_reopen_keeps_scores() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.db");
        {
            let backend = SqliteBackend::new(&path).unwrap();
            backend
                .establish_baseline("REQ-001", &StableScore::from_parts(60, 60, vec![]))
                .unwrap();
        }
        let backend = SqliteBackend::new(&path).unwrap();
        let all = backend.load_all().unwrap();
        assert_eq!(all["REQ-001"].baseline(), 60);
    }
}
