//! Snapshot file loading.
//!
//! A snapshot file is YAML or JSON describing the requirements, the
//! edges between them, and optionally a fixed `now` plus version
//! history. It is loaded into a `MemoryGraph` and materialized into the
//! immutable snapshot the engine consumes.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reqgraph_core::{
    EdgeKind, FrictionCode, FrictionLog, GraphSnapshot, GraphStore, MemoryGraph,
    RequirementEntity, VersionOperation, VersionState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub requirement_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_operation")]
    pub operation: VersionOperation,
}

fn default_operation() -> VersionOperation {
    VersionOperation::Update
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrictionRecord {
    pub requirement_id: String,
    pub code: FrictionCode,
    #[serde(default = "default_units")]
    pub units: u32,
}

fn default_units() -> u32 {
    1
}

/// On-disk snapshot format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub requirements: Vec<RequirementEntity>,
    #[serde(default)]
    pub dependencies: Vec<EdgeRecord>,
    #[serde(default)]
    pub paybacks: Vec<EdgeRecord>,
    #[serde(default)]
    pub versions: Vec<VersionRecord>,
    /// Observed delivery friction, charged against current scores
    #[serde(default)]
    pub friction: Vec<FrictionRecord>,
    /// Fixed analysis time. Omitted means the wall clock, which makes
    /// the pass non-reproducible; supply it for stable output.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

impl SnapshotFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot file: {}", path.display()))?;
        let file: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse JSON snapshot: {}", path.display()))?,
            _ => serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse YAML snapshot: {}", path.display()))?,
        };
        Ok(file)
    }

    /// Collects the declared friction observations into a log.
    pub fn friction_log(&self) -> FrictionLog {
        let mut log = FrictionLog::new();
        for record in &self.friction {
            log.record(record.requirement_id.clone(), record.code, record.units);
        }
        log
    }

    /// Builds the immutable snapshot the engine analyzes.
    pub fn into_snapshot(self) -> Result<GraphSnapshot> {
        let now = self.now.unwrap_or_else(Utc::now);
        let mut graph = MemoryGraph::new();

        // A requirement with explicit version records is created at its
        // earliest one, so staleness is measured against the declared
        // history, not the load time.
        let mut earliest: std::collections::BTreeMap<&str, DateTime<Utc>> = Default::default();
        for version in &self.versions {
            let entry = earliest
                .entry(version.requirement_id.as_str())
                .or_insert(version.timestamp);
            if version.timestamp < *entry {
                *entry = version.timestamp;
            }
        }
        for requirement in self.requirements {
            let created_at = earliest.get(requirement.id.as_str()).copied().unwrap_or(now);
            graph.upsert_node_at(requirement, created_at)?;
        }
        for version in &self.versions {
            if Some(&version.timestamp) == earliest.get(version.requirement_id.as_str()) {
                continue;
            }
            graph.record_version(
                &version.requirement_id,
                VersionState::new(version.operation, version.timestamp),
            );
        }
        for edge in self.dependencies {
            graph.upsert_edge(&edge.from, &edge.to, EdgeKind::DependsOn)?;
        }
        for edge in self.paybacks {
            graph.upsert_edge(&edge.from, &edge.to, EdgeKind::PaysBack)?;
        }

        Ok(graph.snapshot(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"
now: 2024-06-01T00:00:00Z
requirements:
  - id: REQ-001
    title: Billing export
    description: Export invoices as CSV monthly
  - id: REQ-002
    title: Mobile push
    description: Send push notifications on iOS
dependencies:
  - from: REQ-002
    to: REQ-001
"#;

    #[test]
    fn test_yaml_snapshot_loads() {
        let file: SnapshotFile = serde_yaml::from_str(SAMPLE).unwrap();
        let snapshot = file.into_snapshot().unwrap();
        assert_eq!(snapshot.entities.len(), 2);
        assert_eq!(snapshot.depends_on.len(), 1);
        assert_eq!(
            snapshot.now,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_version_records_override_creation_time() {
        let mut file: SnapshotFile = serde_yaml::from_str(SAMPLE).unwrap();
        file.versions = vec![VersionRecord {
            requirement_id: "REQ-001".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            operation: VersionOperation::Create,
        }];
        let snapshot = file.into_snapshot().unwrap();
        // Jan 1 to Jun 1 2024 is 152 days.
        assert_eq!(snapshot.days_since_last_version("REQ-001"), Some(152));
        // No explicit history means created at the analysis time.
        assert_eq!(snapshot.days_since_last_version("REQ-002"), Some(0));
    }

    #[test]
    fn test_dangling_edge_source_rejected() {
        let mut file: SnapshotFile = serde_yaml::from_str(SAMPLE).unwrap();
        file.dependencies.push(EdgeRecord {
            from: "REQ-404".to_string(),
            to: "REQ-001".to_string(),
        });
        assert!(file.into_snapshot().is_err());
    }
}
