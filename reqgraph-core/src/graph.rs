//! Graph access facade.
//!
//! The underlying property-graph engine is an external collaborator; this
//! module defines the capabilities the engine consumes (`GraphStore`) and
//! an in-memory implementation used by the CLI and tests. Detection never
//! touches the store directly: a pass works on an immutable
//! `GraphSnapshot` materialized up-front, so the hot path never waits on
//! the store mid-computation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{RequirementEntity, VersionOperation, VersionState};

/// Edge types in the requirement graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Source requires target to be satisfied first
    DependsOn,
    /// A debt_payback requirement remediates the target debt requirement
    PaysBack,
    /// Attaches a version record to its requirement
    HasVersion,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::DependsOn => write!(f, "DEPENDS_ON"),
            EdgeKind::PaysBack => write!(f, "PAYS_BACK"),
            EdgeKind::HasVersion => write!(f, "HAS_VERSION"),
        }
    }
}

/// A directed, typed edge between two node ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// Capabilities required of the graph store. The engine never assumes a
/// query language, only these operations.
pub trait GraphStore {
    /// Fetch a node by id.
    fn get_node(&self, id: &str) -> Option<RequirementEntity>;

    /// Insert or update a node. A version record is appended; the prior
    /// history is never overwritten.
    fn upsert_node(&mut self, entity: RequirementEntity) -> Result<(), EngineError>;

    /// Insert an edge. Duplicate edges are ignored.
    fn upsert_edge(&mut self, from: &str, to: &str, kind: EdgeKind) -> Result<(), EngineError>;

    /// All paths from `start` along `kind` edges, up to `max_depth` hops.
    fn traverse(&self, start: &str, kind: EdgeKind, max_depth: usize) -> Vec<Vec<String>>;

    /// All nodes matching a predicate.
    fn query(&self, predicate: &dyn Fn(&RequirementEntity) -> bool) -> Vec<RequirementEntity>;
}

/// In-memory graph store. Ordered maps keep iteration deterministic.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: BTreeMap<String, RequirementEntity>,
    edges: Vec<Edge>,
    versions: BTreeMap<String, Vec<VersionState>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert with an explicit mutation timestamp. The trait method uses
    /// the wall clock; tests and snapshot loaders inject their own.
    pub fn upsert_node_at(
        &mut self,
        entity: RequirementEntity,
        timestamp: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        entity.validate()?;
        let operation = if self.nodes.contains_key(&entity.id) {
            VersionOperation::Update
        } else {
            VersionOperation::Create
        };
        self.versions
            .entry(entity.id.clone())
            .or_default()
            .push(VersionState::new(operation, timestamp));
        self.nodes.insert(entity.id.clone(), entity);
        Ok(())
    }

    /// Append a version record without touching the node, for loaders
    /// that replay an existing history.
    pub fn record_version(&mut self, id: &str, version: VersionState) {
        self.versions.entry(id.to_string()).or_default().push(version);
    }

    /// Materializes an immutable snapshot for one analysis pass.
    /// `now` is injected so age computations stay a pure function of the
    /// snapshot.
    pub fn snapshot(&self, now: DateTime<Utc>) -> GraphSnapshot {
        let mut depends_on = Vec::new();
        let mut pays_back = Vec::new();
        for edge in &self.edges {
            match edge.kind {
                EdgeKind::DependsOn => depends_on.push((edge.from.clone(), edge.to.clone())),
                EdgeKind::PaysBack => pays_back.push((edge.from.clone(), edge.to.clone())),
                EdgeKind::HasVersion => {}
            }
        }
        depends_on.sort();
        depends_on.dedup();
        pays_back.sort();
        pays_back.dedup();

        let mut versions = self.versions.clone();
        for list in versions.values_mut() {
            list.sort_by_key(|v| v.timestamp);
        }

        GraphSnapshot {
            entities: self.nodes.clone(),
            depends_on,
            pays_back,
            versions,
            now,
        }
    }
}

impl GraphStore for MemoryGraph {
    fn get_node(&self, id: &str) -> Option<RequirementEntity> {
        self.nodes.get(id).cloned()
    }

    fn upsert_node(&mut self, entity: RequirementEntity) -> Result<(), EngineError> {
        self.upsert_node_at(entity, Utc::now())
    }

    fn upsert_edge(&mut self, from: &str, to: &str, kind: EdgeKind) -> Result<(), EngineError> {
        if !self.nodes.contains_key(from) {
            return Err(EngineError::UnknownRequirement(from.to_string()));
        }
        let edge = Edge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    fn traverse(&self, start: &str, kind: EdgeKind, max_depth: usize) -> Vec<Vec<String>> {
        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for edge in &self.edges {
            if edge.kind == kind {
                adjacency.entry(&edge.from).or_default().push(&edge.to);
            }
        }
        let mut paths = Vec::new();
        let mut stack = vec![vec![start.to_string()]];
        while let Some(path) = stack.pop() {
            let Some(tail) = path.last() else {
                continue;
            };
            let mut extended = false;
            if path.len() <= max_depth {
                if let Some(nexts) = adjacency.get(tail.as_str()) {
                    for next in nexts {
                        // Stop at revisits so a cyclic graph cannot loop forever.
                        if path.iter().any(|seen| seen == next) {
                            continue;
                        }
                        let mut longer = path.clone();
                        longer.push((*next).to_string());
                        stack.push(longer);
                        extended = true;
                    }
                }
            }
            if !extended && path.len() > 1 {
                paths.push(path);
            }
        }
        paths.sort();
        paths
    }

    fn query(&self, predicate: &dyn Fn(&RequirementEntity) -> bool) -> Vec<RequirementEntity> {
        self.nodes.values().filter(|e| predicate(e)).cloned().collect()
    }
}

/// Immutable view of the graph for one analysis pass. All detectors in a
/// pass see the same snapshot, so they can never disagree about graph
/// state mid-pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub entities: BTreeMap<String, RequirementEntity>,
    /// DEPENDS_ON edges as (from, to), sorted
    pub depends_on: Vec<(String, String)>,
    /// PAYS_BACK edges as (payback, debt), sorted
    pub pays_back: Vec<(String, String)>,
    /// Version history per requirement id, sorted by timestamp
    pub versions: BTreeMap<String, Vec<VersionState>>,
    /// The injected "now" all age computations use
    pub now: DateTime<Utc>,
}

impl GraphSnapshot {
    /// Non-archived entities, in id order.
    pub fn active_entities(&self) -> impl Iterator<Item = &RequirementEntity> {
        self.entities.values().filter(|e| e.is_active())
    }

    /// Outgoing DEPENDS_ON adjacency, id-ordered.
    pub fn dependency_adjacency(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (from, to) in &self.depends_on {
            adjacency.entry(from.as_str()).or_default().push(to.as_str());
        }
        adjacency
    }

    /// Incoming DEPENDS_ON adjacency (dependents of each node).
    pub fn dependent_adjacency(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (from, to) in &self.depends_on {
            adjacency.entry(to.as_str()).or_default().push(from.as_str());
        }
        adjacency
    }

    /// Count of incoming references: DEPENDS_ON plus PAYS_BACK.
    pub fn incoming_reference_count(&self, id: &str) -> usize {
        self.depends_on.iter().filter(|(_, to)| to == id).count()
            + self.pays_back.iter().filter(|(_, to)| to == id).count()
    }

    /// Most recent version record for a requirement, if any.
    pub fn last_version(&self, id: &str) -> Option<&VersionState> {
        self.versions.get(id).and_then(|list| list.last())
    }

    /// Whole days since the last recorded mutation, measured against the
    /// snapshot's injected now. None when no history exists.
    pub fn days_since_last_version(&self, id: &str) -> Option<i64> {
        self.last_version(id)
            .map(|v| (self.now - v.timestamp).num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn req(id: &str) -> RequirementEntity {
        RequirementEntity::new(id, format!("Title {id}"), format!("Description for {id}"))
    }

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_upsert_records_version_history() {
        let mut graph = MemoryGraph::new();
        graph.upsert_node_at(req("REQ-001"), ts(1)).unwrap();
        let mut updated = req("REQ-001");
        updated.title = "Changed".into();
        graph.upsert_node_at(updated, ts(2)).unwrap();

        let snapshot = graph.snapshot(ts(10));
        let history = &snapshot.versions["REQ-001"];
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].operation, VersionOperation::Create);
        assert_eq!(history[1].operation, VersionOperation::Update);
        assert_eq!(snapshot.days_since_last_version("REQ-001"), Some(8));
    }

    #[test]
    fn test_upsert_edge_requires_known_source() {
        let mut graph = MemoryGraph::new();
        graph.upsert_node_at(req("REQ-001"), ts(1)).unwrap();
        assert!(graph.upsert_edge("REQ-001", "REQ-404", EdgeKind::DependsOn).is_ok());
        assert!(graph.upsert_edge("REQ-404", "REQ-001", EdgeKind::DependsOn).is_err());
    }

    #[test]
    fn test_traverse_returns_bounded_paths() {
        let mut graph = MemoryGraph::new();
        for id in ["a", "b", "c", "d"] {
            graph.upsert_node_at(req(id), ts(1)).unwrap();
        }
        graph.upsert_edge("a", "b", EdgeKind::DependsOn).unwrap();
        graph.upsert_edge("b", "c", EdgeKind::DependsOn).unwrap();
        graph.upsert_edge("c", "d", EdgeKind::DependsOn).unwrap();

        let paths = graph.traverse("a", EdgeKind::DependsOn, 2);
        assert_eq!(paths, vec![vec!["a".to_string(), "b".into(), "c".into()]]);

        let paths = graph.traverse("a", EdgeKind::DependsOn, 10);
        assert_eq!(paths, vec![vec![
            "a".to_string(), "b".into(), "c".into(), "d".into(),
        ]]);
    }

    #[test]
    fn test_traverse_survives_cycles() {
        let mut graph = MemoryGraph::new();
        for id in ["a", "b"] {
            graph.upsert_node_at(req(id), ts(1)).unwrap();
        }
        graph.upsert_edge("a", "b", EdgeKind::DependsOn).unwrap();
        graph.upsert_edge("b", "a", EdgeKind::DependsOn).unwrap();

        let paths = graph.traverse("a", EdgeKind::DependsOn, 10);
        assert_eq!(paths, vec![vec!["a".to_string(), "b".into()]]);
    }

    #[test]
    fn test_incoming_reference_count() {
        let mut graph = MemoryGraph::new();
        for id in ["a", "b", "c"] {
            graph.upsert_node_at(req(id), ts(1)).unwrap();
        }
        graph.upsert_edge("a", "c", EdgeKind::DependsOn).unwrap();
        graph.upsert_edge("b", "c", EdgeKind::PaysBack).unwrap();

        let snapshot = graph.snapshot(ts(2));
        assert_eq!(snapshot.incoming_reference_count("c"), 2);
        assert_eq!(snapshot.incoming_reference_count("a"), 0);
    }
}
