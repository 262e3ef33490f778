//! Structural integrity checks over DEPENDS_ON edges.
//!
//! Self references, dangling targets, cycles, and over-deep dependency
//! chains all land here. Cycles come from strongly connected
//! components, one violation per component naming every member, so the
//! pass stays linear in nodes plus edges even on dense graphs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::detectors::{Detector, DetectorReport};
use crate::error::DetectorError;
use crate::graph::GraphSnapshot;
use crate::taxonomy::{Domain, Violation, ViolationCode, ViolationDetails};

pub struct StructuralDetector {
    max_depth: usize,
}

impl StructuralDetector {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Cycle groups as (sorted member ids, representative path). Every
    /// member of a strongly connected component with more than one node
    /// sits on at least one cycle; self loops are reported separately
    /// as 1002 and excluded here.
    fn cycle_groups<'a>(
        &self,
        snapshot: &'a GraphSnapshot,
        adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
    ) -> Vec<(Vec<&'a str>, Vec<String>)> {
        let mut groups = Vec::new();
        for component in tarjan_sccs(snapshot.entities.keys().map(String::as_str), adjacency) {
            if component.len() < 2 {
                continue;
            }
            let members: BTreeSet<&str> = component.into_iter().collect();
            let path = representative_cycle(&members, adjacency);
            groups.push((members.into_iter().collect(), path));
        }
        groups.sort();
        groups
    }
}

/// Iterative Tarjan over the dependency edges. O(V + E).
fn tarjan_sccs<'a>(
    nodes: impl Iterator<Item = &'a str>,
    adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
) -> Vec<Vec<&'a str>> {
    let mut index_of: BTreeMap<&str, usize> = BTreeMap::new();
    let mut low: BTreeMap<&str, usize> = BTreeMap::new();
    let mut on_stack: BTreeSet<&str> = BTreeSet::new();
    let mut stack: Vec<&'a str> = Vec::new();
    let mut next_index = 0usize;
    let mut components = Vec::new();

    for root in nodes {
        if index_of.contains_key(root) {
            continue;
        }
        // Explicit call stack of (node, next child index) instead of
        // recursion, so chain length never limits us.
        let mut calls: Vec<(&str, usize)> = vec![(root, 0)];
        while let Some(&(node, cursor)) = calls.last() {
            if cursor == 0 {
                index_of.insert(node, next_index);
                low.insert(node, next_index);
                next_index += 1;
                stack.push(node);
                on_stack.insert(node);
            }
            let children = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);
            if cursor < children.len() {
                if let Some(last) = calls.last_mut() {
                    last.1 += 1;
                }
                let child = children[cursor];
                if !index_of.contains_key(child) {
                    calls.push((child, 0));
                } else if on_stack.contains(child) && index_of[child] < low[node] {
                    low.insert(node, index_of[child]);
                }
            } else {
                calls.pop();
                if let Some(&(parent, _)) = calls.last() {
                    if low[node] < low[parent] {
                        low.insert(parent, low[node]);
                    }
                }
                if low[node] == index_of[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack.remove(member);
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
    }
    components
}

/// Shortest cycle through the component's smallest id, found by BFS
/// restricted to component members.
fn representative_cycle<'a>(
    members: &BTreeSet<&'a str>,
    adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
) -> Vec<String> {
    let Some(&start) = members.iter().next() else {
        return Vec::new();
    };
    let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for next in adjacency.get(node).into_iter().flatten() {
            if *next == start && node != start {
                let mut path = vec![node];
                while let Some(prev) = parent.get(path[path.len() - 1]) {
                    path.push(*prev);
                }
                path.reverse();
                return path.into_iter().map(str::to_string).collect();
            }
            if members.contains(next) && *next != start && !parent.contains_key(next) {
                parent.insert(*next, node);
                queue.push_back(*next);
            }
        }
    }
    members.iter().map(|s| s.to_string()).collect()
}

impl Detector for StructuralDetector {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn domain(&self) -> Domain {
        Domain::Structure
    }

    fn detect(&self, snapshot: &GraphSnapshot) -> Result<DetectorReport, DetectorError> {
        let mut violations = Vec::new();

        for (from, to) in &snapshot.depends_on {
            if from == to {
                violations.push(Violation::new(
                    ViolationCode::SELF_REFERENCE,
                    vec![from.clone()],
                    format!("{from} depends on itself"),
                    ViolationDetails::None,
                ));
            } else if !snapshot.entities.contains_key(to) {
                violations.push(Violation::new(
                    ViolationCode::MISSING_DEPENDENCY,
                    vec![from.clone()],
                    format!("{from} depends on {to}, which does not exist"),
                    ViolationDetails::None,
                ));
            }
        }

        let adjacency = snapshot.dependency_adjacency();
        let mut cyclic: BTreeSet<&str> = BTreeSet::new();
        for (members, path) in self.cycle_groups(snapshot, &adjacency) {
            cyclic.extend(members.iter().copied());
            violations.push(Violation::new(
                ViolationCode::CIRCULAR_REFERENCE,
                members.iter().map(|s| s.to_string()).collect(),
                format!("circular dependency: {}", path.join(" -> ")),
                ViolationDetails::Cycle { path },
            ));
        }

        // Chain depth is measured on the acyclic part of the graph;
        // cycle members are already flagged above. Longest chains come
        // from a topological-order DP, so dense input stays cheap.
        let mut filtered: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut indegree: BTreeMap<&str, usize> =
            snapshot.entities.keys().map(|k| (k.as_str(), 0)).collect();
        for (from, to) in &snapshot.depends_on {
            let (from, to) = (from.as_str(), to.as_str());
            if from == to || cyclic.contains(from) || cyclic.contains(to) {
                continue;
            }
            if !snapshot.entities.contains_key(from) || !snapshot.entities.contains_key(to) {
                continue;
            }
            filtered.entry(from).or_default().push(to);
            if let Some(count) = indegree.get_mut(to) {
                *count += 1;
            }
        }

        let mut queue: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut topo: Vec<&str> = Vec::new();
        while let Some(node) = queue.pop_front() {
            topo.push(node);
            for next in filtered.get(node).into_iter().flatten() {
                if let Some(count) = indegree.get_mut(next) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(*next);
                    }
                }
            }
        }

        // Nodes on a chain below, including self. Ties between children
        // resolve to the smallest id since adjacency lists are sorted.
        let mut length: BTreeMap<&str, usize> = BTreeMap::new();
        let mut best_next: BTreeMap<&str, &str> = BTreeMap::new();
        for &node in topo.iter().rev() {
            let mut best = 1usize;
            for next in filtered.get(node).into_iter().flatten() {
                let candidate = 1 + length.get(next).copied().unwrap_or(1);
                if candidate > best {
                    best = candidate;
                    best_next.insert(node, *next);
                }
            }
            length.insert(node, best);
        }

        // Depth is reported once per chain, at its head (a node nobody
        // depends on).
        let has_incoming: BTreeSet<&str> = snapshot
            .depends_on
            .iter()
            .map(|(_, to)| to.as_str())
            .collect();
        for start in snapshot.entities.keys() {
            let start = start.as_str();
            if has_incoming.contains(start) {
                continue;
            }
            let depth = length.get(start).copied().unwrap_or(1) - 1;
            if depth > self.max_depth {
                let mut chain = vec![start.to_string()];
                let mut cursor = start;
                while let Some(&next) = best_next.get(cursor) {
                    chain.push(next.to_string());
                    cursor = next;
                }
                violations.push(Violation::new(
                    ViolationCode::GRAPH_DEPTH_EXCEEDED,
                    vec![start.to_string()],
                    format!(
                        "dependency chain from {start} is {depth} hops deep, limit is {}",
                        self.max_depth
                    ),
                    ViolationDetails::DepthExceeded {
                        chain,
                        depth,
                        max_depth: self.max_depth,
                    },
                ));
            }
        }

        Ok(DetectorReport::full(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, GraphStore, MemoryGraph};
    use crate::models::RequirementEntity;
    use chrono::{TimeZone, Utc};

    fn snapshot_with(edges: &[(&str, &str)], ids: &[&str]) -> GraphSnapshot {
        let mut graph = MemoryGraph::new();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for id in ids {
            graph
                .upsert_node_at(
                    RequirementEntity::new(*id, format!("Requirement {id}"), "desc"),
                    ts,
                )
                .unwrap();
        }
        for (from, to) in edges {
            graph.upsert_edge(from, to, EdgeKind::DependsOn).unwrap();
        }
        graph.snapshot(ts)
    }

    fn codes(violations: &[Violation]) -> Vec<u16> {
        violations.iter().map(|v| v.code.0).collect()
    }

    #[test]
    fn test_self_reference() {
        let snapshot = snapshot_with(&[("a", "a")], &["a"]);
        let report = StructuralDetector::new(5).detect(&snapshot).unwrap();
        assert_eq!(codes(&report.violations), vec![1002]);
    }

    #[test]
    fn test_missing_dependency_target() {
        let snapshot = snapshot_with(&[("a", "ghost")], &["a"]);
        let report = StructuralDetector::new(5).detect(&snapshot).unwrap();
        assert_eq!(codes(&report.violations), vec![2001]);
    }

    #[test]
    fn test_cycle_reported_once() {
        let snapshot = snapshot_with(&[("a", "b"), ("b", "c"), ("c", "a")], &["a", "b", "c"]);
        let report = StructuralDetector::new(5).detect(&snapshot).unwrap();
        let cycles: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.code == ViolationCode::CIRCULAR_REFERENCE)
            .collect();
        assert_eq!(cycles.len(), 1);
        match &cycles[0].details {
            ViolationDetails::Cycle { path } => {
                assert_eq!(path[0], "a");
                assert_eq!(path.len(), 3);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_dense_graph_reports_one_cycle_group() {
        // Complete digraph: every node is on a cycle with every other.
        // One violation names them all, and the pass stays fast.
        let ids: Vec<String> = (0..10).map(|i| format!("r{i:02}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut edges = Vec::new();
        for from in &id_refs {
            for to in &id_refs {
                if from != to {
                    edges.push((*from, *to));
                }
            }
        }
        let snapshot = snapshot_with(&edges, &id_refs);

        let report = StructuralDetector::new(5).detect(&snapshot).unwrap();
        let cycles: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.code == ViolationCode::CIRCULAR_REFERENCE)
            .collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].requirement_ids.len(), 10);
        assert!(!codes(&report.violations).contains(&1001));
    }

    #[test]
    fn test_chain_next_to_cycle_is_still_measured() {
        // The cycle is flagged; the separate chain still gets its depth
        // check without the cycle inflating it.
        let edges = [
            ("x", "y"),
            ("y", "x"),
            ("a", "b"),
            ("b", "c"),
            ("c", "d"),
        ];
        let snapshot = snapshot_with(&edges, &["x", "y", "a", "b", "c", "d"]);
        let report = StructuralDetector::new(2).detect(&snapshot).unwrap();
        let mut found = codes(&report.violations);
        found.sort();
        assert_eq!(found, vec![1001, 1003]);
    }

    #[test]
    fn test_depth_limit() {
        let ids = ["a", "b", "c", "d", "e"];
        let edges = [("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")];
        let snapshot = snapshot_with(&edges, &ids);

        // chain is 4 hops; limit 3 trips, limit 4 does not
        let report = StructuralDetector::new(3).detect(&snapshot).unwrap();
        assert_eq!(codes(&report.violations), vec![1001]);
        let report = StructuralDetector::new(4).detect(&snapshot).unwrap();
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_clean_graph() {
        let snapshot = snapshot_with(&[("a", "b")], &["a", "b"]);
        let report = StructuralDetector::new(5).detect(&snapshot).unwrap();
        assert!(report.violations.is_empty());
        assert_eq!(report.confidence, 1.0);
    }
}
