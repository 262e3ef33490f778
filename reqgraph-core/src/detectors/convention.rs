//! Convention and type-level checks.
//!
//! Cheap hygiene: titles too short to mean anything, descriptions below
//! the configured minimum, and debt_payback requirements that do not
//! actually point at any debt.

use crate::detectors::{Detector, DetectorReport};
use crate::error::DetectorError;
use crate::graph::GraphSnapshot;
use crate::models::RequirementType;
use crate::taxonomy::{Domain, Violation, ViolationCode, ViolationDetails};

pub struct ConventionDetector {
    min_description_len: usize,
}

impl ConventionDetector {
    pub fn new(min_description_len: usize) -> Self {
        Self { min_description_len }
    }
}

impl Detector for ConventionDetector {
    fn name(&self) -> &'static str {
        "convention"
    }

    fn domain(&self) -> Domain {
        Domain::TypeConsistency
    }

    fn detect(&self, snapshot: &GraphSnapshot) -> Result<DetectorReport, DetectorError> {
        let mut violations = Vec::new();

        for entity in snapshot.active_entities() {
            if entity.title.trim().chars().count() < 3 {
                violations.push(Violation::new(
                    ViolationCode::NAMING_CONVENTION,
                    vec![entity.id.clone()],
                    format!("{} has a title too short to identify it", entity.id),
                    ViolationDetails::None,
                ));
            }
            if entity.description.trim().chars().count() < self.min_description_len {
                violations.push(Violation::new(
                    ViolationCode::DESCRIPTION_TOO_SHORT,
                    vec![entity.id.clone()],
                    format!(
                        "{} has a description under {} characters",
                        entity.id, self.min_description_len
                    ),
                    ViolationDetails::None,
                ));
            }
            if entity.requirement_type == RequirementType::DebtPayback
                && !snapshot.pays_back.iter().any(|(from, _)| from == &entity.id)
            {
                violations.push(Violation::new(
                    ViolationCode::TYPE_LEVEL_MISMATCH,
                    vec![entity.id.clone()],
                    format!("{} is a debt payback with no debt to pay back", entity.id),
                    ViolationDetails::None,
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

    fn ts() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn codes(snapshot: &GraphSnapshot) -> Vec<u16> {
        ConventionDetector::new(10)
            .detect(snapshot)
            .unwrap()
            .violations
            .iter()
            .map(|v| v.code.0)
            .collect()
    }

    #[test]
    fn test_short_title_and_description() {
        let mut graph = MemoryGraph::new();
        graph
            .upsert_node_at(RequirementEntity::new("a", "ok", "tiny"), ts())
            .unwrap();
        assert_eq!(codes(&graph.snapshot(ts())), vec![3001, 3002]);
    }

    #[test]
    fn test_wellformed_requirement_passes() {
        let mut graph = MemoryGraph::new();
        graph
            .upsert_node_at(
                RequirementEntity::new("a", "Billing export", "Export invoices as CSV monthly"),
                ts(),
            )
            .unwrap();
        assert!(codes(&graph.snapshot(ts())).is_empty());
    }

    #[test]
    fn test_payback_without_edge_is_mismatch() {
        let mut graph = MemoryGraph::new();
        let mut payback =
            RequirementEntity::new("fix", "Pay back caching debt", "Replace the ad-hoc cache");
        payback.requirement_type = RequirementType::DebtPayback;
        graph.upsert_node_at(payback, ts()).unwrap();
        assert_eq!(codes(&graph.snapshot(ts())), vec![2008]);

        // Wiring the edge clears it.
        let mut graph = MemoryGraph::new();
        let mut payback =
            RequirementEntity::new("fix", "Pay back caching debt", "Replace the ad-hoc cache");
        payback.requirement_type = RequirementType::DebtPayback;
        graph.upsert_node_at(payback, ts()).unwrap();
        graph
            .upsert_node_at(RequirementEntity::new("debt", "Old cache", "Ad-hoc cache kept"), ts())
            .unwrap();
        graph.upsert_edge("fix", "debt", EdgeKind::PaysBack).unwrap();
        assert!(codes(&graph.snapshot(ts())).is_empty());
    }
}
