//! Technical debt lifecycle tracking.
//!
//! A requirement carrying a debt acceptance is accepted debt until a
//! resolved debt_payback requirement points at it with a PAYS_BACK
//! edge, at which point the debt is paid and stops costing anything.
//! Unpaid debt also taints everything that depends on the debtor,
//! transitively, at the same penalty band but marked inherited.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::detectors::{Detector, DetectorReport};
use crate::error::DetectorError;
use crate::graph::GraphSnapshot;
use crate::models::{RequirementStatus, RequirementType};
use crate::taxonomy::{Domain, Violation, ViolationCode, ViolationDetails};

/// Lifecycle state of a requirement with respect to technical debt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DebtState {
    NotDebt,
    DebtAccepted,
    DebtPaid,
}

/// Classifies one requirement's debt state against the snapshot.
pub fn debt_state(snapshot: &GraphSnapshot, id: &str) -> DebtState {
    let Some(entity) = snapshot.entities.get(id) else {
        return DebtState::NotDebt;
    };
    if entity.metadata.debt.is_none() {
        return DebtState::NotDebt;
    }
    let paid = snapshot.pays_back.iter().any(|(payback, debt)| {
        debt == id
            && snapshot.entities.get(payback).is_some_and(|p| {
                p.requirement_type == RequirementType::DebtPayback
                    && p.status == RequirementStatus::Resolved
            })
    });
    if paid {
        DebtState::DebtPaid
    } else {
        DebtState::DebtAccepted
    }
}

pub struct DebtDetector;

impl Detector for DebtDetector {
    fn name(&self) -> &'static str {
        "debt"
    }

    fn domain(&self) -> Domain {
        Domain::Priority
    }

    fn detect(&self, snapshot: &GraphSnapshot) -> Result<DetectorReport, DetectorError> {
        let mut violations = Vec::new();
        let dependents = snapshot.dependent_adjacency();

        for entity in snapshot.active_entities() {
            if debt_state(snapshot, &entity.id) != DebtState::DebtAccepted {
                continue;
            }
            let impact = entity
                .metadata
                .debt
                .as_ref()
                .map(|d| d.impact)
                .unwrap_or(crate::models::DebtImpact::Low);

            violations.push(Violation::new(
                ViolationCode::DEBT_ACCEPTED,
                vec![entity.id.clone()],
                format!("{} carries accepted, unpaid technical debt", entity.id),
                ViolationDetails::Debt {
                    inherited: false,
                    impact,
                    debt_id: entity.id.clone(),
                },
            ));

            // Walk reverse dependencies; a visited set keeps cyclic
            // graphs from looping.
            let mut visited: BTreeSet<&str> = BTreeSet::new();
            let mut stack: Vec<&str> = dependents
                .get(entity.id.as_str())
                .map(|v| v.clone())
                .unwrap_or_default();
            while let Some(dependent) = stack.pop() {
                if dependent == entity.id || !visited.insert(dependent) {
                    continue;
                }
                violations.push(Violation::new(
                    ViolationCode::DEBT_INHERITED,
                    vec![dependent.to_string()],
                    format!("{dependent} inherits unpaid debt from {}", entity.id),
                    ViolationDetails::Debt {
                        inherited: true,
                        impact,
                        debt_id: entity.id.clone(),
                    },
                ));
                if let Some(next) = dependents.get(dependent) {
                    stack.extend(next.iter().copied());
                }
            }
        }

        Ok(DetectorReport::full(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, GraphStore, MemoryGraph};
    use crate::models::{DebtAcceptance, DebtImpact, RequirementEntity};
    use chrono::{TimeZone, Utc};

    fn debtor(id: &str) -> RequirementEntity {
        let mut e = RequirementEntity::new(id, format!("Requirement {id}"), "desc");
        e.metadata.debt = Some(DebtAcceptance {
            justification: "ship first, harden later".to_string(),
            impact: DebtImpact::Medium,
        });
        e
    }

    fn payback(id: &str, status: RequirementStatus) -> RequirementEntity {
        let mut e = RequirementEntity::new(id, format!("Payback {id}"), "desc");
        e.requirement_type = RequirementType::DebtPayback;
        e.status = status;
        e
    }

    fn ts() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_unpaid_debt_flagged() {
        let mut graph = MemoryGraph::new();
        graph.upsert_node_at(debtor("debt"), ts()).unwrap();
        let snapshot = graph.snapshot(ts());

        assert_eq!(debt_state(&snapshot, "debt"), DebtState::DebtAccepted);
        let report = DebtDetector.detect(&snapshot).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].code, ViolationCode::DEBT_ACCEPTED);
    }

    #[test]
    fn test_resolved_payback_clears_debt() {
        let mut graph = MemoryGraph::new();
        graph.upsert_node_at(debtor("debt"), ts()).unwrap();
        graph
            .upsert_node_at(payback("fix", RequirementStatus::Resolved), ts())
            .unwrap();
        graph.upsert_edge("fix", "debt", EdgeKind::PaysBack).unwrap();
        let snapshot = graph.snapshot(ts());

        assert_eq!(debt_state(&snapshot, "debt"), DebtState::DebtPaid);
        let report = DebtDetector.detect(&snapshot).unwrap();
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_unresolved_payback_does_not_clear() {
        let mut graph = MemoryGraph::new();
        graph.upsert_node_at(debtor("debt"), ts()).unwrap();
        graph
            .upsert_node_at(payback("fix", RequirementStatus::Active), ts())
            .unwrap();
        graph.upsert_edge("fix", "debt", EdgeKind::PaysBack).unwrap();
        let snapshot = graph.snapshot(ts());

        assert_eq!(debt_state(&snapshot, "debt"), DebtState::DebtAccepted);
    }

    #[test]
    fn test_debt_inherited_transitively() {
        let mut graph = MemoryGraph::new();
        graph.upsert_node_at(debtor("debt"), ts()).unwrap();
        for id in ["mid", "top"] {
            graph
                .upsert_node_at(RequirementEntity::new(id, format!("R {id}"), "desc"), ts())
                .unwrap();
        }
        graph.upsert_edge("mid", "debt", EdgeKind::DependsOn).unwrap();
        graph.upsert_edge("top", "mid", EdgeKind::DependsOn).unwrap();

        let report = DebtDetector.detect(&graph.snapshot(ts())).unwrap();
        let inherited: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.code == ViolationCode::DEBT_INHERITED)
            .collect();
        assert_eq!(inherited.len(), 2);
        for v in inherited {
            match &v.details {
                ViolationDetails::Debt { inherited, debt_id, .. } => {
                    assert!(*inherited);
                    assert_eq!(debt_id, "debt");
                }
                other => panic!("unexpected details: {other:?}"),
            }
        }
    }
}
