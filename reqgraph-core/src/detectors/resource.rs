//! Resource over-allocation detection.
//!
//! Claims declare either a limit on a named resource or a required
//! amount of it. Per resource, the sum of requirements' demands is
//! checked against the tightest declared limit; demand strictly above
//! the limit is a violation, equality is not.

use std::collections::BTreeMap;

use crate::detectors::{Detector, DetectorReport};
use crate::error::DetectorError;
use crate::graph::GraphSnapshot;
use crate::models::ResourceClaim;
use crate::taxonomy::{Domain, Violation, ViolationCode, ViolationDetails};

pub struct ResourceDetector;

#[derive(Default)]
struct ResourceLedger {
    limit: Option<f64>,
    required: f64,
    claimants: Vec<String>,
}

impl Detector for ResourceDetector {
    fn name(&self) -> &'static str {
        "resource"
    }

    fn domain(&self) -> Domain {
        Domain::Resource
    }

    fn detect(&self, snapshot: &GraphSnapshot) -> Result<DetectorReport, DetectorError> {
        let mut ledgers: BTreeMap<String, ResourceLedger> = BTreeMap::new();

        for entity in snapshot.active_entities() {
            for claim in &entity.metadata.resource_claims {
                let ledger = ledgers.entry(claim.resource().to_string()).or_default();
                match claim {
                    ResourceClaim::Limit { max, .. } => {
                        // Several limits on one resource: the tightest wins.
                        ledger.limit = Some(match ledger.limit {
                            Some(existing) => existing.min(*max),
                            None => *max,
                        });
                    }
                    ResourceClaim::Required { amount, .. } => {
                        ledger.required += amount;
                        ledger.claimants.push(entity.id.clone());
                    }
                }
            }
        }

        let mut violations = Vec::new();
        for (resource, ledger) in ledgers {
            let Some(limit) = ledger.limit else {
                continue;
            };
            if ledger.required > limit {
                let shortage = ledger.required - limit;
                violations.push(Violation::new(
                    ViolationCode::RESOURCE_OVERALLOCATION,
                    ledger.claimants,
                    format!(
                        "resource '{resource}' over-allocated: {} requested, {limit} available",
                        ledger.required
                    ),
                    ViolationDetails::Resource {
                        resource,
                        total_requested: ledger.required,
                        available: limit,
                        shortage,
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
    use crate::graph::MemoryGraph;
    use crate::models::RequirementEntity;
    use chrono::{TimeZone, Utc};

    fn entity_with_claims(id: &str, claims: Vec<ResourceClaim>) -> RequirementEntity {
        let mut e = RequirementEntity::new(id, format!("Requirement {id}"), "desc");
        e.metadata.resource_claims = claims;
        e
    }

    fn snapshot_of(entities: Vec<RequirementEntity>) -> GraphSnapshot {
        let mut graph = MemoryGraph::new();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for e in entities {
            graph.upsert_node_at(e, ts).unwrap();
        }
        graph.snapshot(ts)
    }

    fn limit(resource: &str, max: f64) -> ResourceClaim {
        ResourceClaim::Limit {
            resource: resource.to_string(),
            max,
        }
    }

    fn required(resource: &str, amount: f64) -> ResourceClaim {
        ResourceClaim::Required {
            resource: resource.to_string(),
            amount,
        }
    }

    #[test]
    fn test_overallocation_reports_shortage() {
        let snapshot = snapshot_of(vec![
            entity_with_claims("budget", vec![limit("engineers", 100.0)]),
            entity_with_claims("a", vec![required("engineers", 80.0)]),
            entity_with_claims("b", vec![required("engineers", 60.0)]),
        ]);
        let report = ResourceDetector.detect(&snapshot).unwrap();
        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.code, ViolationCode::RESOURCE_OVERALLOCATION);
        assert_eq!(v.requirement_ids, vec!["a".to_string(), "b".to_string()]);
        match &v.details {
            ViolationDetails::Resource {
                total_requested,
                available,
                shortage,
                ..
            } => {
                assert_eq!(*total_requested, 140.0);
                assert_eq!(*available, 100.0);
                assert_eq!(*shortage, 40.0);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_equality_is_not_a_conflict() {
        let snapshot = snapshot_of(vec![
            entity_with_claims("budget", vec![limit("engineers", 100.0)]),
            entity_with_claims("a", vec![required("engineers", 100.0)]),
        ]);
        let report = ResourceDetector.detect(&snapshot).unwrap();
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_demand_without_limit_is_ignored() {
        let snapshot = snapshot_of(vec![entity_with_claims(
            "a",
            vec![required("engineers", 500.0)],
        )]);
        let report = ResourceDetector.detect(&snapshot).unwrap();
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_tightest_limit_wins() {
        let snapshot = snapshot_of(vec![
            entity_with_claims("budget-a", vec![limit("cpu", 50.0)]),
            entity_with_claims("budget-b", vec![limit("cpu", 30.0)]),
            entity_with_claims("a", vec![required("cpu", 40.0)]),
        ]);
        let report = ResourceDetector.detect(&snapshot).unwrap();
        assert_eq!(report.violations.len(), 1);
    }
}
