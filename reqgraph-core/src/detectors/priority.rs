//! Priority consistency checks.
//!
//! Two signals: a dependent ranked above its dependency (inversion), and
//! the same owner declaring a stricter value for a metric at a lower
//! priority than a laxer one (disagreement).

use std::collections::BTreeMap;

use crate::detectors::{Detector, DetectorReport};
use crate::error::DetectorError;
use crate::graph::GraphSnapshot;
use crate::taxonomy::{Domain, Violation, ViolationCode, ViolationDetails};

pub struct PriorityDetector;

impl Detector for PriorityDetector {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn domain(&self) -> Domain {
        Domain::Priority
    }

    fn detect(&self, snapshot: &GraphSnapshot) -> Result<DetectorReport, DetectorError> {
        let mut violations = Vec::new();

        // Inversion: the thing you need first should not matter less
        // than the thing that needs it.
        for (from, to) in &snapshot.depends_on {
            let (Some(dependent), Some(dependency)) =
                (snapshot.entities.get(from), snapshot.entities.get(to))
            else {
                continue;
            };
            if dependent.priority > dependency.priority {
                let difference = dependent.priority - dependency.priority;
                violations.push(Violation::new(
                    ViolationCode::PRIORITY_INVERSION,
                    vec![from.clone(), to.clone()],
                    format!(
                        "{from} (priority {}) depends on {to} (priority {})",
                        dependent.priority, dependency.priority
                    ),
                    ViolationDetails::PriorityInversion {
                        dependent: from.clone(),
                        dependency: to.clone(),
                        priority_difference: difference,
                    },
                ));
            }
        }

        // Disagreement: within one owner's constraints on a metric, a
        // strictly smaller target value at a strictly lower priority.
        let mut groups: BTreeMap<(String, String), Vec<(&str, u8, f64)>> = BTreeMap::new();
        for entity in snapshot.active_entities() {
            let Some(owner) = &entity.metadata.owner else {
                continue;
            };
            for constraint in &entity.metadata.numeric_constraints {
                groups
                    .entry((owner.clone(), constraint.metric.clone()))
                    .or_default()
                    .push((&entity.id, entity.priority, constraint.value));
            }
        }
        for ((owner, metric), members) in groups {
            for (i, (id_a, prio_a, value_a)) in members.iter().enumerate() {
                for (id_b, prio_b, value_b) in members.iter().skip(i + 1) {
                    let (strict, lax) = if value_a < value_b {
                        ((id_a, prio_a), (id_b, prio_b))
                    } else if value_b < value_a {
                        ((id_b, prio_b), (id_a, prio_a))
                    } else {
                        continue;
                    };
                    if strict.1 < lax.1 {
                        violations.push(Violation::new(
                            ViolationCode::PRIORITY_DISAGREEMENT,
                            vec![strict.0.to_string(), lax.0.to_string()],
                            format!(
                                "owner '{owner}' ranks the stricter '{metric}' target below the laxer one"
                            ),
                            ViolationDetails::None,
                        ));
                    }
                }
            }
        }

        Ok(DetectorReport::full(violations))
    }
}
