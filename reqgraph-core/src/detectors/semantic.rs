//! Semantic consistency checks.
//!
//! Numeric constraints on the same metric whose values differ by more
//! than the configured ratio conflict; qualitative contradictions come
//! from a fixed table of mutually exclusive stance tags.

use std::collections::BTreeMap;

use crate::detectors::{Detector, DetectorReport};
use crate::error::DetectorError;
use crate::graph::GraphSnapshot;
use crate::taxonomy::{Domain, Violation, ViolationCode, ViolationDetails};

/// Tag pairs that cannot both be true of one roadmap.
const OPPOSING_TAGS: [(&str, &str); 4] = [
    ("security-first", "rapid-development"),
    ("microservices", "monolithic"),
    ("tech-debt-acceptance:high", "tech-debt-acceptance:low"),
    ("cloud-only", "on-premise"),
];

pub struct SemanticDetector {
    conflict_ratio: f64,
}

impl SemanticDetector {
    pub fn new(conflict_ratio: f64) -> Self {
        Self { conflict_ratio }
    }
}

impl Detector for SemanticDetector {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn domain(&self) -> Domain {
        Domain::Semantic
    }

    fn detect(&self, snapshot: &GraphSnapshot) -> Result<DetectorReport, DetectorError> {
        let mut violations = Vec::new();

        // Group same-metric constraints across requirements; any pair
        // whose larger value exceeds ratio times the smaller conflicts.
        // Non-positive values cannot form a meaningful ratio.
        let mut by_metric: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();
        for entity in snapshot.active_entities() {
            for constraint in &entity.metadata.numeric_constraints {
                if constraint.value > 0.0 {
                    by_metric
                        .entry(constraint.metric.as_str())
                        .or_default()
                        .push((entity.id.as_str(), constraint.value));
                }
            }
        }
        for (metric, members) in by_metric {
            for (i, (id_a, value_a)) in members.iter().enumerate() {
                for (id_b, value_b) in members.iter().skip(i + 1) {
                    let (low, high) = if value_a <= value_b {
                        (*value_a, *value_b)
                    } else {
                        (*value_b, *value_a)
                    };
                    let ratio = high / low;
                    if ratio > self.conflict_ratio {
                        violations.push(Violation::new(
                            ViolationCode::NUMERIC_CONSTRAINT_CONFLICT,
                            vec![id_a.to_string(), id_b.to_string()],
                            format!(
                                "'{metric}' targets of {low} and {high} differ by {ratio:.1}x"
                            ),
                            ViolationDetails::NumericConflict {
                                metric: metric.to_string(),
                                values: vec![low, high],
                                ratio,
                            },
                        ));
                    }
                }
            }
        }

        // Qualitative contradictions over tags and quality attributes.
        let tagged: Vec<(&str, Vec<String>)> = snapshot
            .active_entities()
            .map(|e| {
                let mut tags: Vec<String> = e
                    .metadata
                    .tags
                    .iter()
                    .chain(e.metadata.quality_attributes.iter())
                    .map(|t| t.to_lowercase())
                    .collect();
                tags.sort();
                (e.id.as_str(), tags)
            })
            .collect();
        for (first, second) in OPPOSING_TAGS {
            let holders_first: Vec<&str> = tagged
                .iter()
                .filter(|(_, tags)| tags.iter().any(|t| t == first))
                .map(|(id, _)| *id)
                .collect();
            let holders_second: Vec<&str> = tagged
                .iter()
                .filter(|(_, tags)| tags.iter().any(|t| t == second))
                .map(|(id, _)| *id)
                .collect();
            for id_a in &holders_first {
                for id_b in &holders_second {
                    if id_a == id_b {
                        continue;
                    }
                    violations.push(Violation::new(
                        ViolationCode::QUALITATIVE_CONTRADICTION,
                        vec![id_a.to_string(), id_b.to_string()],
                        format!("'{first}' and '{second}' pull in opposite directions"),
                        ViolationDetails::Contradiction {
                            first_tag: first.to_string(),
                            second_tag: second.to_string(),
                        },
                    ));
                }
            }
        }

        Ok(DetectorReport::full(violations))
    }
}
