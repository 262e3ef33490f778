//! Human-facing analysis report.
//!
//! The report explains the pass: a summary, per-domain sections, a
//! reasoning trail tying each penalty to its violation, and ranked
//! recommendations. `generated_at` is the snapshot's injected now, so
//! re-running a pass over the same snapshot yields a byte-identical
//! report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detectors::PassOutcome;
use crate::graph::GraphSnapshot;
use crate::models::RequirementType;
use crate::scoring::{HealthReport, RequirementScore};
use crate::taxonomy::{Domain, Violation, ViolationCode};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    PriorityDifferentiation,
    PriorityImbalance,
    TradeOffReview,
    Restructure,
    MergeDuplicates,
    ArchiveStale,
    SchedulePayback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub severity: RecommendationSeverity,
    pub kind: RecommendationKind,
    pub message: String,
    pub requirement_ids: Vec<String>,
}

/// One line of the reasoning trail: which violation cost which
/// requirement how much.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasonEntry {
    pub requirement_id: String,
    pub code: u16,
    pub code_name: String,
    pub message: String,
    pub scaled_penalty: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainSection {
    pub domain: Domain,
    pub score: f64,
    pub weight: f64,
    pub confidence: f64,
    pub violation_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSummary {
    pub taxonomy_version: String,
    pub generated_at: DateTime<Utc>,
    pub requirement_count: usize,
    pub violation_count: usize,
    pub overall: f64,
    pub display: u8,
    pub level: String,
    pub verdict: String,
    pub worst_domain: Option<Domain>,
    pub degraded_detectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub summary: ReportSummary,
    pub domains: Vec<DomainSection>,
    pub reasoning: Vec<ReasonEntry>,
    pub recommendations: Vec<Recommendation>,
}

impl Report {
    pub fn build(
        snapshot: &GraphSnapshot,
        outcome: &PassOutcome,
        scores: &BTreeMap<String, RequirementScore>,
        health: &HealthReport,
        taxonomy_version: &str,
    ) -> Self {
        // Ties resolve to the first domain in declaration order.
        let worst_domain = health
            .domain_scores
            .iter()
            .filter(|(_, score)| **score < 0.0)
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(domain, _)| *domain);

        let summary = ReportSummary {
            taxonomy_version: taxonomy_version.to_string(),
            generated_at: snapshot.now,
            requirement_count: snapshot.entities.len(),
            violation_count: outcome.violations.len(),
            overall: health.overall,
            display: health.display,
            level: health.level.to_string(),
            verdict: health.verdict.to_string(),
            worst_domain,
            degraded_detectors: outcome.degraded.clone(),
        };

        let domains = Domain::ALL
            .iter()
            .map(|domain| DomainSection {
                domain: *domain,
                score: health.domain_scores.get(domain).copied().unwrap_or(0.0),
                weight: health.domain_weights.get(domain).copied().unwrap_or(0.0),
                confidence: health.domain_confidence.get(domain).copied().unwrap_or(1.0),
                violation_count: outcome
                    .violations
                    .iter()
                    .filter(|v| v.code.domain() == Some(*domain))
                    .count(),
            })
            .collect();

        let mut reasoning = Vec::new();
        for violation in &outcome.violations {
            for id in &violation.requirement_ids {
                let Some(score) = scores.get(id) else {
                    continue;
                };
                reasoning.push(ReasonEntry {
                    requirement_id: id.clone(),
                    code: violation.code.0,
                    code_name: violation.code.name().to_string(),
                    message: violation.message.clone(),
                    scaled_penalty: crate::scoring::scaled_penalty(
                        violation,
                        health.phase,
                        score.context,
                    ),
                });
            }
        }
        reasoning.sort_by(|a, b| {
            (&a.requirement_id, a.code, &a.message).cmp(&(&b.requirement_id, b.code, &b.message))
        });

        let mut recommendations = recommend(snapshot, outcome, health);
        recommendations.sort_by(|a, b| {
            (a.severity, &a.kind, &a.requirement_ids).cmp(&(b.severity, &b.kind, &b.requirement_ids))
        });

        Report {
            summary,
            domains,
            reasoning,
            recommendations,
        }
    }
}

fn violation_ids(violations: &[&Violation]) -> Vec<String> {
    let mut ids: Vec<String> = violations
        .iter()
        .flat_map(|v| v.requirement_ids.iter().cloned())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

fn recommend(
    snapshot: &GraphSnapshot,
    outcome: &PassOutcome,
    health: &HealthReport,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let active: Vec<_> = snapshot.active_entities().collect();

    // Everything at one priority means nothing is actually prioritized.
    if active.len() >= 2 {
        let first = active[0].priority;
        if active.iter().all(|e| e.priority == first) {
            recommendations.push(Recommendation {
                severity: RecommendationSeverity::High,
                kind: RecommendationKind::PriorityDifferentiation,
                message: format!(
                    "all {} active requirements share priority {first}; rank them",
                    active.len()
                ),
                requirement_ids: vec![],
            });
        } else {
            let top_heavy = active.iter().filter(|e| e.priority >= 200).count();
            if (top_heavy as f64) / (active.len() as f64) > 0.7 {
                recommendations.push(Recommendation {
                    severity: RecommendationSeverity::Medium,
                    kind: RecommendationKind::PriorityImbalance,
                    message: format!(
                        "{top_heavy} of {} active requirements sit at priority 200 or above",
                        active.len()
                    ),
                    requirement_ids: vec![],
                });
            }
        }
    }

    // Performance and cost goals close in priority without a resource
    // finding usually means the trade-off was never examined.
    let has_resource_violation = outcome
        .violations
        .iter()
        .any(|v| v.code == ViolationCode::RESOURCE_OVERALLOCATION);
    if !has_resource_violation {
        let performance: Vec<_> = active
            .iter()
            .filter(|e| e.requirement_type == RequirementType::Performance)
            .collect();
        let cost: Vec<_> = active
            .iter()
            .filter(|e| e.requirement_type == RequirementType::Cost)
            .collect();
        for p in &performance {
            for c in &cost {
                if (i16::from(p.priority) - i16::from(c.priority)).abs() <= 30 {
                    let mut ids = vec![p.id.clone(), c.id.clone()];
                    ids.sort();
                    recommendations.push(Recommendation {
                        severity: RecommendationSeverity::Medium,
                        kind: RecommendationKind::TradeOffReview,
                        message: format!(
                            "performance goal {} and cost goal {} are ranked within 30 points; evaluate the trade-off",
                            p.id, c.id
                        ),
                        requirement_ids: ids,
                    });
                }
            }
        }
    }

    if health
        .domain_scores
        .get(&Domain::Structure)
        .is_some_and(|s| *s < -50.0)
    {
        let structural: Vec<&Violation> = outcome
            .violations
            .iter()
            .filter(|v| v.code.domain() == Some(Domain::Structure))
            .collect();
        recommendations.push(Recommendation {
            severity: RecommendationSeverity::High,
            kind: RecommendationKind::Restructure,
            message: "structural health is critical; untangle the dependency graph first".to_string(),
            requirement_ids: violation_ids(&structural),
        });
    }

    let duplicates: Vec<&Violation> = outcome
        .violations
        .iter()
        .filter(|v| v.code == ViolationCode::DUPLICATE_REQUIREMENT)
        .collect();
    if !duplicates.is_empty() {
        recommendations.push(Recommendation {
            severity: RecommendationSeverity::Medium,
            kind: RecommendationKind::MergeDuplicates,
            message: format!("{} duplicate cluster(s) found; merge or link them", duplicates.len()),
            requirement_ids: violation_ids(&duplicates),
        });
    }

    let stale: Vec<&Violation> = outcome
        .violations
        .iter()
        .filter(|v| v.code == ViolationCode::OBSOLESCENCE)
        .collect();
    if !stale.is_empty() {
        recommendations.push(Recommendation {
            severity: RecommendationSeverity::Low,
            kind: RecommendationKind::ArchiveStale,
            message: format!(
                "{} requirement(s) are stale and unreferenced; archive or refresh them",
                stale.len()
            ),
            requirement_ids: violation_ids(&stale),
        });
    }

    let unpaid: Vec<&Violation> = outcome
        .violations
        .iter()
        .filter(|v| v.code == ViolationCode::DEBT_ACCEPTED)
        .collect();
    if !unpaid.is_empty() {
        recommendations.push(Recommendation {
            severity: RecommendationSeverity::Medium,
            kind: RecommendationKind::SchedulePayback,
            message: format!(
                "{} requirement(s) carry unpaid technical debt; schedule payback work",
                unpaid.len()
            ),
            requirement_ids: violation_ids(&unpaid),
        });
    }

    recommendations
}
