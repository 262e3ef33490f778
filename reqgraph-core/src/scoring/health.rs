//! Per-requirement scoring and graph-level health aggregation.
//!
//! Each requirement gets a stable score (write-once baseline plus a
//! moving current) and per-domain penalty totals. Aggregation averages
//! the domain penalties across requirements, weights them by phase, and
//! folds the result into a display score, a health level, and a
//! verdict.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::detectors::PassOutcome;
use crate::error::EngineError;
use crate::graph::GraphSnapshot;
use crate::scoring::context::ScoringContext;
use crate::scoring::friction::FrictionLog;
use crate::scoring::phase::BusinessPhase;
use crate::scoring::stable::{scaled_penalty, StableScore};
use crate::taxonomy::Domain;

/// Score state of one requirement after a pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementScore {
    pub id: String,
    pub stable: StableScore,
    pub context: ScoringContext,
    /// Scaled penalty totals per health domain
    pub domain_penalties: BTreeMap<Domain, i64>,
    /// Trend prediction 90 days out
    pub predicted: i64,
}

/// Health level bands over the overall weighted score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HealthLevel {
    S01,
    S02,
    S03,
    S04,
    S05,
}

impl HealthLevel {
    fn from_overall(overall: f64) -> Self {
        if overall >= -20.0 {
            HealthLevel::S01
        } else if overall >= -40.0 {
            HealthLevel::S02
        } else if overall >= -60.0 {
            HealthLevel::S03
        } else if overall >= -80.0 {
            HealthLevel::S04
        } else {
            HealthLevel::S05
        }
    }
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthLevel::S01 => write!(f, "S01"),
            HealthLevel::S02 => write!(f, "S02"),
            HealthLevel::S03 => write!(f, "S03"),
            HealthLevel::S04 => write!(f, "S04"),
            HealthLevel::S05 => write!(f, "S05"),
        }
    }
}

/// Go/no-go reading of the display score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    PassWithWarning,
    ActionRequired,
}

impl Verdict {
    fn from_display(display: u8) -> Self {
        if display >= 70 {
            Verdict::Pass
        } else if display >= 50 {
            Verdict::PassWithWarning
        } else {
            Verdict::ActionRequired
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::PassWithWarning => write!(f, "pass_with_warning"),
            Verdict::ActionRequired => write!(f, "action_required"),
        }
    }
}

/// Graph-level summary of one pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub phase: BusinessPhase,
    /// Mean per-requirement penalty per domain, clamped to [-100, 0]
    pub domain_scores: BTreeMap<Domain, f64>,
    pub domain_weights: BTreeMap<Domain, f64>,
    pub domain_confidence: BTreeMap<Domain, f64>,
    /// Weighted sum of domain scores, in [-100, 0]
    pub overall: f64,
    /// `clamp(100 + overall, 0, 100)` for humans
    pub display: u8,
    pub level: HealthLevel,
    pub verdict: Verdict,
    /// Violation counts keyed by severity level
    pub severity_counts: BTreeMap<u8, usize>,
}

/// Scores every active requirement in the snapshot. Archived
/// requirements are out of active analysis: no baseline is established
/// for them and they never enter the domain means. An existing stable
/// score keeps its baseline; new requirements establish one from this
/// pass's violations. Multi-requirement violations charge every member.
pub fn score_requirements(
    snapshot: &GraphSnapshot,
    outcome: &PassOutcome,
    phase: BusinessPhase,
    existing: &BTreeMap<String, StableScore>,
    friction: &FrictionLog,
) -> BTreeMap<String, RequirementScore> {
    snapshot
        .entities
        .iter()
        .filter(|(_, entity)| entity.is_active())
        .collect::<Vec<_>>()
        .par_iter()
        .map(|&(id, entity)| {
            let context = ScoringContext::identify(entity);
            let violations: Vec<_> = outcome.violations_for(id).cloned().collect();

            let mut stable = match existing.get(id) {
                Some(known) => known.clone(),
                None => StableScore::establish(&violations),
            };

            let mut domain_penalties: BTreeMap<Domain, i64> = BTreeMap::new();
            // Rebuild current from the baseline so repeated passes over
            // the same snapshot do not compound penalties.
            let mut current = stable.baseline();
            for violation in &violations {
                let penalty = scaled_penalty(violation, phase, context);
                current += penalty;
                if let Some(domain) = violation.code.domain() {
                    *domain_penalties.entry(domain).or_insert(0) += penalty;
                }
            }
            // Friction drags the current score but belongs to no
            // detection domain, so it never shifts the domain means.
            current += friction.penalty_for(id);
            stable = StableScore::from_parts(stable.baseline(), current, stable.history().to_vec());

            let predicted = stable.predict(90);
            (
                id.clone(),
                RequirementScore {
                    id: id.clone(),
                    stable,
                    context,
                    domain_penalties,
                    predicted,
                },
            )
        })
        .collect()
}

/// Folds per-requirement scores and the pass outcome into a graph-level
/// health report. Fails fast on a weight table that does not sum to
/// 1.0; weights are never renormalized.
pub fn aggregate(
    outcome: &PassOutcome,
    scores: &BTreeMap<String, RequirementScore>,
    phase: BusinessPhase,
) -> Result<HealthReport, EngineError> {
    phase.validate_weights()?;
    let requirement_count = scores.len().max(1) as f64;

    let mut domain_scores: BTreeMap<Domain, f64> = BTreeMap::new();
    for domain in Domain::ALL {
        let total: i64 = scores
            .values()
            .filter_map(|s| s.domain_penalties.get(&domain))
            .sum();
        let mean = total as f64 / requirement_count;
        domain_scores.insert(domain, mean.clamp(-100.0, 0.0));
    }

    let domain_weights: BTreeMap<Domain, f64> = phase.domain_weights().into_iter().collect();
    let overall: f64 = domain_scores
        .iter()
        .map(|(domain, score)| score * domain_weights[domain])
        .sum();

    let display = (100.0 + overall).clamp(0.0, 100.0).round() as u8;

    let mut severity_counts: BTreeMap<u8, usize> = BTreeMap::new();
    for violation in &outcome.violations {
        *severity_counts.entry(violation.severity).or_insert(0) += 1;
    }

    Ok(HealthReport {
        phase,
        domain_scores,
        domain_weights,
        domain_confidence: outcome.domain_confidence.clone(),
        overall,
        display,
        level: HealthLevel::from_overall(overall),
        verdict: Verdict::from_display(display),
        severity_counts,
    })
}
