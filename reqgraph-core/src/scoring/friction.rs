//! Delivery friction penalties.
//!
//! Friction records drag observed on a requirement that the graph
//! detectors cannot see: review churn, blocked handoffs, rework, and
//! scope renegotiation. Each code carries a per-unit penalty and a cap
//! so one noisy signal cannot sink a score alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Observed friction categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FrictionCode {
    /// Review rounds beyond the first
    ReviewChurn,
    /// Days spent blocked on another team or system
    BlockedHandoff,
    /// Implementation discarded and redone
    Rework,
    /// Scope renegotiated after approval
    ScopeRenegotiation,
}

impl FrictionCode {
    pub const ALL: [FrictionCode; 4] = [
        FrictionCode::ReviewChurn,
        FrictionCode::BlockedHandoff,
        FrictionCode::Rework,
        FrictionCode::ScopeRenegotiation,
    ];

    /// Stable friction code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            FrictionCode::ReviewChurn => "F001",
            FrictionCode::BlockedHandoff => "F002",
            FrictionCode::Rework => "F003",
            FrictionCode::ScopeRenegotiation => "F004",
        }
    }

    /// Penalty per observed unit.
    pub fn per_unit(&self) -> i64 {
        match self {
            FrictionCode::ReviewChurn => -20,
            FrictionCode::BlockedHandoff => -30,
            FrictionCode::Rework => -15,
            FrictionCode::ScopeRenegotiation => -25,
        }
    }

    /// Floor for the accumulated penalty of this code.
    pub fn cap(&self) -> i64 {
        match self {
            FrictionCode::ReviewChurn => -60,
            FrictionCode::BlockedHandoff => -90,
            FrictionCode::Rework => -75,
            FrictionCode::ScopeRenegotiation => -100,
        }
    }

    /// Total penalty for `units` observations, capped.
    pub fn score(&self, units: u32) -> i64 {
        (self.per_unit() * i64::from(units)).max(self.cap())
    }
}

impl std::fmt::Display for FrictionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Accumulated friction observations per requirement. Units for the
/// same code add up before the cap applies, so ten separate one-day
/// blocks cost the same as one ten-day block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FrictionLog {
    observations: BTreeMap<String, BTreeMap<FrictionCode, u32>>,
}

impl FrictionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, requirement_id: impl Into<String>, code: FrictionCode, units: u32) {
        *self
            .observations
            .entry(requirement_id.into())
            .or_default()
            .entry(code)
            .or_insert(0) += units;
    }

    /// Total capped penalty for one requirement.
    pub fn penalty_for(&self, requirement_id: &str) -> i64 {
        self.observations
            .get(requirement_id)
            .map(|per_code| {
                per_code
                    .iter()
                    .map(|(code, units)| code.score(*units))
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
