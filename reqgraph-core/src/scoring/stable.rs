//! Stable score with a write-once baseline.
//!
//! A requirement's baseline is fixed at first scoring from the unscaled
//! base penalties and never moves again; all later movement happens in
//! the current score. A short history of (day offset, score) points
//! feeds a least-squares trend line for prediction.

use serde::{Deserialize, Serialize};

use crate::scoring::context::ScoringContext;
use crate::scoring::friction::FrictionCode;
use crate::scoring::phase::BusinessPhase;
use crate::taxonomy::Violation;

/// One historical observation of a requirement's score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HistoryPoint {
    /// Days since the baseline was established
    pub day_offset: i64,
    pub score: i64,
}

/// Baseline is private so nothing outside this module can rewrite it
/// after establishment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
struct BaselineScore(i64);

/// Score state for one requirement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StableScore {
    baseline: BaselineScore,
    current: i64,
    history: Vec<HistoryPoint>,
}

impl StableScore {
    /// Establishes the baseline from the unscaled base penalties of the
    /// violations present at first scoring. 100 is a clean slate.
    pub fn establish(violations: &[Violation]) -> Self {
        let penalty: i64 = violations.iter().map(|v| v.code.base_score()).sum();
        let baseline = 100 + penalty;
        Self {
            baseline: BaselineScore(baseline),
            current: baseline,
            history: Vec::new(),
        }
    }

    /// Rehydrates a score loaded from persistence.
    pub fn from_parts(baseline: i64, current: i64, history: Vec<HistoryPoint>) -> Self {
        Self {
            baseline: BaselineScore(baseline),
            current,
            history,
        }
    }

    pub fn baseline(&self) -> i64 {
        self.baseline.0
    }

    pub fn current(&self) -> i64 {
        self.current
    }

    pub fn history(&self) -> &[HistoryPoint] {
        &self.history
    }

    /// Applies a violation's penalty scaled by phase and context. The
    /// scaled penalty rounds to the nearest integer point.
    pub fn apply_violation(
        &mut self,
        violation: &Violation,
        phase: BusinessPhase,
        context: ScoringContext,
    ) -> i64 {
        let scaled = scaled_penalty(violation, phase, context);
        self.current += scaled;
        scaled
    }

    /// Applies accumulated friction for one code.
    pub fn add_friction(&mut self, code: FrictionCode, units: u32) -> i64 {
        let penalty = code.score(units);
        self.current += penalty;
        penalty
    }

    pub fn record_history(&mut self, day_offset: i64) {
        self.history.push(HistoryPoint {
            day_offset,
            score: self.current,
        });
    }

    /// Predicts the score at `day_offset` from a least-squares fit over
    /// the history. Fewer than two points means no trend; the current
    /// score is the best guess.
    pub fn predict(&self, day_offset: i64) -> i64 {
        if self.history.len() < 2 {
            return self.current;
        }
        let n = self.history.len() as f64;
        let sum_x: f64 = self.history.iter().map(|p| p.day_offset as f64).sum();
        let sum_y: f64 = self.history.iter().map(|p| p.score as f64).sum();
        let sum_xy: f64 = self
            .history
            .iter()
            .map(|p| p.day_offset as f64 * p.score as f64)
            .sum();
        let sum_xx: f64 = self
            .history
            .iter()
            .map(|p| (p.day_offset as f64).powi(2))
            .sum();
        let denominator = n * sum_xx - sum_x * sum_x;
        if denominator.abs() < f64::EPSILON {
            return self.current;
        }
        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_x) / n;
        (slope * day_offset as f64 + intercept).round() as i64
    }
}

/// A violation's base penalty scaled by the phase's category coefficient
/// and the requirement's context coefficient.
pub fn scaled_penalty(
    violation: &Violation,
    phase: BusinessPhase,
    context: ScoringContext,
) -> i64 {
    let base = violation.code.base_score() as f64;
    let scaled = base * phase.category_coefficient(violation.code.category()) * context.coefficient();
    scaled.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{ViolationCode, ViolationDetails};

    fn violation(code: ViolationCode) -> Violation {
        Violation::new(
            code,
            vec!["REQ-001".to_string()],
            "test violation".to_string(),
            ViolationDetails::None,
        )
    }

    #[test]
    fn test_baseline_from_base_penalties() {
        let violations = vec![
            violation(ViolationCode::CIRCULAR_REFERENCE),
            violation(ViolationCode::MISSING_DEPENDENCY),
        ];
        let score = StableScore::establish(&violations);
        assert_eq!(score.baseline(), 100 - 100 - 30);
        assert_eq!(score.current(), score.baseline());
    }

    #[test]
    fn test_clean_slate_baseline() {
        let score = StableScore::establish(&[]);
        assert_eq!(score.baseline(), 100);
    }

    #[test]
    fn test_rehydration_keeps_baseline() {
        let score = StableScore::from_parts(70, 55, vec![]);
        assert_eq!(score.baseline(), 70);
        assert_eq!(score.current(), 55);
    }

    #[test]
    fn test_scaled_penalty_phase_and_context() {
        let v = violation(ViolationCode::RESOURCE_OVERALLOCATION);
        // base -40, growth friction 0.8, hotfix 0.5 => -16
        assert_eq!(
            scaled_penalty(&v, BusinessPhase::Growth, ScoringContext::Hotfix),
            -16
        );
        // maturity friction 1.2, debt 1.5 => -72
        assert_eq!(
            scaled_penalty(&v, BusinessPhase::Maturity, ScoringContext::TechnicalDebt),
            -72
        );
    }

    #[test]
    fn test_friction_moves_current_not_baseline() {
        let mut score = StableScore::establish(&[]);
        score.add_friction(FrictionCode::ReviewChurn, 2);
        assert_eq!(score.baseline(), 100);
        assert_eq!(score.current(), 60);
    }

    #[test]
    fn test_prediction_linear_trend() {
        let mut score = StableScore::from_parts(100, 75, vec![]);
        score.history = vec![
            HistoryPoint { day_offset: 0, score: 85 },
            HistoryPoint { day_offset: 30, score: 80 },
            HistoryPoint { day_offset: 60, score: 75 },
        ];
        assert_eq!(score.predict(90), 70);
    }

    #[test]
    fn test_prediction_without_history_is_current() {
        let score = StableScore::from_parts(100, 64, vec![]);
        assert_eq!(score.predict(90), 64);

        let one_point = StableScore::from_parts(
            100,
            64,
            vec![HistoryPoint { day_offset: 0, score: 64 }],
        );
        assert_eq!(one_point.predict(90), 64);
    }
}
