//! Phase-aware scoring of requirements and the graph as a whole.

pub mod context;
pub mod friction;
pub mod health;
pub mod phase;
pub mod stable;

pub use context::ScoringContext;
pub use friction::{FrictionCode, FrictionLog};
pub use health::{aggregate, score_requirements, HealthLevel, HealthReport, RequirementScore, Verdict};
pub use phase::{BusinessPhase, PhaseCoefficients};
pub use stable::{scaled_penalty, HistoryPoint, StableScore};
