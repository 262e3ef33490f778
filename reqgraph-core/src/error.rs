//! Error taxonomy for the scoring engine.
//!
//! Input errors are rejected at ingestion, detector errors degrade the
//! affected domain to confidence zero, and aggregation errors fail the
//! pass fast. Nothing here is retried automatically.

use thiserror::Error;

/// Errors that abort an operation or a whole pass.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A malformed requirement record, rejected before detection.
    #[error("invalid requirement `{id}`: field `{field}` {reason}")]
    Validation {
        id: String,
        field: &'static str,
        reason: String,
    },

    /// Domain weights for a phase do not sum to 1.0. This is a
    /// configuration bug; the pass fails fast rather than renormalizing.
    #[error("domain weights for phase {phase} sum to {sum}, expected 1.0")]
    WeightSum { phase: String, sum: f64 },

    /// Bad engine configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Referenced node does not exist in the graph.
    #[error("unknown requirement `{0}`")]
    UnknownRequirement(String),
}

/// A single detector failing. The pass continues; the detector's domain
/// is reported as unavailable with confidence 0.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector `{detector}` unavailable: {reason}")]
    Unavailable {
        detector: &'static str,
        reason: String,
    },

    /// The detector started but could not finish its pass.
    #[error("detector `{detector}` failed: {reason}")]
    Failed {
        detector: &'static str,
        reason: String,
    },
}
