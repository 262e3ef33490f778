//! Business phase and its scoring coefficients.
//!
//! The same violation costs different amounts depending on how mature
//! the business is: early phases tolerate mess and prize speed, mature
//! phases punish structural decay. Each phase also carries its own
//! weighting of the six health domains.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::taxonomy::{Domain, ViolationCategory};

/// Five-level maturity scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BusinessPhase {
    Exploration,
    Validation,
    Growth,
    Expansion,
    Maturity,
}

/// Per-phase scaling of violation categories and delivery speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseCoefficients {
    /// Scales structural (1xxx) penalties
    pub structure: f64,
    /// Scales consistency (2xxx) penalties
    pub friction: f64,
    /// Scales convention (3xxx) penalties
    pub completeness: f64,
    /// Informational speed premium, reported but not applied to scores
    pub speed: f64,
}

impl BusinessPhase {
    pub const ALL: [BusinessPhase; 5] = [
        BusinessPhase::Exploration,
        BusinessPhase::Validation,
        BusinessPhase::Growth,
        BusinessPhase::Expansion,
        BusinessPhase::Maturity,
    ];

    /// Maturity on a 0.2 to 1.0 scale.
    pub fn value(&self) -> f64 {
        match self {
            BusinessPhase::Exploration => 0.2,
            BusinessPhase::Validation => 0.4,
            BusinessPhase::Growth => 0.6,
            BusinessPhase::Expansion => 0.8,
            BusinessPhase::Maturity => 1.0,
        }
    }

    pub fn coefficients(&self) -> PhaseCoefficients {
        match self {
            BusinessPhase::Exploration => PhaseCoefficients {
                structure: 0.5,
                friction: 0.3,
                completeness: 0.2,
                speed: 2.0,
            },
            BusinessPhase::Validation => PhaseCoefficients {
                structure: 0.75,
                friction: 0.5,
                completeness: 0.4,
                speed: 1.5,
            },
            BusinessPhase::Growth => PhaseCoefficients {
                structure: 1.0,
                friction: 0.8,
                completeness: 0.6,
                speed: 1.0,
            },
            BusinessPhase::Expansion => PhaseCoefficients {
                structure: 1.25,
                friction: 1.0,
                completeness: 0.8,
                speed: 0.75,
            },
            BusinessPhase::Maturity => PhaseCoefficients {
                structure: 1.5,
                friction: 1.2,
                completeness: 1.0,
                speed: 0.5,
            },
        }
    }

    /// Coefficient applied to a violation of the given category in this
    /// phase. Informational codes are never scaled.
    pub fn category_coefficient(&self, category: ViolationCategory) -> f64 {
        let c = self.coefficients();
        match category {
            ViolationCategory::Structural => c.structure,
            ViolationCategory::Consistency => c.friction,
            ViolationCategory::Convention => c.completeness,
            ViolationCategory::None => 0.0,
        }
    }

    /// How much each health domain contributes to the overall score in
    /// this phase. Rows sum to 1.0; `validate_weights` enforces that.
    pub fn domain_weights(&self) -> [(Domain, f64); 6] {
        match self {
            BusinessPhase::Exploration => [
                (Domain::Structure, 0.30),
                (Domain::Resource, 0.15),
                (Domain::Priority, 0.15),
                (Domain::Semantic, 0.20),
                (Domain::Staleness, 0.05),
                (Domain::TypeConsistency, 0.15),
            ],
            BusinessPhase::Validation => [
                (Domain::Structure, 0.28),
                (Domain::Resource, 0.17),
                (Domain::Priority, 0.15),
                (Domain::Semantic, 0.20),
                (Domain::Staleness, 0.07),
                (Domain::TypeConsistency, 0.13),
            ],
            BusinessPhase::Growth => [
                (Domain::Structure, 0.25),
                (Domain::Resource, 0.20),
                (Domain::Priority, 0.15),
                (Domain::Semantic, 0.20),
                (Domain::Staleness, 0.10),
                (Domain::TypeConsistency, 0.10),
            ],
            BusinessPhase::Expansion => [
                (Domain::Structure, 0.22),
                (Domain::Resource, 0.20),
                (Domain::Priority, 0.18),
                (Domain::Semantic, 0.18),
                (Domain::Staleness, 0.12),
                (Domain::TypeConsistency, 0.10),
            ],
            BusinessPhase::Maturity => [
                (Domain::Structure, 0.20),
                (Domain::Resource, 0.18),
                (Domain::Priority, 0.20),
                (Domain::Semantic, 0.15),
                (Domain::Staleness, 0.15),
                (Domain::TypeConsistency, 0.12),
            ],
        }
    }

    /// Rejects a weight table that does not sum to 1.0 within epsilon.
    pub fn validate_weights(&self) -> Result<(), EngineError> {
        let sum: f64 = self.domain_weights().iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(EngineError::WeightSum {
                phase: self.to_string(),
                sum,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for BusinessPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusinessPhase::Exploration => write!(f, "exploration"),
            BusinessPhase::Validation => write!(f, "validation"),
            BusinessPhase::Growth => write!(f, "growth"),
            BusinessPhase::Expansion => write!(f, "expansion"),
            BusinessPhase::Maturity => write!(f, "maturity"),
        }
    }
}

impl std::str::FromStr for BusinessPhase {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exploration" => Ok(BusinessPhase::Exploration),
            "validation" => Ok(BusinessPhase::Validation),
            "growth" => Ok(BusinessPhase::Growth),
            "expansion" => Ok(BusinessPhase::Expansion),
            "maturity" => Ok(BusinessPhase::Maturity),
            other => Err(EngineError::Config(format!("unknown phase: {other}"))),
        }
    }
}
