//! Static registry of coded violation kinds.
//!
//! Codes live in fixed numeric bands: 1000-1999 structural, 2000-2999
//! consistency/resource, 3000-3999 convention, 9000 no-violation.
//! Adding a kind means registering a new code; codes are never reused or
//! renumbered, or historical scores stop being comparable.

use serde::{Deserialize, Serialize};

use crate::models::DebtImpact;

/// Version of the violation-code table. Bump when codes are added.
pub const TAXONOMY_VERSION: &str = "1.0.0";

/// Scoring domain a violation is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Structure,
    Resource,
    Priority,
    Semantic,
    Staleness,
    TypeConsistency,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Structure,
        Domain::Resource,
        Domain::Priority,
        Domain::Semantic,
        Domain::Staleness,
        Domain::TypeConsistency,
    ];
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Structure => write!(f, "structure"),
            Domain::Resource => write!(f, "resource"),
            Domain::Priority => write!(f, "priority"),
            Domain::Semantic => write!(f, "semantic"),
            Domain::Staleness => write!(f, "staleness"),
            Domain::TypeConsistency => write!(f, "type_consistency"),
        }
    }
}

/// Broad violation category, derived from the code's numeric band.
/// Business-phase coefficients are keyed on this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    Structural,
    Consistency,
    Convention,
    None,
}

/// Coded violation kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViolationCode(pub u16);

impl ViolationCode {
    // 1xxx: structural
    pub const GRAPH_DEPTH_EXCEEDED: ViolationCode = ViolationCode(1001);
    pub const SELF_REFERENCE: ViolationCode = ViolationCode(1002);
    pub const CIRCULAR_REFERENCE: ViolationCode = ViolationCode(1003);

    // 2xxx: consistency / resource
    pub const MISSING_DEPENDENCY: ViolationCode = ViolationCode(2001);
    pub const RESOURCE_OVERALLOCATION: ViolationCode = ViolationCode(2002);
    pub const PRIORITY_INVERSION: ViolationCode = ViolationCode(2003);
    pub const NUMERIC_CONSTRAINT_CONFLICT: ViolationCode = ViolationCode(2004);
    pub const QUALITATIVE_CONTRADICTION: ViolationCode = ViolationCode(2005);
    pub const DUPLICATE_REQUIREMENT: ViolationCode = ViolationCode(2006);
    pub const OBSOLESCENCE: ViolationCode = ViolationCode(2007);
    pub const TYPE_LEVEL_MISMATCH: ViolationCode = ViolationCode(2008);
    pub const DEBT_ACCEPTED: ViolationCode = ViolationCode(2009);
    pub const DEBT_INHERITED: ViolationCode = ViolationCode(2010);
    pub const PRIORITY_DISAGREEMENT: ViolationCode = ViolationCode(2011);

    // 3xxx: convention
    pub const NAMING_CONVENTION: ViolationCode = ViolationCode(3001);
    pub const DESCRIPTION_TOO_SHORT: ViolationCode = ViolationCode(3002);

    /// Sentinel for a clean pass.
    pub const NO_VIOLATION: ViolationCode = ViolationCode(9000);

    /// Base penalty for this code (a non-positive integer).
    pub fn base_score(self) -> i64 {
        match self {
            ViolationCode::GRAPH_DEPTH_EXCEEDED => -100,
            ViolationCode::SELF_REFERENCE => -100,
            ViolationCode::CIRCULAR_REFERENCE => -100,
            ViolationCode::MISSING_DEPENDENCY => -30,
            ViolationCode::RESOURCE_OVERALLOCATION => -40,
            ViolationCode::PRIORITY_INVERSION => -30,
            ViolationCode::NUMERIC_CONSTRAINT_CONFLICT => -30,
            ViolationCode::QUALITATIVE_CONTRADICTION => -30,
            ViolationCode::DUPLICATE_REQUIREMENT => -20,
            ViolationCode::OBSOLESCENCE => -20,
            ViolationCode::TYPE_LEVEL_MISMATCH => -30,
            ViolationCode::DEBT_ACCEPTED => -20,
            ViolationCode::DEBT_INHERITED => -30,
            ViolationCode::PRIORITY_DISAGREEMENT => -20,
            ViolationCode::NAMING_CONVENTION => -10,
            ViolationCode::DESCRIPTION_TOO_SHORT => -20,
            _ => 0,
        }
    }

    /// Severity level, 1 (none) to 5 (critical).
    pub fn severity_level(self) -> u8 {
        match self.0 {
            1000..=1999 => 5,
            2002 => 4,
            2000..=2999 => 3,
            3000..=3999 => 2,
            _ => 1,
        }
    }

    /// Category by numeric band.
    pub fn category(self) -> ViolationCategory {
        match self.0 {
            1000..=1999 => ViolationCategory::Structural,
            2000..=2999 => ViolationCategory::Consistency,
            3000..=3999 => ViolationCategory::Convention,
            _ => ViolationCategory::None,
        }
    }

    /// Scoring domain this code is attributed to. `NO_VIOLATION` has none.
    pub fn domain(self) -> Option<Domain> {
        match self {
            ViolationCode::GRAPH_DEPTH_EXCEEDED
            | ViolationCode::SELF_REFERENCE
            | ViolationCode::CIRCULAR_REFERENCE
            | ViolationCode::MISSING_DEPENDENCY => Some(Domain::Structure),
            ViolationCode::RESOURCE_OVERALLOCATION => Some(Domain::Resource),
            ViolationCode::PRIORITY_INVERSION
            | ViolationCode::PRIORITY_DISAGREEMENT
            | ViolationCode::DEBT_ACCEPTED
            | ViolationCode::DEBT_INHERITED => Some(Domain::Priority),
            ViolationCode::NUMERIC_CONSTRAINT_CONFLICT
            | ViolationCode::QUALITATIVE_CONTRADICTION
            | ViolationCode::DUPLICATE_REQUIREMENT => Some(Domain::Semantic),
            ViolationCode::OBSOLESCENCE => Some(Domain::Staleness),
            ViolationCode::TYPE_LEVEL_MISMATCH
            | ViolationCode::NAMING_CONVENTION
            | ViolationCode::DESCRIPTION_TOO_SHORT => Some(Domain::TypeConsistency),
            _ => None,
        }
    }

    /// Stable human-readable name of the code.
    pub fn name(self) -> &'static str {
        match self {
            ViolationCode::GRAPH_DEPTH_EXCEEDED => "graph_depth_exceeded",
            ViolationCode::SELF_REFERENCE => "self_reference",
            ViolationCode::CIRCULAR_REFERENCE => "circular_reference",
            ViolationCode::MISSING_DEPENDENCY => "missing_dependency",
            ViolationCode::RESOURCE_OVERALLOCATION => "resource_overallocation",
            ViolationCode::PRIORITY_INVERSION => "priority_inversion",
            ViolationCode::NUMERIC_CONSTRAINT_CONFLICT => "numeric_constraint_conflict",
            ViolationCode::QUALITATIVE_CONTRADICTION => "qualitative_contradiction",
            ViolationCode::DUPLICATE_REQUIREMENT => "duplicate_requirement",
            ViolationCode::OBSOLESCENCE => "obsolescence",
            ViolationCode::TYPE_LEVEL_MISMATCH => "type_level_mismatch",
            ViolationCode::DEBT_ACCEPTED => "debt_accepted",
            ViolationCode::DEBT_INHERITED => "debt_inherited",
            ViolationCode::PRIORITY_DISAGREEMENT => "priority_disagreement",
            ViolationCode::NAMING_CONVENTION => "naming_convention",
            ViolationCode::DESCRIPTION_TOO_SHORT => "description_too_short",
            ViolationCode::NO_VIOLATION => "no_violation",
            _ => "unknown",
        }
    }
}

impl std::fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// Typed per-kind payload attached to a violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationDetails {
    None,
    Cycle {
        path: Vec<String>,
    },
    DepthExceeded {
        chain: Vec<String>,
        depth: usize,
        max_depth: usize,
    },
    Resource {
        resource: String,
        total_requested: f64,
        available: f64,
        shortage: f64,
    },
    PriorityInversion {
        dependent: String,
        dependency: String,
        priority_difference: u8,
    },
    NumericConflict {
        metric: String,
        values: Vec<f64>,
        ratio: f64,
    },
    Contradiction {
        first_tag: String,
        second_tag: String,
    },
    Duplicate {
        member_ids: Vec<String>,
        similarity_score: f64,
    },
    Obsolescence {
        days_since_update: i64,
        referenced_count: usize,
        obsolescence_score: f64,
    },
    Debt {
        inherited: bool,
        impact: DebtImpact,
        debt_id: String,
    },
}

/// One detected rule breach. Produced fresh on every analysis pass;
/// the persisted artifact is the stable score, never the violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub code: ViolationCode,
    /// All implicated requirement ids, sorted
    pub requirement_ids: Vec<String>,
    pub message: String,
    /// 1 (none) to 5 (critical), derived from the code
    pub severity: u8,
    #[serde(default = "default_details")]
    pub details: ViolationDetails,
}

fn default_details() -> ViolationDetails {
    ViolationDetails::None
}

impl Violation {
    pub fn new(
        code: ViolationCode,
        mut requirement_ids: Vec<String>,
        message: impl Into<String>,
        details: ViolationDetails,
    ) -> Self {
        requirement_ids.sort();
        Self {
            code,
            requirement_ids,
            message: message.into(),
            severity: code.severity_level(),
            details,
        }
    }

    /// Sort key giving a deterministic order independent of which
    /// detector finished first.
    pub fn sort_key(&self) -> (u16, Vec<String>, String) {
        (self.code.0, self.requirement_ids.clone(), self.message.clone())
    }
}
