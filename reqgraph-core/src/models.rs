use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Lifecycle status of a requirement.
///
/// Archived requirements stay in the store but leave active analysis;
/// they are never deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Proposed,
    Approved,
    Active,
    Archived,
    Resolved,
}

impl std::fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequirementStatus::Proposed => write!(f, "proposed"),
            RequirementStatus::Approved => write!(f, "approved"),
            RequirementStatus::Active => write!(f, "active"),
            RequirementStatus::Archived => write!(f, "archived"),
            RequirementStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl RequirementStatus {
    /// Parse a status from a string. `completed` is accepted as an alias
    /// of `resolved`; older exports use both spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "proposed" | "draft" => Some(RequirementStatus::Proposed),
            "approved" => Some(RequirementStatus::Approved),
            "active" => Some(RequirementStatus::Active),
            "archived" => Some(RequirementStatus::Archived),
            "resolved" | "completed" => Some(RequirementStatus::Resolved),
            _ => None,
        }
    }
}

/// Kind of a requirement. Drives which metadata extensions are meaningful
/// and which report recommendations can apply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    Business,
    Technical,
    Functional,
    Performance,
    Cost,
    Security,
    Process,
    Infrastructure,
    Constraint,
    DebtPayback,
}

impl std::fmt::Display for RequirementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequirementType::Business => write!(f, "business"),
            RequirementType::Technical => write!(f, "technical"),
            RequirementType::Functional => write!(f, "functional"),
            RequirementType::Performance => write!(f, "performance"),
            RequirementType::Cost => write!(f, "cost"),
            RequirementType::Security => write!(f, "security"),
            RequirementType::Process => write!(f, "process"),
            RequirementType::Infrastructure => write!(f, "infrastructure"),
            RequirementType::Constraint => write!(f, "constraint"),
            RequirementType::DebtPayback => write!(f, "debt_payback"),
        }
    }
}

/// A numeric constraint declared by a requirement, e.g.
/// `response_time <= 200 ms`. Conflicting values for the same metric
/// across requirements are what the semantic detector looks for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumericConstraint {
    /// Metric name, e.g. "response_time"
    pub metric: String,
    /// Constrained value
    pub value: f64,
    /// Unit of the value, e.g. "ms"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A claim on a shared, finite resource.
///
/// A requirement either declares how much of a resource it needs, or
/// (typically a `constraint`-type requirement) the maximum available.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceClaim {
    /// Maximum available amount of the resource
    Limit { resource: String, max: f64 },
    /// Amount of the resource this requirement needs
    Required { resource: String, amount: f64 },
}

impl ResourceClaim {
    pub fn resource(&self) -> &str {
        match self {
            ResourceClaim::Limit { resource, .. } => resource,
            ResourceClaim::Required { resource, .. } => resource,
        }
    }
}

/// Impact level of accepted technical debt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DebtImpact {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for DebtImpact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebtImpact::Low => write!(f, "low"),
            DebtImpact::Medium => write!(f, "medium"),
            DebtImpact::High => write!(f, "high"),
        }
    }
}

/// Explicit acceptance of technical debt, recorded at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebtAcceptance {
    /// Why the debt was accepted
    pub justification: String,
    /// How badly it bites dependents
    pub impact: DebtImpact,
}

/// Typed requirement metadata: a shared base plus explicit optional
/// extensions, rather than an open key/value map. Detectors only ever
/// consume these fields, so ad hoc keys would be dead weight.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    /// Owning person or team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Free-form tags; the semantic detector matches opposing pairs here
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Declared quality attributes (performance, security, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quality_attributes: Vec<String>,

    /// Numeric constraints declared by this requirement
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numeric_constraints: Vec<NumericConstraint>,

    /// Claims on shared resources (limits or requirements)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_claims: Vec<ResourceClaim>,

    /// Present iff this requirement was created as accepted technical debt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt: Option<DebtAcceptance>,
}

impl Metadata {
    /// Case-insensitive tag lookup over tags and quality attributes.
    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.to_lowercase();
        self.tags
            .iter()
            .chain(self.quality_attributes.iter())
            .any(|t| t.to_lowercase() == needle)
    }
}

/// A single requirement node in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementEntity {
    /// Stable unique identifier, e.g. "REQ-AUTH-001"
    pub id: String,

    /// Short title
    pub title: String,

    /// Detailed description
    pub description: String,

    /// Priority, 0-255, higher is more important
    #[serde(default = "default_priority")]
    pub priority: u8,

    /// Current lifecycle status
    #[serde(default = "default_status")]
    pub status: RequirementStatus,

    /// Kind of requirement
    #[serde(default = "default_requirement_type")]
    pub requirement_type: RequirementType,

    /// Embedding vector for similarity detection, if one has been computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Typed metadata extensions
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_priority() -> u8 {
    100
}

fn default_status() -> RequirementStatus {
    RequirementStatus::Proposed
}

fn default_requirement_type() -> RequirementType {
    RequirementType::Functional
}

impl RequirementEntity {
    /// Creates a new requirement with default status and type.
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            priority: 100,
            status: RequirementStatus::Proposed,
            requirement_type: RequirementType::Functional,
            embedding: None,
            metadata: Metadata::default(),
        }
    }

    /// Whether this requirement participates in active analysis.
    pub fn is_active(&self) -> bool {
        self.status != RequirementStatus::Archived
    }

    /// Validates the entity at ingestion. Malformed records are rejected
    /// here and never reach the detector pipeline.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::Validation {
                id: self.id.clone(),
                field: "id",
                reason: "must not be empty".into(),
            });
        }
        if self.title.trim().is_empty() {
            return Err(EngineError::Validation {
                id: self.id.clone(),
                field: "title",
                reason: "must not be empty".into(),
            });
        }
        if let Some(embedding) = &self.embedding {
            if embedding.is_empty() {
                return Err(EngineError::Validation {
                    id: self.id.clone(),
                    field: "embedding",
                    reason: "must not be an empty vector".into(),
                });
            }
        }
        for constraint in &self.metadata.numeric_constraints {
            if constraint.metric.trim().is_empty() {
                return Err(EngineError::Validation {
                    id: self.id.clone(),
                    field: "numeric_constraints",
                    reason: "metric name must not be empty".into(),
                });
            }
            if !constraint.value.is_finite() {
                return Err(EngineError::Validation {
                    id: self.id.clone(),
                    field: "numeric_constraints",
                    reason: format!("value for `{}` must be finite", constraint.metric),
                });
            }
        }
        for claim in &self.metadata.resource_claims {
            if claim.resource().trim().is_empty() {
                return Err(EngineError::Validation {
                    id: self.id.clone(),
                    field: "resource_claims",
                    reason: "resource name must not be empty".into(),
                });
            }
        }
        Ok(())
    }
}

/// Operation recorded by a version entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionOperation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for VersionOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionOperation::Create => write!(f, "create"),
            VersionOperation::Update => write!(f, "update"),
            VersionOperation::Delete => write!(f, "delete"),
        }
    }
}

/// One immutable entry in a requirement's version history, attached via
/// a HAS_VERSION edge. Entries are append-only and never mutated; age
/// and change frequency are derived from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionState {
    /// Unique id of this version record
    pub id: Uuid,
    /// When the mutation happened
    pub timestamp: DateTime<Utc>,
    /// What the mutation was
    pub operation: VersionOperation,
}

impl VersionState {
    pub fn new(operation: VersionOperation, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            operation,
        }
    }
}
