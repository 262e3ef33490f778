pub mod analysis;
pub mod config;
pub mod db;
pub mod detectors;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod models;
pub mod report;
pub mod scoring;
pub mod taxonomy;

// Re-export commonly used types
pub use analysis::{AnalysisResult, Analyzer};
pub use config::EngineConfig;
pub use detectors::{Detector, DetectorPipeline, DetectorReport, PassOutcome};
pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use error::{DetectorError, EngineError};
pub use graph::{Edge, EdgeKind, GraphSnapshot, GraphStore, MemoryGraph};
pub use models::{
    DebtAcceptance, DebtImpact, Metadata, NumericConstraint, RequirementEntity, RequirementStatus,
    RequirementType, ResourceClaim, VersionOperation, VersionState,
};
pub use report::{Recommendation, RecommendationKind, RecommendationSeverity, Report};
pub use scoring::{
    BusinessPhase, FrictionCode, FrictionLog, HealthLevel, HealthReport, HistoryPoint,
    RequirementScore, ScoringContext, StableScore, Verdict,
};
pub use taxonomy::{
    Domain, Violation, ViolationCategory, ViolationCode, ViolationDetails, TAXONOMY_VERSION,
};
