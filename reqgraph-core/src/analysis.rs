//! Analysis orchestration.
//!
//! One pass: snapshot in, detectors run, requirements scored, health
//! aggregated, report built. The analyzer owns the moving parts so
//! callers deal with a single entry point.

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::detectors::{DetectorPipeline, PassOutcome};
use crate::embedding::EmbeddingProvider;
use crate::error::EngineError;
use crate::graph::GraphSnapshot;
use crate::report::Report;
use crate::scoring::{
    aggregate, score_requirements, FrictionLog, HealthReport, RequirementScore, StableScore,
};

/// Everything one pass produces.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub outcome: PassOutcome,
    pub scores: BTreeMap<String, RequirementScore>,
    pub health: HealthReport,
    pub report: Report,
}

pub struct Analyzer {
    config: EngineConfig,
    pipeline: DetectorPipeline,
    embedder: Option<Box<dyn EmbeddingProvider>>,
}

impl Analyzer {
    pub fn new(config: EngineConfig) -> Self {
        let pipeline = DetectorPipeline::standard(&config);
        Self {
            config,
            pipeline,
            embedder: None,
        }
    }

    /// Attaches an embedding provider used to fill vectors for
    /// requirements that arrive without one. A provider failure is not
    /// fatal: the entity stays unembedded and duplicate detection falls
    /// back to lexical similarity with reduced confidence.
    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn embed_missing<'a>(&self, snapshot: &'a GraphSnapshot) -> Cow<'a, GraphSnapshot> {
        let Some(embedder) = &self.embedder else {
            return Cow::Borrowed(snapshot);
        };
        let mut embedded = snapshot.clone();
        for entity in embedded.entities.values_mut() {
            if !entity.is_active() || entity.embedding.is_some() {
                continue;
            }
            let text = format!("{} {}", entity.title, entity.description);
            match embedder.embed(&text) {
                Ok(vector) => entity.embedding = Some(vector),
                Err(err) => {
                    warn!(requirement = %entity.id, error = %err, "embedding failed, falling back to lexical similarity");
                }
            }
        }
        Cow::Owned(embedded)
    }

    /// Runs a full pass over the snapshot. `existing_scores` carries
    /// baselines from persistence; requirements not present establish a
    /// fresh baseline from this pass. `friction` holds observed delivery
    /// drag to charge against current scores.
    pub fn run(
        &self,
        snapshot: &GraphSnapshot,
        existing_scores: &BTreeMap<String, StableScore>,
        friction: &FrictionLog,
    ) -> Result<AnalysisResult, EngineError> {
        debug!(
            requirements = snapshot.entities.len(),
            phase = %self.config.phase,
            "starting analysis pass"
        );
        let snapshot = self.embed_missing(snapshot);
        let outcome = self.pipeline.run(&snapshot);
        let scores =
            score_requirements(&snapshot, &outcome, self.config.phase, existing_scores, friction);
        let health = aggregate(&outcome, &scores, self.config.phase)?;
        let report = Report::build(
            &snapshot,
            &outcome,
            &scores,
            &health,
            &self.config.taxonomy_version,
        );
        info!(
            violations = outcome.violations.len(),
            display = health.display,
            verdict = %health.verdict,
            "analysis pass complete"
        );
        Ok(AnalysisResult {
            outcome,
            scores,
            health,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, GraphStore, MemoryGraph};
    use crate::models::RequirementEntity;
    use chrono::{TimeZone, Utc};

    fn ts() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_full_pass_over_troubled_graph() {
        let mut graph = MemoryGraph::new();
        for id in ["a", "b", "c"] {
            graph
                .upsert_node_at(
                    RequirementEntity::new(
                        id,
                        format!("Requirement number {id}"),
                        format!("A full description of requirement {id}"),
                    ),
                    ts(),
                )
                .unwrap();
        }
        graph.upsert_edge("a", "b", EdgeKind::DependsOn).unwrap();
        graph.upsert_edge("b", "c", EdgeKind::DependsOn).unwrap();
        graph.upsert_edge("c", "a", EdgeKind::DependsOn).unwrap();
        let snapshot = graph.snapshot(ts());

        let analyzer = Analyzer::new(EngineConfig::default());
        let result = analyzer.run(&snapshot, &BTreeMap::new(), &FrictionLog::default()).unwrap();

        // The cycle charges all three members.
        assert!(!result.outcome.violations.is_empty());
        for id in ["a", "b", "c"] {
            assert!(result.scores[id].stable.current() < 100);
        }
        assert_eq!(result.report.summary.requirement_count, 3);
        assert_eq!(result.report.summary.generated_at, ts());
    }

    struct ConstantProvider;

    impl crate::embedding::EmbeddingProvider for ConstantProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, crate::error::DetectorError> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct BrokenProvider;

    impl crate::embedding::EmbeddingProvider for BrokenProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, crate::error::DetectorError> {
            Err(crate::error::DetectorError::Failed {
                detector: "embedding",
                reason: "service unreachable".to_string(),
            })
        }
    }

    fn twin_snapshot() -> GraphSnapshot {
        let mut graph = MemoryGraph::new();
        for id in ["a", "b"] {
            graph
                .upsert_node_at(
                    RequirementEntity::new(id, "User login page", "Allow users to log in quickly"),
                    ts(),
                )
                .unwrap();
        }
        graph.snapshot(ts())
    }

    #[test]
    fn test_embedder_fills_missing_vectors() {
        let snapshot = twin_snapshot();

        // Identical vectors from the provider put both requirements in
        // one duplicate group at full coverage.
        let analyzer = Analyzer::new(EngineConfig::default()).with_embedder(Box::new(ConstantProvider));
        let result = analyzer.run(&snapshot, &BTreeMap::new(), &FrictionLog::default()).unwrap();
        assert!(result
            .outcome
            .violations
            .iter()
            .any(|v| v.code == crate::taxonomy::ViolationCode::DUPLICATE_REQUIREMENT));
        assert_eq!(
            result.health.domain_confidence[&crate::taxonomy::Domain::Semantic],
            1.0
        );
    }

    #[test]
    fn test_failing_embedder_degrades_to_lexical() {
        let snapshot = twin_snapshot();

        let analyzer = Analyzer::new(EngineConfig::default()).with_embedder(Box::new(BrokenProvider));
        let result = analyzer.run(&snapshot, &BTreeMap::new(), &FrictionLog::default()).unwrap();

        // Identical text still clusters lexically, at reduced confidence.
        assert!(result
            .outcome
            .violations
            .iter()
            .any(|v| v.code == crate::taxonomy::ViolationCode::DUPLICATE_REQUIREMENT));
        let confidence = result.health.domain_confidence[&crate::taxonomy::Domain::Semantic];
        assert!(confidence < 1.0);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let mut graph = MemoryGraph::new();
        graph
            .upsert_node_at(
                RequirementEntity::new("a", "Single requirement", "Completely on its own"),
                ts(),
            )
            .unwrap();
        let snapshot = graph.snapshot(ts());

        let analyzer = Analyzer::new(EngineConfig::default());
        let first = analyzer.run(&snapshot, &BTreeMap::new(), &FrictionLog::default()).unwrap();
        let second = analyzer.run(&snapshot, &BTreeMap::new(), &FrictionLog::default()).unwrap();

        assert_eq!(
            serde_json::to_string(&first.report).unwrap(),
            serde_json::to_string(&second.report).unwrap()
        );
    }
}
