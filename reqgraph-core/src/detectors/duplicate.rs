//! Duplicate requirement clustering.
//!
//! Pairs at or above the similarity threshold are unioned into clusters;
//! each cluster becomes one violation carrying all member ids. Cosine
//! over embeddings when both sides have one, lexical text similarity
//! otherwise. Missing embeddings lower the detector's confidence rather
//! than stopping the pass.

use crate::detectors::{Detector, DetectorReport};
use crate::embedding::{combined_text_similarity, cosine_similarity};
use crate::error::DetectorError;
use crate::graph::GraphSnapshot;
use crate::models::RequirementEntity;
use crate::taxonomy::{Domain, Violation, ViolationCode, ViolationDetails};

/// Index-based union-find with path compression and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }
}

pub struct DuplicateDetector {
    threshold: f64,
}

impl DuplicateDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn similarity(a: &RequirementEntity, b: &RequirementEntity) -> f64 {
        match (&a.embedding, &b.embedding) {
            (Some(va), Some(vb)) => cosine_similarity(va, vb),
            _ => combined_text_similarity(&a.title, &a.description, &b.title, &b.description),
        }
    }
}

impl Detector for DuplicateDetector {
    fn name(&self) -> &'static str {
        "duplicate"
    }

    fn domain(&self) -> Domain {
        Domain::Semantic
    }

    fn detect(&self, snapshot: &GraphSnapshot) -> Result<DetectorReport, DetectorError> {
        let entities: Vec<&RequirementEntity> = snapshot.active_entities().collect();
        let mut uf = UnionFind::new(entities.len());

        for i in 0..entities.len() {
            for j in (i + 1)..entities.len() {
                if Self::similarity(entities[i], entities[j]) >= self.threshold {
                    uf.union(i, j);
                }
            }
        }

        let mut clusters: std::collections::BTreeMap<usize, Vec<usize>> = Default::default();
        for i in 0..entities.len() {
            let root = uf.find(i);
            clusters.entry(root).or_default().push(i);
        }

        let mut violations = Vec::new();
        for members in clusters.into_values() {
            if members.len() < 2 {
                continue;
            }
            // Cluster similarity score is the weakest pairwise link, the
            // honest bound on how alike the whole cluster is.
            let mut min_similarity = 1.0f64;
            for (i, a) in members.iter().enumerate() {
                for b in members.iter().skip(i + 1) {
                    let s = Self::similarity(entities[*a], entities[*b]);
                    if s < min_similarity {
                        min_similarity = s;
                    }
                }
            }
            let mut ids: Vec<String> = members.iter().map(|i| entities[*i].id.clone()).collect();
            ids.sort();
            violations.push(Violation::new(
                ViolationCode::DUPLICATE_REQUIREMENT,
                ids.clone(),
                format!("{} requirements look like duplicates: {}", ids.len(), ids.join(", ")),
                ViolationDetails::Duplicate {
                    member_ids: ids,
                    similarity_score: min_similarity,
                },
            ));
        }

        // Confidence reflects embedding coverage: full coverage is 1.0,
        // the lexical fallback counts for half.
        let with_embedding = entities.iter().filter(|e| e.embedding.is_some()).count();
        let confidence = if entities.is_empty() {
            1.0
        } else {
            let coverage = with_embedding as f64 / entities.len() as f64;
            if coverage >= 1.0 { 1.0 } else { 0.5 + coverage / 2.0 }
        };

        Ok(DetectorReport {
            violations,
            confidence,
        })
    }
}
