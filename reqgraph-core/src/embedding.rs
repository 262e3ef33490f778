//! Text similarity used by duplicate detection.
//!
//! Similarity is cosine over embedding vectors when both requirements
//! carry one; otherwise a lexical token-set cosine over title and
//! description stands in. The embedding service itself lives behind a
//! trait so the engine keeps working (in degraded mode) when none is
//! wired up.

use std::collections::BTreeSet;

use crate::error::DetectorError;

/// Source of embedding vectors for free text. Implementations may call
/// an external service; the engine only requires determinism for a
/// given input.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, DetectorError>;
}

/// Cosine similarity of two vectors. Zero for mismatched lengths or a
/// zero-norm operand rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Token-set cosine: |A ∩ B| / sqrt(|A| * |B|). Case-insensitive and
/// insensitive to word order and repetition.
pub fn lexical_similarity(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let shared = tokens_a.intersection(&tokens_b).count() as f64;
    shared / ((tokens_a.len() as f64) * (tokens_b.len() as f64)).sqrt()
}

/// Lexical fallback over both text fields. Description dominates since
/// titles are short and formulaic.
pub fn combined_text_similarity(
    title_a: &str,
    description_a: &str,
    title_b: &str,
    description_b: &str,
) -> f64 {
    0.4 * lexical_similarity(title_a, title_b)
        + 0.6 * lexical_similarity(description_a, description_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.3, 0.5, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_lexical_similarity_ignores_case_and_order() {
        let a = lexical_similarity("Fast login flow", "login flow FAST");
        assert!((a - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_lexical_similarity_disjoint_text() {
        assert_eq!(lexical_similarity("alpha beta", "gamma delta"), 0.0);
        assert_eq!(lexical_similarity("", "anything"), 0.0);
    }

    struct HashingProvider;

    impl EmbeddingProvider for HashingProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>, DetectorError> {
            // Toy deterministic embedding: token counts in 4 buckets.
            let mut buckets = vec![0.0f32; 4];
            for token in text.split_whitespace() {
                let bucket = token.len() % 4;
                buckets[bucket] += 1.0;
            }
            Ok(buckets)
        }
    }

    #[test]
    fn test_provider_is_deterministic() {
        let provider = HashingProvider;
        let a = provider.embed("fast login flow").unwrap();
        let b = provider.embed("fast login flow").unwrap();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_combined_weighting() {
        // Identical descriptions, disjoint titles: 0.6 from description.
        let s = combined_text_similarity("alpha", "shared words here", "beta", "shared words here");
        assert!((s - 0.6).abs() < 1e-9);
    }
}
