//! The embedding function itself and the three similarity metrics (spec
//! §4.6, C7). No sentence-transformers-equivalent crate exists in this
//! workspace's dependency stack, so the "model" is a deterministic,
//! locally computed hashed bag-of-words embedding rather than a loaded
//! neural network — it satisfies the same contract (`embed`, fixed
//! dimension, `similarity`) the Search Engine depends on, without
//! fabricating an ML dependency (see DESIGN.md).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const EMBEDDING_DIMENSION: usize = 384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMetric {
    Cosine,
    Dot,
    Euclidean,
}

impl SimilarityMetric {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "cosine" => Some(Self::Cosine),
            "dot" => Some(Self::Dot),
            "euclidean" => Some(Self::Euclidean),
            _ => None,
        }
    }
}

/// Deterministic hashed bag-of-words embedding, L2-normalized.
pub fn encode(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0f32; dimension];
    for token in text.to_lowercase().split_whitespace() {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h as usize) % dimension;
        let sign = if h & 1 == 0 { 1.0 } else { -1.0 };
        vector[idx] += sign;
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    vector
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let denom = (a.iter().map(|x| x * x).sum::<f32>().sqrt()) * (b.iter().map(|x| x * x).sum::<f32>().sqrt());
    if denom == 0.0 {
        0.0
    } else {
        dot_product(a, b) / denom
    }
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

/// Computes similarity under `metric`. Cosine is rescaled from `[-1, 1]`
/// to `[0, 1]`; euclidean distance is mapped to `1 / (1 + d)`; dot is
/// returned raw (spec §4.6).
pub fn similarity(a: &[f32], b: &[f32], metric: SimilarityMetric) -> f64 {
    match metric {
        SimilarityMetric::Cosine => ((cosine(a, b) as f64) + 1.0) / 2.0,
        SimilarityMetric::Dot => dot_product(a, b) as f64,
        SimilarityMetric::Euclidean => 1.0 / (1.0 + euclidean(a, b) as f64),
    }
}
