// Path: crates/index/src/metric.rs

use serde::{Deserialize, Serialize};

/// A dense float vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector(pub Vec<f32>);

impl Vector {
    /// Dimension of the vector.
    pub fn dim(&self) -> usize {
        self.0.len()
    }
}

/// Cosine similarity in [(-1), 1]; 1.0 is identical direction.
///
/// Zero-norm vectors (which a well-behaved embedding model never produces)
/// score 0.0 against everything rather than poisoning the ranking.
pub fn cosine_similarity(a: &Vector, b: &Vector) -> f32 {
    let dot: f32 = a.0.iter().zip(b.0.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.0.iter().map(|x| x.powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.0.iter().map(|x| x.powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_direction_scores_one() {
        let a = Vector(vec![1.0, 2.0, 3.0]);
        let b = Vector(vec![2.0, 4.0, 6.0]);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_scores_zero() {
        let a = Vector(vec![1.0, 0.0]);
        let b = Vector(vec![0.0, 1.0]);
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn zero_norm_is_harmless() {
        let a = Vector(vec![0.0, 0.0]);
        let b = Vector(vec![1.0, 1.0]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
