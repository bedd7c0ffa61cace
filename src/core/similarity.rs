use thiserror::Error;

use crate::models::FeatureVector;

/// Similarity a candidate must strictly exceed to be matched
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Reasons two vectors cannot be compared
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimilarityError {
    #[error("vector lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("vector has zero magnitude")]
    ZeroMagnitude,
}

/// Cosine similarity of two feature vectors
///
/// Fails instead of guessing when the vectors have different lengths or
/// either one has zero magnitude.
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (&x, &y) in a.as_slice().iter().zip(b.as_slice()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return Err(SimilarityError::ZeroMagnitude);
    }

    // Rounding can push identical vectors a hair past 1.0
    Ok((dot / denom).clamp(-1.0, 1.0))
}

#[inline]
pub fn is_match_worthy(similarity: f64) -> bool {
    similarity > MATCH_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(values: &[f64]) -> FeatureVector {
        FeatureVector::new(values.to_vec())
    }

    #[test]
    fn test_identical_vectors() {
        let sim = cosine_similarity(&v(&[3.0, 1.0, 2.0]), &v(&[3.0, 1.0, 2.0])).unwrap();
        assert!((sim - 1.0).abs() < 1e-12);
        assert!(is_match_worthy(sim));
    }

    #[test]
    fn test_orthogonal_vectors() {
        let sim = cosine_similarity(&v(&[1.0, 0.0, 0.0]), &v(&[0.0, 1.0, 0.0])).unwrap();
        assert_eq!(sim, 0.0);
        assert!(!is_match_worthy(sim));
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!is_match_worthy(0.5));
        assert!(is_match_worthy(0.500_001));
    }

    #[test]
    fn test_length_mismatch() {
        let err = cosine_similarity(&v(&[1.0, 2.0]), &v(&[1.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(err, SimilarityError::LengthMismatch { left: 2, right: 3 });
    }

    #[test]
    fn test_zero_magnitude() {
        let err = cosine_similarity(&v(&[0.0, 0.0]), &v(&[1.0, 2.0])).unwrap_err();
        assert_eq!(err, SimilarityError::ZeroMagnitude);
    }

    proptest! {
        #[test]
        fn prop_similarity_is_symmetric(
            pairs in proptest::collection::vec((0.0f64..100.0, 0.0f64..100.0), 1..16)
        ) {
            let (a, b): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let (a, b) = (FeatureVector::new(a), FeatureVector::new(b));

            match (cosine_similarity(&a, &b), cosine_similarity(&b, &a)) {
                (Ok(ab), Ok(ba)) => {
                    prop_assert!((ab - ba).abs() < 1e-12);
                    prop_assert!((-1.0..=1.0).contains(&ab));
                }
                (Err(_), Err(_)) => {}
                _ => prop_assert!(false, "symmetry broken between ok and err"),
            }
        }
    }
}
