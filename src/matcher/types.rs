//! Type-safe wrappers and core types for the embedding matcher.
//!
//! This module provides newtypes and the error taxonomy for the matcher.
//! All types implement the traits needed for ergonomic usage while
//! preventing primitive obsession around dimensions and scores.

use thiserror::Error;

/// Standard embedding dimension for reference images (CLIP ViT-B/32 model).
pub const EMBEDDING_DIMENSION_512: usize = 512;

/// Type-safe wrapper for embedding dimensions.
///
/// A store infers its dimension from the first loaded entry and uses this
/// type to validate every vector that crosses its boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingDimension(usize);

impl EmbeddingDimension {
    /// Creates a new `EmbeddingDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, MatcherError> {
        if dim == 0 {
            return Err(MatcherError::InvalidDimension {
                dimension: 0,
                reason: "Embedding dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Creates the standard 512-dimensional embedding dimension.
    #[must_use]
    pub const fn dimension_512() -> Self {
        Self(EMBEDDING_DIMENSION_512)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), MatcherError> {
        if vector.len() != self.0 {
            return Err(MatcherError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for EmbeddingDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe wrapper for cosine similarity scores.
///
/// Scores lie in the range [-1.0, 1.0] where:
/// - 1.0 indicates identical direction
/// - 0.0 indicates orthogonal vectors (or a zero-magnitude operand)
/// - -1.0 indicates opposite direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score(f32);

impl Score {
    /// Creates a new `Score` with validation.
    ///
    /// Returns an error if the score is outside [-1.0, 1.0] or is NaN.
    pub fn new(value: f32) -> Result<Self, MatcherError> {
        if value.is_nan() {
            return Err(MatcherError::InvalidScore {
                value,
                reason: "Score cannot be NaN",
            });
        }
        if !(-1.0..=1.0).contains(&value) {
            return Err(MatcherError::InvalidScore {
                value,
                reason: "Score must be in range [-1.0, 1.0]",
            });
        }
        Ok(Self(value))
    }

    /// Creates a score from a raw similarity, clamping into [-1.0, 1.0].
    ///
    /// Non-finite input collapses to zero, so a pathological query cannot
    /// poison the ranking order.
    #[must_use]
    pub fn clamped(value: f32) -> Self {
        if value.is_finite() {
            Self(value.clamp(-1.0, 1.0))
        } else {
            Self(0.0)
        }
    }

    /// Creates a score of 0.0 (orthogonal / zero-magnitude).
    #[must_use]
    pub const fn zero() -> Self {
        Self(0.0)
    }

    /// Creates a score of 1.0 (identical direction).
    #[must_use]
    pub const fn one() -> Self {
        Self(1.0)
    }

    /// Returns the underlying f32 value.
    #[must_use]
    pub fn get(&self) -> f32 {
        self.0
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .partial_cmp(&other.0)
            .expect("Score values should never be NaN")
    }
}

/// Errors that can occur during matcher operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum MatcherError {
    #[error(
        "Reference entry count mismatch: {identifiers} identifiers but {embeddings} embeddings\nSuggestion: Rebuild the dataset so both sequences describe the same entries"
    )]
    EntryCountMismatch {
        identifiers: usize,
        embeddings: usize,
    },

    #[error(
        "Inconsistent embedding dimension at entry {index}: expected {expected}, got {actual}\nSuggestion: Re-extract features with a single model so every reference shares one dimension"
    )]
    InconsistentDimension {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Query dimension mismatch: expected {expected}, got {actual}\nSuggestion: Produce the query embedding with the same feature extractor that built the reference set"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid result limit: k must be at least 1")]
    InvalidLimit,

    #[error("Invalid embedding dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error("Invalid similarity score: {value}\nReason: {reason}")]
    InvalidScore { value: f32, reason: &'static str },

    #[error(
        "Feature extraction failed: {0}\nSuggestion: Verify the embedding model is properly initialized"
    )]
    ExtractionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_dimension() {
        let dim = EmbeddingDimension::new(512).unwrap();
        assert_eq!(dim.get(), 512);

        let standard = EmbeddingDimension::dimension_512();
        assert_eq!(standard.get(), EMBEDDING_DIMENSION_512);

        // Invalid dimension
        assert!(EmbeddingDimension::new(0).is_err());

        // Validation
        let vec = vec![0.1; 512];
        assert!(dim.validate_vector(&vec).is_ok());

        let wrong_vec = vec![0.1; 100];
        assert!(dim.validate_vector(&wrong_vec).is_err());
    }

    #[test]
    fn test_score_validation() {
        // Valid scores
        let score = Score::new(0.5).unwrap();
        assert_eq!(score.get(), 0.5);

        let negative = Score::new(-0.75).unwrap();
        assert_eq!(negative.get(), -0.75);

        let zero = Score::zero();
        assert_eq!(zero.get(), 0.0);

        let one = Score::one();
        assert_eq!(one.get(), 1.0);

        // Invalid scores
        assert!(Score::new(-1.1).is_err());
        assert!(Score::new(1.1).is_err());
        assert!(Score::new(f32::NAN).is_err());
    }

    #[test]
    fn test_score_clamping() {
        // Float error just past the boundary clamps instead of failing
        assert_eq!(Score::clamped(1.000_001).get(), 1.0);
        assert_eq!(Score::clamped(-1.000_001).get(), -1.0);
        assert_eq!(Score::clamped(0.3).get(), 0.3);

        // Non-finite input collapses to zero
        assert_eq!(Score::clamped(f32::NAN).get(), 0.0);
        assert_eq!(Score::clamped(f32::INFINITY).get(), 0.0);
    }

    #[test]
    fn test_score_ordering() {
        let low = Score::new(-0.5).unwrap();
        let mid = Score::zero();
        let high = Score::new(0.9).unwrap();

        assert!(low < mid);
        assert!(mid < high);
        assert_eq!(high.max(low), high);
    }

    #[test]
    fn test_dimension_mismatch_reports_both_sides() {
        let dim = EmbeddingDimension::new(4).unwrap();
        match dim.validate_vector(&[0.0; 7]) {
            Err(MatcherError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 7);
            }
            other => panic!("Expected DimensionMismatch, got {other:?}"),
        }
    }
}
