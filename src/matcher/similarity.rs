//! Cosine similarity kernel for embedding comparison.
//!
//! The matcher ranks references with plain cosine similarity over an
//! exhaustive scan. Reference sets are small enough that an approximate
//! index would add complexity without a measurable win, so the kernel is
//! the whole story: one dot product and two norms per comparison.

/// Calculates cosine similarity between two vectors.
///
/// Returns a value in [-1.0, 1.0] where 1.0 means identical direction.
/// When either vector has zero magnitude the similarity is defined as 0.0
/// to avoid division by zero; an all-zero query therefore ties every
/// reference at 0.0.
///
/// The result is clamped so accumulated floating-point error cannot push
/// it outside the score range.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}
