//! Embedding-based nearest-neighbor matching for reference images.
//!
//! Given a query embedding for a user-supplied image, the matcher ranks a
//! precomputed set of reference images by cosine similarity and returns
//! the top-k identifiers. It is the one piece of real computation behind
//! the moodboard flow; everything around it (rendering, vendor lookups,
//! placeholder fallback) lives with the caller.
//!
//! # Architecture
//! The store is a pure, read-only data structure after construction: no
//! query mutates state, so a built store can be shared freely across
//! threads. Ranking is an exhaustive O(N·D) scan, which is the right shape
//! for reference sets of this size.

mod extractor;
mod similarity;
mod store;
mod types;

// Re-export core types for public API
#[cfg(test)]
pub use extractor::MockFeatureExtractor;
pub use extractor::{ClipFeatureExtractor, FeatureExtractor};
pub use similarity::cosine_similarity;
pub use store::{EmbeddingStore, ScoredMatch};
pub use types::{EMBEDDING_DIMENSION_512, EmbeddingDimension, MatcherError, Score};
