//! moodmatch: embedding-based visual similarity matching for moodboard
//! suggestions.
//!
//! The crate turns a directory of reference images into a persisted
//! dataset ([`ingest`]), loads that dataset into an immutable
//! [`matcher::EmbeddingStore`], and answers "which references look most
//! like this query embedding?" with a deterministic cosine-similarity
//! ranking. A missing dataset degrades to an empty store whose queries
//! return empty results, so callers can fall back to placeholder content
//! without special-casing failure.
//!
//! ```no_run
//! use moodmatch::{EmbeddingStore, Settings};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! let store = EmbeddingStore::load(&settings.dataset.source())?;
//!
//! // The query embedding comes from the host's feature extractor.
//! let query = vec![0.0; settings.matcher.dimension];
//! let matches = store.nearest_neighbors(&query, settings.matcher.default_limit)?;
//! assert!(matches.len() <= settings.matcher.default_limit);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dataset;
pub mod ingest;
pub mod matcher;

// Explicit exports for better API clarity
pub use config::Settings;
pub use dataset::{DatasetError, DatasetSource};
pub use ingest::{IngestReport, build_reference_set};
pub use matcher::{
    ClipFeatureExtractor, EMBEDDING_DIMENSION_512, EmbeddingDimension, EmbeddingStore,
    FeatureExtractor, MatcherError, Score, ScoredMatch, cosine_similarity,
};
