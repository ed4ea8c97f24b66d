//! Immutable in-memory store of reference embeddings with similarity queries.
//!
//! The store owns the full reference set as two parallel sequences
//! (identifiers and embeddings) loaded once at construction. Queries are
//! pure reads: the store never mutates after it is built, so it is safe to
//! share behind an `Arc` and query from any number of threads without
//! locking. Reloading a dataset means constructing a new store and swapping
//! the `Arc`, never mutating an existing instance in place.

use crate::dataset::{self, DatasetSource};
use crate::matcher::similarity::cosine_similarity;
use crate::matcher::types::{EmbeddingDimension, MatcherError, Score};

/// One ranked query result: a reference identifier with its similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    /// Identifier naming the reference image, as stored in the dataset.
    pub identifier: String,
    /// Cosine similarity between the query and this reference.
    pub score: Score,
}

/// Immutable collection of (identifier, embedding) reference entries.
///
/// All embeddings in a store share one dimension, inferred from the first
/// entry at construction. A store may be empty: that is the documented
/// degraded mode when the dataset source is missing or unreadable, and
/// every query against an empty store returns an empty result rather than
/// an error so callers can fall back to placeholder content uniformly.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingStore {
    /// Reference identifiers in load order.
    identifiers: Vec<String>,

    /// Reference embeddings, parallel to `identifiers`.
    embeddings: Vec<Vec<f32>>,

    /// Shared dimension of all embeddings; `None` only when the store is empty.
    dimension: Option<EmbeddingDimension>,
}

impl EmbeddingStore {
    /// Creates an explicit zero-entry store.
    ///
    /// Queries against it succeed with empty results. This is the degraded
    /// mode used when no dataset is available.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            identifiers: Vec::new(),
            embeddings: Vec::new(),
            dimension: None,
        }
    }

    /// Builds a store from parallel identifier and embedding sequences.
    ///
    /// The dimension is inferred from the first embedding. Load order is
    /// preserved and serves as the deterministic tie-break during ranking.
    ///
    /// # Errors
    /// - `EntryCountMismatch` when the sequences differ in length
    /// - `InconsistentDimension` when any embedding disagrees with the first
    /// - `InvalidDimension` when the first embedding is zero-length
    pub fn from_entries(
        identifiers: Vec<String>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, MatcherError> {
        if identifiers.len() != embeddings.len() {
            return Err(MatcherError::EntryCountMismatch {
                identifiers: identifiers.len(),
                embeddings: embeddings.len(),
            });
        }

        if embeddings.is_empty() {
            return Ok(Self::empty());
        }

        let dimension = EmbeddingDimension::new(embeddings[0].len())?;
        for (index, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension.get() {
                return Err(MatcherError::InconsistentDimension {
                    index,
                    expected: dimension.get(),
                    actual: embedding.len(),
                });
            }
        }

        Ok(Self {
            identifiers,
            embeddings,
            dimension: Some(dimension),
        })
    }

    /// Loads a store from the persisted dataset pair.
    ///
    /// A missing, unreadable, or structurally malformed source is not an
    /// error: it yields an empty store (logged at `warn`), preserving the
    /// fallback contract of the surrounding system. Integrity violations
    /// between otherwise well-formed sequences still fail, because serving
    /// results from a half-consistent dataset would be worse than serving
    /// none.
    pub fn load(source: &DatasetSource) -> Result<Self, MatcherError> {
        match dataset::read_reference_set(source) {
            Ok((identifiers, embeddings)) => Self::from_entries(identifiers, embeddings),
            Err(err) => {
                tracing::warn!(
                    "Reference dataset unavailable ({}), starting with an empty store",
                    err
                );
                Ok(Self::empty())
            }
        }
    }

    /// Returns the `k` reference identifiers most similar to `query`,
    /// ranked by descending cosine similarity.
    ///
    /// Entries with equal similarity keep their load order, which makes the
    /// ranking fully deterministic: an all-zero query (similarity 0.0 to
    /// everything by the zero-magnitude rule) returns the first
    /// `min(k, N)` identifiers in load order.
    ///
    /// # Errors
    /// - `InvalidLimit` when `k == 0`
    /// - `DimensionMismatch` when `query` disagrees with a non-empty
    ///   store's dimension (an empty store returns `Ok(vec![])`
    ///   unconditionally; it has no dimension to check against)
    pub fn nearest_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<String>, MatcherError> {
        Ok(self
            .nearest_neighbors_with_scores(query, k)?
            .into_iter()
            .map(|m| m.identifier)
            .collect())
    }

    /// Like [`nearest_neighbors`](Self::nearest_neighbors), but keeps the
    /// similarity score attached to each identifier.
    pub fn nearest_neighbors_with_scores(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredMatch>, MatcherError> {
        if k == 0 {
            return Err(MatcherError::InvalidLimit);
        }

        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        dimension.validate_vector(query)?;

        let mut ranked: Vec<(usize, Score)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(index, embedding)| (index, Score::clamped(cosine_similarity(query, embedding))))
            .collect();

        // Stable sort: equal scores keep load order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(index, score)| ScoredMatch {
                identifier: self.identifiers[index].clone(),
                score,
            })
            .collect())
    }

    /// Returns the number of reference entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Returns true when the store holds no reference entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Returns the shared embedding dimension, or `None` for an empty store.
    #[must_use]
    pub fn dimension(&self) -> Option<EmbeddingDimension> {
        self.dimension
    }

    /// Returns the reference identifiers in load order.
    #[must_use]
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }
}
