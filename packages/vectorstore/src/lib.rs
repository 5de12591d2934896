#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The Vector Store Adapter.
//!
//! One vector per `(user_id, paper_id)` — the stored text is whichever
//! summary the Selection Policy (`paperwright_summaries::selection`)
//! currently prefers for that pair. Two backends implement [`VectorStore`]:
//! [`embedded::EmbeddedStore`] (an on-disk, single-process index) and
//! [`cloud::CloudStore`] (a managed vector-search service reached over
//! HTTP). Callers never see the backend directly — they hold a single
//! `Box<dyn VectorStore>` and a stable `user_{id}_paper_{id}` id
//! convention that lets either backend upsert by id rather than by
//! similarity lookup.

pub mod cloud;
pub mod embedded;
pub mod embedder;
pub mod filter;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub use filter::{Conjunction, Filter};

/// Errors the vector store adapter can report.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Local (embedded-backend) I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure for the on-disk index.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// HTTP transport failure talking to the cloud backend.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Cloud backend returned a non-2xx response.
    #[error("cloud vector store returned {status}: {message}")]
    CloudStatus {
        /// HTTP status code.
        status: u16,
        /// Response body or description.
        message: String,
    },

    /// Required metadata field missing from an `add` call.
    #[error("missing required metadata field: {0}")]
    MissingMetadata(&'static str),
}

/// Which summary table produced the vectorised text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SummaryKind {
    /// Vectorised text came from a `DefaultSummary`.
    Default,
    /// Vectorised text came from a `CustomSummary`.
    Custom,
}

/// Metadata persisted alongside a vector.
#[derive(Debug, Clone)]
pub struct VectorMetadata {
    /// Owning user.
    pub user_id: i64,
    /// The paper this vector represents.
    pub paper_id: i64,
    /// Which summary table the vectorised text came from.
    pub summary_type: SummaryKind,
    /// Id of the `DefaultSummary` row, if `summary_type == Default`.
    pub default_summary_id: Option<i64>,
    /// Id of the `CustomSummary` row, if `summary_type == Custom`.
    pub custom_summary_id: Option<i64>,
    /// Provider that produced the vectorised summary.
    pub llm_provider: String,
    /// Model that produced the vectorised summary.
    pub llm_model: String,
    /// Level/category tags the link currently carries, so tag-filtered
    /// corpus search can restrict to a subset without
    /// a join back to the relational store.
    pub tags: Vec<String>,
}

impl VectorMetadata {
    /// The literal id convention for the embedded backend.
    #[must_use]
    pub fn stable_id(&self) -> String {
        stable_id(self.user_id, self.paper_id)
    }

    /// Turns this metadata into the flat key=value pairs [`Filter`]
    /// conjunctions are built from.
    #[must_use]
    pub fn as_pairs(&self) -> Vec<(String, filter::Value)> {
        let mut pairs = vec![
            ("user_id".to_string(), filter::Value::Int(self.user_id)),
            ("paper_id".to_string(), filter::Value::Int(self.paper_id)),
            ("summary_type".to_string(), filter::Value::Str(self.summary_type.to_string())),
            ("llm_provider".to_string(), filter::Value::Str(self.llm_provider.clone())),
            ("llm_model".to_string(), filter::Value::Str(self.llm_model.clone())),
        ];
        if let Some(id) = self.default_summary_id {
            pairs.push(("default_summary_id".to_string(), filter::Value::Int(id)));
        }
        if let Some(id) = self.custom_summary_id {
            pairs.push(("custom_summary_id".to_string(), filter::Value::Int(id)));
        }
        pairs
    }
}

/// The `user_{user_id}_paper_{paper_id}` id convention.
#[must_use]
pub fn stable_id(user_id: i64, paper_id: i64) -> String {
    format!("user_{user_id}_paper_{paper_id}")
}

/// A similarity-search hit: the vectorised document text and its score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The stored id (`stable_id` convention).
    pub id: String,
    /// The vectorised text (the preferred summary body at write time).
    pub document: String,
    /// Similarity score — higher is more similar.
    pub score: f32,
    /// The metadata that was stored alongside the vector.
    pub metadata: VectorMetadata,
}

/// Backend-agnostic vector store operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upserts a vector for `(metadata.user_id, metadata.paper_id)`. If
    /// `id` is `None`, the backend's stable id convention is used.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] on backend failure.
    async fn add(
        &self,
        id: Option<String>,
        text: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<String, VectorStoreError>;

    /// Deletes every vector whose metadata matches the filter's
    /// conjunction-of-conjunctions.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] on backend failure.
    async fn delete_by_filter(&self, filter: &Filter) -> Result<u64, VectorStoreError>;

    /// Top-`k` similarity search, optionally restricted by `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] on backend failure.
    async fn search_by_vector(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchHit>, VectorStoreError>;

    /// Fetches raw vectors for the given `(user_id, paper_id)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] on backend failure.
    async fn get_embeddings(
        &self,
        conditions: &[(i64, i64)],
    ) -> Result<HashMap<(i64, i64), Vec<f32>>, VectorStoreError>;

    /// One query reporting vector presence for every `(user_id, paper_id)`
    /// pair.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] on backend failure.
    async fn batch_exists(&self, user_id: i64, paper_ids: &[i64]) -> Result<HashMap<i64, bool>, VectorStoreError>;
}

/// Writes are batched at this chunk size regardless of backend.
pub const BATCH_SIZE: usize = 100;

/// Cosine similarity between two equal-length vectors. Returns `0.0` for
/// a zero-magnitude vector rather than dividing by zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 { 0.0 } else { dot / (mag_a * mag_b) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn stable_id_matches_convention() {
        assert_eq!(stable_id(7, 42), "user_7_paper_42");
    }
}
