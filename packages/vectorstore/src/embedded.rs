//! The embedded, single-process vector store backend — a flat on-disk
//! index written as JSON and loaded into memory on open. Trades recall
//! and scale for zero external dependencies; the single-vector-per-paper
//! policy keeps the flat-scan search cheap enough in practice for a
//! single tenant's corpus.
//!
//! A `RwLock`-guarded in-memory index backed by whole-file JSON
//! persistence, same split a local-disk cache reaches for when it wants
//! concurrent readers without a real embedded database.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::filter::Value;
use crate::{Filter, SearchHit, SummaryKind, VectorMetadata, VectorStore, VectorStoreError, cosine_similarity};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    document: String,
    embedding: Vec<f32>,
    user_id: i64,
    paper_id: i64,
    summary_type: String,
    default_summary_id: Option<i64>,
    custom_summary_id: Option<i64>,
    llm_provider: String,
    llm_model: String,
    tags: Vec<String>,
}

impl StoredRecord {
    fn metadata_pairs(&self) -> Vec<(String, Value)> {
        let mut pairs = vec![
            ("user_id".to_string(), Value::Int(self.user_id)),
            ("paper_id".to_string(), Value::Int(self.paper_id)),
            ("summary_type".to_string(), Value::Str(self.summary_type.clone())),
            ("llm_provider".to_string(), Value::Str(self.llm_provider.clone())),
            ("llm_model".to_string(), Value::Str(self.llm_model.clone())),
        ];
        if let Some(id) = self.default_summary_id {
            pairs.push(("default_summary_id".to_string(), Value::Int(id)));
        }
        if let Some(id) = self.custom_summary_id {
            pairs.push(("custom_summary_id".to_string(), Value::Int(id)));
        }
        for tag in &self.tags {
            pairs.push(("tag".to_string(), Value::Str(tag.clone())));
        }
        pairs
    }

    fn to_metadata(&self) -> VectorMetadata {
        VectorMetadata {
            user_id: self.user_id,
            paper_id: self.paper_id,
            summary_type: if self.summary_type == "custom" { SummaryKind::Custom } else { SummaryKind::Default },
            default_summary_id: self.default_summary_id,
            custom_summary_id: self.custom_summary_id,
            llm_provider: self.llm_provider.clone(),
            llm_model: self.llm_model.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// On-disk embedded vector store. `(user_id, paper_id)` is the key; a
/// second `add` for the same pair overwrites in place.
pub struct EmbeddedStore {
    path: PathBuf,
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl EmbeddedStore {
    /// Opens (or creates) an embedded store backed by a single JSON file
    /// at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] if an existing file cannot be read or
    /// parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VectorStoreError> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// An in-memory store that is never persisted to disk (used by tests
    /// and by the recommender/RAG's unit tests).
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            records: RwLock::new(HashMap::new()),
        }
    }

    fn persist(&self) -> Result<(), VectorStoreError> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        let records = self.records.read().expect("lock poisoned");
        let json = serde_json::to_string(&*records)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for EmbeddedStore {
    async fn add(
        &self,
        id: Option<String>,
        text: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<String, VectorStoreError> {
        let id = id.unwrap_or_else(|| metadata.stable_id());
        let record = StoredRecord {
            id: id.clone(),
            document: text.to_string(),
            embedding,
            user_id: metadata.user_id,
            paper_id: metadata.paper_id,
            summary_type: metadata.summary_type.to_string(),
            default_summary_id: metadata.default_summary_id,
            custom_summary_id: metadata.custom_summary_id,
            llm_provider: metadata.llm_provider,
            llm_model: metadata.llm_model,
            tags: metadata.tags,
        };
        {
            let mut records = self.records.write().expect("lock poisoned");
            records.insert(id.clone(), record);
        }
        self.persist()?;
        Ok(id)
    }

    async fn delete_by_filter(&self, filter: &Filter) -> Result<u64, VectorStoreError> {
        let removed = {
            let mut records = self.records.write().expect("lock poisoned");
            let before = records.len();
            records.retain(|_, r| !filter.matches(&r.metadata_pairs()));
            before - records.len()
        };
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed as u64)
    }

    async fn search_by_vector(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let records = self.records.read().expect("lock poisoned");
        let mut scored: Vec<SearchHit> = records
            .values()
            .filter(|r| filter.is_none_or(|f| f.matches(&r.metadata_pairs())))
            .map(|r| SearchHit {
                id: r.id.clone(),
                document: r.document.clone(),
                score: cosine_similarity(query_embedding, &r.embedding),
                metadata: r.to_metadata(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn get_embeddings(
        &self,
        conditions: &[(i64, i64)],
    ) -> Result<HashMap<(i64, i64), Vec<f32>>, VectorStoreError> {
        let records = self.records.read().expect("lock poisoned");
        Ok(conditions
            .iter()
            .filter_map(|&(user_id, paper_id)| {
                records
                    .get(&crate::stable_id(user_id, paper_id))
                    .map(|r| ((user_id, paper_id), r.embedding.clone()))
            })
            .collect())
    }

    async fn batch_exists(&self, user_id: i64, paper_ids: &[i64]) -> Result<HashMap<i64, bool>, VectorStoreError> {
        let records = self.records.read().expect("lock poisoned");
        Ok(paper_ids
            .iter()
            .map(|&paper_id| (paper_id, records.contains_key(&crate::stable_id(user_id, paper_id))))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Conjunction;

    fn metadata(user_id: i64, paper_id: i64) -> VectorMetadata {
        VectorMetadata {
            user_id,
            paper_id,
            summary_type: SummaryKind::Default,
            default_summary_id: Some(1),
            custom_summary_id: None,
            llm_provider: "anthropic".to_string(),
            llm_model: "claude".to_string(),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn add_is_upsert_by_user_paper() {
        let store = EmbeddedStore::in_memory();
        store.add(None, "first", vec![1.0, 0.0], metadata(1, 1)).await.unwrap();
        store.add(None, "second", vec![0.0, 1.0], metadata(1, 1)).await.unwrap();

        let exists = store.batch_exists(1, &[1]).await.unwrap();
        assert_eq!(exists.get(&1), Some(&true));

        let hits = store.search_by_vector(&[0.0, 1.0], 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document, "second");
    }

    #[tokio::test]
    async fn delete_by_filter_removes_matching_vectors() {
        let store = EmbeddedStore::in_memory();
        store.add(None, "a", vec![1.0], metadata(1, 1)).await.unwrap();
        store.add(None, "b", vec![1.0], metadata(2, 2)).await.unwrap();

        let filter = Filter::single(Conjunction::for_user_paper(1, 1));
        let removed = store.delete_by_filter(&filter).await.unwrap();
        assert_eq!(removed, 1);

        let exists = store.batch_exists(2, &[2]).await.unwrap();
        assert_eq!(exists.get(&2), Some(&true));
        let exists = store.batch_exists(1, &[1]).await.unwrap();
        assert_eq!(exists.get(&1), Some(&false));
    }

    #[tokio::test]
    async fn search_respects_disjunctive_filter() {
        let store = EmbeddedStore::in_memory();
        store.add(None, "mine", vec![1.0, 0.0], metadata(1, 1)).await.unwrap();
        store.add(None, "other", vec![1.0, 0.0], metadata(2, 2)).await.unwrap();

        let filter = Filter::single(Conjunction::for_user_paper(1, 1));
        let hits = store.search_by_vector(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document, "mine");
    }
}
