//! The managed cloud vector-search backend, reached over a small JSON/HTTP
//! API (the shape a hosted vector-search service — Pinecone, managed
//! pgvector, etc. — exposes). Metadata filters are translated to the
//! nested `$and`/`$or` predicate form those services use.
//!
//! Built on the same `reqwest::Client` + bearer-auth + typed
//! request/response struct pattern the LLM providers use, pointed at a
//! vector-search endpoint instead of a chat completion one.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::filter::Value;
use crate::{Filter, SearchHit, SummaryKind, VectorMetadata, VectorStore, VectorStoreError};

/// Cloud vector-search backend client.
pub struct CloudStore {
    base_url: String,
    api_key: String,
    index: String,
    client: reqwest::Client,
}

impl CloudStore {
    /// Builds a client against a managed vector-search endpoint.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            index: index.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Builds a client from `PAPERWRIGHT_VECTORSTORE_URL` /
    /// `PAPERWRIGHT_VECTORSTORE_API_KEY` / `PAPERWRIGHT_VECTORSTORE_INDEX`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] if required environment variables are
    /// unset.
    pub fn from_env() -> Result<Self, VectorStoreError> {
        let base_url = require_env("PAPERWRIGHT_VECTORSTORE_URL")?;
        let api_key = require_env("PAPERWRIGHT_VECTORSTORE_API_KEY")?;
        let index = std::env::var("PAPERWRIGHT_VECTORSTORE_INDEX").unwrap_or_else(|_| "paperwright".to_string());
        Ok(Self::new(base_url, api_key, index))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn send(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value, VectorStoreError> {
        let resp = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(VectorStoreError::CloudStatus {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }
}

/// Translates a [`Filter`] (disjunction of conjunctions of equality
/// clauses) into the `$or`/`$and`/`$eq` predicate shape a managed vector
/// service expects.
fn filter_to_json(filter: &Filter) -> serde_json::Value {
    let ors: Vec<serde_json::Value> = filter
        .conjunctions()
        .iter()
        .map(|conjunction| {
            let ands: Vec<serde_json::Value> = conjunction
                .clauses
                .iter()
                .map(|clause| {
                    let value = match &clause.value {
                        Value::Int(i) => json!(i),
                        Value::Str(s) => json!(s),
                    };
                    json!({ clause.key.clone(): { "$eq": value } })
                })
                .collect();
            json!({ "$and": ands })
        })
        .collect();
    json!({ "$or": ors })
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    id: &'a str,
    text: &'a str,
    values: &'a [f32],
    metadata: serde_json::Value,
    namespace: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    metadata: CloudMetadata,
}

#[derive(Deserialize)]
struct CloudMetadata {
    text: String,
    user_id: i64,
    paper_id: i64,
    summary_type: String,
    default_summary_id: Option<i64>,
    custom_summary_id: Option<i64>,
    llm_provider: String,
    llm_model: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[async_trait]
impl VectorStore for CloudStore {
    async fn add(
        &self,
        id: Option<String>,
        text: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<String, VectorStoreError> {
        let id = id.unwrap_or_else(|| metadata.stable_id());
        let req = UpsertRequest {
            id: &id,
            text,
            values: &embedding,
            namespace: &self.index,
            metadata: json!({
                "text": text,
                "user_id": metadata.user_id,
                "paper_id": metadata.paper_id,
                "summary_type": metadata.summary_type.to_string(),
                "default_summary_id": metadata.default_summary_id,
                "custom_summary_id": metadata.custom_summary_id,
                "llm_provider": metadata.llm_provider,
                "llm_model": metadata.llm_model,
                "tags": metadata.tags,
            }),
        };
        self.send("vectors/upsert", serde_json::to_value(req)?).await?;
        Ok(id)
    }

    async fn delete_by_filter(&self, filter: &Filter) -> Result<u64, VectorStoreError> {
        let body = json!({ "namespace": self.index, "filter": filter_to_json(filter) });
        let resp = self.send("vectors/delete", body).await?;
        Ok(resp.get("deletedCount").and_then(serde_json::Value::as_u64).unwrap_or(0))
    }

    async fn search_by_vector(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let mut body = json!({
            "namespace": self.index,
            "vector": query_embedding,
            "topK": k,
            "includeMetadata": true,
        });
        if let Some(filter) = filter {
            body["filter"] = filter_to_json(filter);
        }
        let resp: QueryResponse = serde_json::from_value(self.send("vectors/query", body).await?)?;
        Ok(resp
            .matches
            .into_iter()
            .map(|m| SearchHit {
                id: m.id,
                document: m.metadata.text.clone(),
                score: m.score,
                metadata: VectorMetadata {
                    user_id: m.metadata.user_id,
                    paper_id: m.metadata.paper_id,
                    summary_type: if m.metadata.summary_type == "custom" { SummaryKind::Custom } else { SummaryKind::Default },
                    default_summary_id: m.metadata.default_summary_id,
                    custom_summary_id: m.metadata.custom_summary_id,
                    llm_provider: m.metadata.llm_provider,
                    llm_model: m.metadata.llm_model,
                    tags: m.metadata.tags,
                },
            })
            .collect())
    }

    async fn get_embeddings(
        &self,
        conditions: &[(i64, i64)],
    ) -> Result<HashMap<(i64, i64), Vec<f32>>, VectorStoreError> {
        let ids: Vec<String> = conditions.iter().map(|&(u, p)| crate::stable_id(u, p)).collect();
        let body = json!({ "namespace": self.index, "ids": ids });
        let resp = self.send("vectors/fetch", body).await?;
        let mut out = HashMap::new();
        if let Some(vectors) = resp.get("vectors").and_then(serde_json::Value::as_object) {
            for (&(user_id, paper_id), id) in conditions.iter().zip(&ids) {
                if let Some(values) = vectors.get(id).and_then(|v| v.get("values")) {
                    if let Ok(embedding) = serde_json::from_value::<Vec<f32>>(values.clone()) {
                        out.insert((user_id, paper_id), embedding);
                    }
                }
            }
        }
        Ok(out)
    }

    async fn batch_exists(&self, user_id: i64, paper_ids: &[i64]) -> Result<HashMap<i64, bool>, VectorStoreError> {
        let conditions: Vec<(i64, i64)> = paper_ids.iter().map(|&p| (user_id, p)).collect();
        let embeddings = self.get_embeddings(&conditions).await?;
        Ok(paper_ids.iter().map(|&p| (p, embeddings.contains_key(&(user_id, p)))).collect())
    }
}

fn require_env(name: &str) -> Result<String, VectorStoreError> {
    std::env::var(name).map_err(|_| VectorStoreError::CloudStatus {
        status: 0,
        message: format!("missing environment variable {name}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Conjunction;

    #[test]
    fn filter_translates_to_or_of_and_eq() {
        let filter = Filter::any_of(vec![Conjunction::for_user_paper(1, 10), Conjunction::for_user_paper(1, 20)]);
        let json = filter_to_json(&filter);
        let ors = json["$or"].as_array().unwrap();
        assert_eq!(ors.len(), 2);
        assert_eq!(ors[0]["$and"][0]["user_id"]["$eq"], 1);
        assert_eq!(ors[1]["$and"][1]["paper_id"]["$eq"], 20);
    }
}
