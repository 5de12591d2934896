//! Text-to-vector embedding, the capability `search_by_vector` needs on the
//! query side. Kept small and separate from
//! [`paperwright_llm::gateway::Gateway`] since embeddings are a single HTTP
//! call with no retry/fallback ceremony worth sharing with the chat path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors producing an embedding.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the embeddings endpoint.
    #[error("embeddings API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Missing API key configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Produces a fixed-dimension embedding vector for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds `text`.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError`] on transport or provider failure.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Dimensionality of vectors this embedder produces.
    fn dims(&self) -> usize;
}

/// `OpenAI` `text-embedding-3-small` embedder (1536 dims).
pub struct OpenAiEmbedder {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    /// Builds an embedder against the given model id.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Builds an embedder from `OPENAI_API_KEY` /
    /// `PAPERWRIGHT_EMBEDDING_MODEL` (default `text-embedding-3-small`).
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::Config`] if `OPENAI_API_KEY` is unset.
    pub fn from_env() -> Result<Self, EmbedError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EmbedError::Config("OPENAI_API_KEY environment variable not set".to_string()))?;
        let model = std::env::var("PAPERWRIGHT_EMBEDDING_MODEL").unwrap_or_else(|_| "text-embedding-3-small".to_string());
        Ok(Self::new(api_key, model))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let resp = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: text })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = resp.json().await?;
        Ok(parsed.data.into_iter().next().map(|d| d.embedding).unwrap_or_default())
    }

    fn dims(&self) -> usize {
        1536
    }
}

/// Deterministic, network-free embedder for tests: hashes overlapping
/// word shingles into a fixed-size bag-of-features vector so semantically
/// similar strings score higher than unrelated ones without depending on
/// a real model.
pub struct DeterministicEmbedder {
    dims: usize,
}

impl DeterministicEmbedder {
    /// Builds a deterministic embedder producing `dims`-length vectors.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; self.dims];
        for word in text.split_whitespace() {
            let hash = fnv1a(word.as_bytes());
            let bucket = (hash as usize) % self.dims;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosine_similarity;

    #[tokio::test]
    async fn deterministic_embedder_scores_shared_vocabulary_higher() {
        let embedder = DeterministicEmbedder::default();
        let a = embedder.embed("diffusion models for image generation").await.unwrap();
        let b = embedder.embed("diffusion models for image synthesis").await.unwrap();
        let c = embedder.embed("crop yield forecasting in agriculture").await.unwrap();

        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }
}
