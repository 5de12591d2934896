//! Tool implementations the RAG loop can call:
//! `corpus_search`, `web_search`, `web_extract`.

use async_trait::async_trait;
use paperwright_database::DbError;
use paperwright_database::queries::links;
use paperwright_llm::gateway::GatewayError;
use paperwright_vectorstore::embedder::{EmbedError, Embedder};
use paperwright_vectorstore::filter::{Conjunction, Filter};
use paperwright_vectorstore::{SearchHit, VectorStore, VectorStoreError};
use serde::{Deserialize, Serialize};
use switchy_database::Database;
use thiserror::Error;

/// Errors from tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Embedding the query failed.
    #[error("embedding error: {0}")]
    Embed(#[from] EmbedError),

    /// Vector store call failed.
    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    /// External web tool call failed.
    #[error("web tool error: {0}")]
    Web(#[from] GatewayError),

    /// The external web tool HTTP call itself failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One `corpus_search` hit, shaped for the model's tool-result JSON and
/// for post-hoc reference extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusHit {
    pub paper_id: i64,
    pub document: String,
    pub score: f32,
}

/// Embeds `query` and retrieves the top-`k` vectors for `user_id`,
/// restricted to papers carrying any of `tags` when non-empty.
///
/// # Errors
///
/// Returns [`ToolError`] on database, embedding, or vector-store failure.
pub async fn corpus_search(
    db: &dyn Database,
    vector_store: &dyn VectorStore,
    embedder: &dyn Embedder,
    user_id: i64,
    tags: &[String],
    query: &str,
    k: usize,
) -> Result<Vec<CorpusHit>, ToolError> {
    let paper_ids = links::list_paper_ids_with_any_tag(db, user_id, tags).await?;
    if paper_ids.is_empty() {
        return Ok(Vec::new());
    }

    let filter = Filter::any_of(paper_ids.into_iter().map(|pid| Conjunction::for_user_paper(user_id, pid)).collect());

    let embedding = embedder.embed(query).await?;
    let hits = vector_store.search_by_vector(&embedding, k, Some(&filter)).await?;

    Ok(hits
        .into_iter()
        .map(|hit: SearchHit| CorpusHit {
            paper_id: hit.metadata.paper_id,
            document: hit.document,
            score: hit.score,
        })
        .collect())
}

/// A web search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// External search/extract tools the RAG (and Research) graph's `Tools`
/// role dispatches to.
///
/// Kept behind a trait, the way [`Embedder`] abstracts the embeddings
/// provider, so tests can substitute a canned implementation without
/// network access.
#[async_trait]
pub trait WebTools: Send + Sync {
    /// Runs a web search and returns ranked title+url+snippet hits.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] on transport or provider failure.
    async fn search(&self, query: &str) -> Result<Vec<WebSearchResult>, ToolError>;

    /// Fetches `url` and returns its extracted plain-text content.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] on transport or provider failure.
    async fn extract(&self, url: &str) -> Result<String, ToolError>;
}

/// A `WebTools` implementation backed by a generic HTTP search/extract
/// API, configured the same way [`paperwright_vectorstore::embedder::OpenAiEmbedder`]
/// reads its endpoint and bearer token from the environment.
pub struct HttpWebTools {
    search_url: String,
    extract_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpWebTools {
    /// Builds a client pointed at `search_url`/`extract_url`, optionally
    /// authenticating with a bearer token.
    #[must_use]
    pub fn new(search_url: String, extract_url: String, api_key: Option<String>) -> Self {
        Self {
            search_url,
            extract_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Builds a client from `PAPERWRIGHT_WEB_SEARCH_URL` /
    /// `PAPERWRIGHT_WEB_EXTRACT_URL` / `PAPERWRIGHT_WEB_TOOLS_API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("PAPERWRIGHT_WEB_SEARCH_URL").unwrap_or_else(|_| "https://api.search.example/search".to_string()),
            std::env::var("PAPERWRIGHT_WEB_EXTRACT_URL").unwrap_or_else(|_| "https://api.search.example/extract".to_string()),
            std::env::var("PAPERWRIGHT_WEB_TOOLS_API_KEY").ok(),
        )
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl WebTools for HttpWebTools {
    async fn search(&self, query: &str) -> Result<Vec<WebSearchResult>, ToolError> {
        let request = self.authed(self.client.get(&self.search_url).query(&[("q", query)]));
        let results: Vec<WebSearchResult> = request.send().await?.json().await?;
        Ok(results)
    }

    async fn extract(&self, url: &str) -> Result<String, ToolError> {
        let request = self.authed(self.client.get(&self.extract_url).query(&[("url", url)]));
        let text = request.send().await?.text().await?;
        Ok(text)
    }
}

#[cfg(test)]
pub struct NullWebTools;

#[cfg(test)]
#[async_trait]
impl WebTools for NullWebTools {
    async fn search(&self, _query: &str) -> Result<Vec<WebSearchResult>, ToolError> {
        Ok(Vec::new())
    }

    async fn extract(&self, _url: &str) -> Result<String, ToolError> {
        Ok(String::new())
    }
}
