#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the paperwright server.
//!
//! These are serialized to/from JSON across the `/api` surface. They are
//! kept separate from the database row types in `paperwright_database_models`
//! so the wire contract can evolve independently of storage.

use chrono::{DateTime, Utc};
use paperwright_database_models::{PaperChatMessageRow, PaperRow, ResearchMessageRow, UserRow};
use paperwright_models::Character;
use serde::{Deserialize, Serialize};

/// Uniform error envelope returned by every failed `/api` call.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub kind: String,
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    pub healthy: bool,
    pub version: String,
}

/// Request body for `POST /papers/import_from_arxiv`.
///
/// arXiv/HTML/PDF fetching itself is out of scope (treated as an external
/// collaborator); the caller supplies the already-fetched paper text and
/// metadata and this endpoint does the rest — upsert, generate, tag,
/// vectorise.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFromArxivRequest {
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub authors: String,
    pub abstract_text: String,
    pub full_text: Option<String>,
    pub prompt_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFromArxivResponse {
    pub paper_id: i64,
    pub link_id: i64,
    pub default_summary: ApiSummary,
    pub custom_summary: Option<ApiSummary>,
    pub tags: Vec<String>,
}

/// Request body for `POST /papers/:id/summaries/generate` (the
/// single-summary generation endpoint).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummaryRequest {
    pub prompt_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSummary {
    pub id: i64,
    pub is_custom: bool,
    pub body: String,
    pub one_point: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /papers/summaries/generate_bulk`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBulkRequest {
    pub items: Vec<GenerateBulkItem>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBulkItem {
    pub paper_id: i64,
    pub prompt_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBulkResponse {
    pub accepted: bool,
}

/// Response for `GET /auth/character-selection-bulk-update-progress`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkProgressResponse {
    pub is_running: bool,
    pub total: u64,
    pub processed: u64,
    pub eta_seconds: Option<i64>,
    pub last_error: Option<String>,
}

/// Query parameters for `GET /papers/check_duplications`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDuplicationsQuery {
    pub external_id: String,
}

/// Response for duplicate/existence checks ahead of an import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDuplicationsResponse {
    pub paper_id: Option<i64>,
    pub already_linked: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckExistingSummaryRequest {
    pub paper_id: i64,
    pub prompt_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckExistingSummaryResponse {
    pub exists: bool,
    pub requires_regeneration: bool,
    pub summary: Option<ApiSummary>,
}

/// Request to start a Research Graph or RAG session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResearchRequest {
    pub query: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResearchResponse {
    pub session_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQueryRequest {
    pub paper_id: i64,
    pub question: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQueryResponse {
    pub answer: String,
    pub references: Vec<ApiReference>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReference {
    pub kind: String,
    pub paper_id: Option<i64>,
    pub title: Option<String>,
    pub url: Option<String>,
}

/// Status of a Research Graph session, with its accumulated transcript.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchStatusResponse {
    pub status: String,
    pub messages: Vec<ApiResearchMessage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResearchMessage {
    pub id: i64,
    pub role: String,
    pub content: String,
    pub is_intermediate: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ResearchMessageRow> for ApiResearchMessage {
    fn from(row: ResearchMessageRow) -> Self {
        Self {
            id: row.id,
            role: row.role.to_string(),
            content: row.content,
            is_intermediate: row.is_intermediate,
            created_at: row.created_at,
        }
    }
}

/// Status of a paper-chat (RAG) session, with its accumulated transcript.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperChatStatusResponse {
    pub status: String,
    pub messages: Vec<ApiPaperChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPaperChatMessage {
    pub id: i64,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<PaperChatMessageRow> for ApiPaperChatMessage {
    fn from(row: PaperChatMessageRow) -> Self {
        Self {
            id: row.id,
            role: row.role.to_string(),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Response for `GET /papers/recommend`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub recommended_link_ids: Vec<i64>,
}

/// A paper as returned by the API, joined with its bookkeeping columns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPaper {
    pub id: i64,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub authors: String,
    pub abstract_text: String,
    pub has_full_text: bool,
}

impl From<PaperRow> for ApiPaper {
    fn from(row: PaperRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            url: row.url,
            title: row.title,
            authors: row.authors,
            abstract_text: row.abstract_text,
            has_full_text: row.full_text.is_some(),
        }
    }
}

/// The authenticated actor's profile, as exposed over the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    pub id: i64,
    pub display_name: String,
    pub points: i64,
    pub selected_character: String,
    pub affinity_a: u8,
    pub affinity_b: u8,
}

impl From<UserRow> for ApiUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            points: row.points,
            selected_character: row.selected_character.as_key_str().to_string(),
            affinity_a: row.affinity_a,
            affinity_b: row.affinity_b,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCharacterRequest {
    pub character: CharacterWire,
}

/// Wire representation of [`Character`] (the JSON API speaks lowercase
/// `none`/`a`/`b` rather than the enum's `Display` form).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterWire {
    None,
    A,
    B,
}

impl From<CharacterWire> for Character {
    fn from(value: CharacterWire) -> Self {
        match value {
            CharacterWire::None => Self::None,
            CharacterWire::A => Self::A,
            CharacterWire::B => Self::B,
        }
    }
}
