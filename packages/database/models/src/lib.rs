#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types as stored in and retrieved from Postgres.
//!
//! These are distinct from the API response types in
//! `paperwright_server_models`: row types carry every column (including
//! internal bookkeeping like `prompt_updated_at` snapshots), while the
//! server models carry only what the HTTP surface exposes.

use chrono::{DateTime, Utc};
use paperwright_models::{Character, MessageRole, PaperChatStatus, ResearchStatus};
use serde::{Deserialize, Serialize};

/// A scholarly paper, shared across all users once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRow {
    pub id: i64,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub authors: String,
    pub abstract_text: String,
    pub full_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user account row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub display_name: String,
    pub points: i64,
    pub selected_character: Character,
    pub affinity_a: u8,
    pub affinity_b: u8,
}

/// The uniqueness tuple for a `DefaultSummary` row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefaultSummaryKey {
    pub paper_id: i64,
    pub llm_provider: String,
    pub llm_model: String,
    pub character: Character,
    pub affinity: u8,
}

/// The uniqueness tuple for a `CustomSummary` row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomSummaryKey {
    pub user_id: i64,
    pub paper_id: i64,
    pub prompt_id: i64,
    pub llm_provider: String,
    pub llm_model: String,
    pub character: Character,
    pub affinity: u8,
}

/// A `DefaultSummary` row as read from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultSummaryRow {
    pub id: i64,
    pub paper_id: i64,
    pub llm_provider: String,
    pub llm_model: String,
    pub character: Character,
    pub affinity: u8,
    pub body: String,
    pub one_point: String,
    pub updated_at: DateTime<Utc>,
}

/// A `CustomSummary` row as read from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSummaryRow {
    pub id: i64,
    pub user_id: i64,
    pub paper_id: i64,
    pub prompt_id: i64,
    pub llm_provider: String,
    pub llm_model: String,
    pub character: Character,
    pub affinity: u8,
    pub body: String,
    pub one_point: String,
    /// Snapshot of `Prompt.updated_at` at generation time, used by the
    /// `requires_regeneration` check.
    pub prompt_updated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An `EditedSummary` override row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditedSummaryRow {
    pub id: i64,
    pub user_id: i64,
    pub default_summary_id: Option<i64>,
    pub custom_summary_id: Option<i64>,
    pub body: String,
    pub one_point: String,
    pub updated_at: DateTime<Utc>,
}

/// A `UserPaperLink` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPaperLinkRow {
    pub id: i64,
    pub user_id: i64,
    pub paper_id: i64,
    pub tags: String,
    pub memo: String,
    pub selected_default_summary_id: Option<i64>,
    pub selected_custom_summary_id: Option<i64>,
    pub last_accessed: DateTime<Utc>,
}

impl UserPaperLinkRow {
    /// Parses the comma-separated `tags` column into a tag set.
    #[must_use]
    pub fn tag_set(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// A `Prompt` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRow {
    pub id: i64,
    pub prompt_type: String,
    pub name: String,
    pub category: String,
    pub body: String,
    pub owner_user_id: Option<i64>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

/// A `PromptGroup` row — five optional prompt-id slots keyed by role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptGroupRow {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub category: String,
    pub coordinator_prompt_id: Option<i64>,
    pub planner_prompt_id: Option<i64>,
    pub supervisor_prompt_id: Option<i64>,
    pub agent_prompt_id: Option<i64>,
    pub summary_prompt_id: Option<i64>,
}

/// A `ResearchSession` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSessionRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub processing_status: ResearchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `ResearchMessage` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchMessageRow {
    pub id: i64,
    pub session_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub is_intermediate: bool,
    pub metadata_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A `PaperChatSession` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperChatSessionRow {
    pub id: i64,
    pub user_id: i64,
    pub paper_id: i64,
    pub processing_status: PaperChatStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `PaperChatMessage` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperChatMessageRow {
    pub id: i64,
    pub session_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
