#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared plain-data types used across the paperwright workspace.
//!
//! These are the vocabulary types every crate agrees on: character/affinity
//! selection, prompt roles, and the processing-status strings that are
//! directly visible to clients.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// A user-selected persona prefix applied to certain prompt types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    #[default]
    None,
    A,
    B,
}

impl Character {
    /// Returns the character as it appears in a summary key tuple.
    #[must_use]
    pub const fn as_key_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::A => "A",
            Self::B => "B",
        }
    }
}

/// Integer qualifier (0-4) stored per user per persona.
pub type Affinity = u8;

/// Clamps a raw affinity value into the valid `[0, 4]` range.
#[must_use]
pub const fn clamp_affinity(raw: i32) -> Affinity {
    if raw < 0 {
        0
    } else if raw > 4 {
        4
    } else {
        #[allow(clippy::cast_sign_loss)]
        {
            raw as Affinity
        }
    }
}

/// The fixed set of prompt roles the resolver understands. `Summary`/`Tagging` are paper-pipeline prompts;
/// the remaining five are the `PromptGroup` role slots used by the
/// research graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PromptType {
    Summary,
    Tagging,
    Coordinator,
    Planner,
    Supervisor,
    Agent,
    ResearchSummary,
}

impl PromptType {
    /// Whether this prompt type supports a character-prepended variant.
    #[must_use]
    pub const fn supports_character(self) -> bool {
        matches!(self, Self::Summary)
    }
}

/// `ResearchSession.processing_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResearchStatus {
    Pending,
    Coordinator,
    Planning,
    Supervising,
    AgentRunning,
    Tools,
    Summarizing,
    Completed,
    Failed,
    UnknownCompletion,
}

/// `PaperChatSession.processing_status` — a narrower state set than
/// [`ResearchStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaperChatStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A `ResearchMessage`/`PaperChatMessage` role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    SystemStep,
    System,
    Tool,
    SystemError,
}

/// Which of the two summary tables a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    Default,
    Custom,
}

/// Level tags used by filtering and the recommender.
pub mod level_tag {
    /// A paper the user has marked as a favourite.
    pub const FAVOURITE: &str = "Favourite";
    /// A paper the user has marked as not of interest.
    pub const NOT_INTERESTED: &str = "NotInterested";
    /// A paper the recommender has surfaced.
    pub const RECOMMENDED: &str = "Recommended";
}
