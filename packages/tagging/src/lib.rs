#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The Tagging Pipeline.
//!
//! Given a paper's `READY` summary, asks the LLM to pick tags from a
//! fixed, category-grouped vocabulary, subject to per-category minimums,
//! and writes the result to the `UserPaperLink`'s `tags` column. Retried
//! via `paperwright_llm::gateway::InvokeOptions` rather than a bespoke
//! retry loop, so the default three primary attempts plus three fallback
//! attempts cover a malformed tag line exactly like a transient provider
//! error.

pub mod vocabulary;

use paperwright_database::DbError;
use paperwright_database::queries::{links, summaries as summary_queries};
use paperwright_llm::gateway::{Gateway, InvokeOptions};
use paperwright_llm::providers::{Message, MessageContent};
use switchy_database::Database;
use thiserror::Error;

pub use vocabulary::{Category, TAG_VOCABULARY};

/// Errors from the tagging pipeline.
#[derive(Debug, Error)]
pub enum TaggingError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// No `READY` summary exists yet for this (user, paper) — tagging has
    /// nothing to read.
    #[error("no ready summary available to tag paper {paper_id}")]
    NoSummaryAvailable {
        /// The paper that has no summary yet.
        paper_id: i64,
    },
}

/// Outcome of a tagging attempt.
#[derive(Debug, Clone)]
pub enum TaggingOutcome {
    /// Tags were selected and written.
    Tagged(Vec<String>),
    /// The link already had non-empty tags and `force` was not set.
    SkippedAlreadyTagged,
    /// Every attempt (primary and fallback) failed validation or the
    /// Gateway call itself; no tags were written.
    Failed,
}

/// Picks the best available summary text to tag from, preferring
/// default-no-character, then default-with-character, then
/// custom-no-character, then custom-with-character.
async fn pick_summary_text(db: &dyn Database, user_id: i64, paper_id: i64) -> Result<Option<String>, TaggingError> {
    use paperwright_models::Character;

    let defaults = summary_queries::list_default_summaries_for_paper(db, paper_id).await?;
    if let Some(row) = defaults.iter().find(|r| r.character == Character::None && summary_queries::parse_processing_n(&r.body).is_none()) {
        return Ok(Some(row.body.clone()));
    }
    if let Some(row) = defaults.iter().find(|r| r.character != Character::None && summary_queries::parse_processing_n(&r.body).is_none()) {
        return Ok(Some(row.body.clone()));
    }

    let customs = summary_queries::list_custom_summaries_for_link(db, user_id, paper_id).await?;
    if let Some(row) = customs.iter().find(|r| r.character == Character::None && summary_queries::parse_processing_n(&r.body).is_none()) {
        return Ok(Some(row.body.clone()));
    }
    if let Some(row) = customs.iter().find(|r| r.character != Character::None && summary_queries::parse_processing_n(&r.body).is_none()) {
        return Ok(Some(row.body.clone()));
    }

    Ok(None)
}

/// Runs the tagging pipeline for (`user_id`, `paper_id`) and writes the
/// result to the link's `tags` column.
///
/// `force` re-tags even if the link already has tags.
///
/// # Errors
///
/// Returns [`TaggingError::NoSummaryAvailable`] if no `READY` summary
/// exists yet, or [`TaggingError::Database`] on a database failure.
pub async fn tag_paper(
    db: &dyn Database,
    gateway: &Gateway,
    link_id: i64,
    user_id: i64,
    paper_id: i64,
    existing_tags: &str,
    force: bool,
) -> Result<TaggingOutcome, TaggingError> {
    if !force && !existing_tags.trim().is_empty() {
        return Ok(TaggingOutcome::SkippedAlreadyTagged);
    }

    let Some(summary_text) = pick_summary_text(db, user_id, paper_id).await? else {
        return Err(TaggingError::NoSummaryAvailable { paper_id });
    };

    let system_prompt = build_system_prompt();
    let messages = [Message {
        role: "user".to_string(),
        content: MessageContent::Text(format!("Summary:\n\n{summary_text}")),
    }];

    let outcome = gateway
        .invoke(&system_prompt, &messages, &[], &InvokeOptions::default(), |response| {
            validate_tag_line(&response.text()).map(|_| ())
        })
        .await;

    let Ok(outcome) = outcome else {
        return Ok(TaggingOutcome::Failed);
    };

    let Ok(tags) = validate_tag_line(&outcome.response.text()) else {
        return Ok(TaggingOutcome::Failed);
    };

    links::set_tags(db, link_id, &tags.join(",")).await?;
    Ok(TaggingOutcome::Tagged(tags))
}

/// Builds the system prompt instructing the model on the vocabulary and
/// the output format.
fn build_system_prompt() -> String {
    let mut prompt = String::from(
        "You are tagging a research paper summary. Choose tags strictly from the vocabulary below.\n\
         Rules: select at least 2 tags overall; at least 1 from Modality/Task; at least 1 from \
         Architecture; at least 1 from Techniques is recommended; do not select two tags that express \
         the same concept. Respond with exactly one line: the chosen tags separated by commas, and \
         nothing else.\n\nVocabulary:\n",
    );
    for category in TAG_VOCABULARY {
        prompt.push_str(&format!("- {}: {}\n", category.name, category.tags.join(", ")));
    }
    prompt
}

/// Parses a CSV tag line, tolerating surrounding/inter-item whitespace,
/// and validates it against the vocabulary's per-category minimums.
///
/// # Errors
///
/// Returns `Err` (with a human-readable reason, also used by the
/// Gateway's validation closure to trigger a retry) if the line parses to
/// fewer than 2 tags, omits a required category, contains a tag outside
/// the vocabulary, or contains duplicate tags.
pub fn validate_tag_line(line: &str) -> Result<Vec<String>, String> {
    let tags: Vec<String> = line
        .lines()
        .next()
        .unwrap_or("")
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if tags.len() < 2 {
        return Err(format!("expected at least 2 tags, got {}", tags.len()));
    }

    let mut seen = std::collections::HashSet::new();
    for tag in &tags {
        if !vocabulary::is_known_tag(tag) {
            return Err(format!("tag '{tag}' is not in the fixed vocabulary"));
        }
        if !seen.insert(tag.clone()) {
            return Err(format!("duplicate tag '{tag}'"));
        }
    }

    if !tags.iter().any(|t| vocabulary::category_of(t) == Some(Category::ModalityTask)) {
        return Err("missing a required Modality/Task tag".to_string());
    }
    if !tags.iter().any(|t| vocabulary::category_of(t) == Some(Category::Architecture)) {
        return Err("missing a required Architecture tag".to_string());
    }

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_tag_line_accepts_a_compliant_selection() {
        let result = validate_tag_line("Text, Transformer, Fine-tuning");
        assert_eq!(result, Ok(vec!["Text".to_string(), "Transformer".to_string(), "Fine-tuning".to_string()]));
    }

    #[test]
    fn validate_tag_line_rejects_missing_required_category() {
        let result = validate_tag_line("Fine-tuning, Contrastive Learning");
        assert!(result.is_err());
    }

    #[test]
    fn validate_tag_line_rejects_unknown_tag() {
        let result = validate_tag_line("Text, Transformer, Quantum Computing");
        assert!(result.is_err());
    }

    #[test]
    fn validate_tag_line_rejects_duplicates() {
        let result = validate_tag_line("Text, Transformer, Text");
        assert!(result.is_err());
    }

    #[test]
    fn validate_tag_line_tolerates_whitespace() {
        let result = validate_tag_line("  Text ,  Transformer  ,Fine-tuning ");
        assert_eq!(result, Ok(vec!["Text".to_string(), "Transformer".to_string(), "Fine-tuning".to_string()]));
    }
}
