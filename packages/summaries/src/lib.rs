#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The Summary Coordinator and the Selection Policy.
//!
//! The coordinator holds no in-process lock table, only the summary
//! tables' unique indices and an `INSERT ... ON CONFLICT ... RETURNING`
//! idiom for claiming a key. The literal `[PROCESSING_{n}] ...`
//! placeholder format carries the generation number a waiter needs to
//! detect a restart; dual generation (character=none and
//! character=selected in parallel) is two `tokio::spawn`ed futures
//! joined with `tokio::join!`.

pub mod bulk;
pub mod coordinator;
pub mod selection;

use thiserror::Error;

/// Errors from the coordinator.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] paperwright_database::DbError),

    /// The gateway exhausted every configured route.
    #[error("generation failed: {0}")]
    Generation(#[from] paperwright_llm::gateway::GatewayError),

    /// Prompt resolution failed (e.g. no default prompt seeded for the
    /// requested type).
    #[error("prompt resolution failed: {0}")]
    Prompt(#[from] paperwright_prompts::PromptError),

    /// A row the coordinator expected to still exist vanished between two
    /// reads in a way the protocol does not account for (e.g. a waiter's
    /// safe-number insert lost a race it should have won). Surfacing this
    /// distinctly makes such a bug visible instead of silently looping.
    #[error("summary row for key vanished unexpectedly during {0}")]
    Inconsistent(&'static str),

    /// The waiting protocol exceeded its bound without the row ever
    /// reaching a state the caller could act on (should not happen in
    /// practice since escalation always eventually produces an owner).
    #[error("wait protocol exceeded {0} polls without resolving")]
    WaitExhausted(u32),
}

/// The marker the generation step searches for to carve the "one_point"
/// summary out of the full body.
pub const ONE_POINT_MARKER: &str = "一言でいうと";

/// Paper body is truncated to this many characters before being sent to
/// the LLM Gateway.
pub const PAPER_BODY_MAX_CHARS: usize = 100_000;

/// How often the waiting protocol polls a `PROCESSING` row.
pub const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// How long a single-key waiter waits before escalating.
pub const WAIT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5 * 60);

/// Extracts the "one_point" (a one-line summary) from a generated body by
/// locating [`ONE_POINT_MARKER`] and taking the remainder of that
/// paragraph. Falls back to the body's first non-empty line if the marker
/// is absent.
#[must_use]
pub fn extract_one_point(body: &str) -> String {
    if let Some(pos) = body.find(ONE_POINT_MARKER) {
        let after = &body[pos + ONE_POINT_MARKER.len()..];
        let line = after.lines().find(|l| !l.trim().is_empty()).unwrap_or(after);
        let trimmed = line.trim().trim_start_matches([':', '：', '、', ',', ' ']).trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    body.lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Builds the paper-context user message sent alongside the resolved
/// prompt.
#[must_use]
pub fn paper_context(title: &str, abstract_text: &str, full_text: Option<&str>) -> String {
    let mut body = full_text.unwrap_or_default();
    if body.len() > PAPER_BODY_MAX_CHARS {
        body = &body[..PAPER_BODY_MAX_CHARS];
    }
    format!("Title: {title}\n\nAbstract: {abstract_text}\n\nBody:\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_one_point_finds_marker() {
        let body = "Long summary...\n\n一言でいうと: diffusion models beat GANs on FID.\n\nMore detail...";
        assert_eq!(extract_one_point(body), "diffusion models beat GANs on FID.");
    }

    #[test]
    fn extract_one_point_falls_back_to_first_line() {
        let body = "\n\nNo marker present here.\nSecond line.";
        assert_eq!(extract_one_point(body), "No marker present here.");
    }

    #[test]
    fn paper_context_truncates_body() {
        let long_body = "x".repeat(PAPER_BODY_MAX_CHARS + 500);
        let ctx = paper_context("T", "A", Some(&long_body));
        assert!(ctx.len() < PAPER_BODY_MAX_CHARS + 200);
    }
}
