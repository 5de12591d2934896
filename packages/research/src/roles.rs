//! Structured-output contracts for the Coordinator and Supervisor roles
//!. Agent/Planner/Summary are free text and
//! need no schema.

use serde::{Deserialize, Serialize};

/// Where the Coordinator sends control next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorNext {
    Planner,
    End,
}

/// The Coordinator role's structured output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorOutput {
    pub reasoning: String,
    pub response: String,
    pub next: CoordinatorNext,
}

/// Where the Supervisor sends control next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorNext {
    Agent,
    Summary,
}

/// The Supervisor role's structured output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorOutput {
    pub reasoning: String,
    pub planning: String,
    pub next_action: String,
    pub next: SupervisorNext,
}

/// Extracts a JSON object from `text`, tolerating a surrounding markdown
/// code fence (```` ```json ... ``` ````) the way models commonly wrap
/// structured output despite being asked not to.
///
/// # Errors
///
/// Returns the `serde_json` error if no valid JSON object can be parsed.
pub fn parse_structured<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let trimmed = text.trim();
    let candidate = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map_or(trimmed, |rest| rest.strip_suffix("```").unwrap_or(rest).trim());
    serde_json::from_str(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_structured_strips_markdown_fence() {
        let text = "```json\n{\"reasoning\":\"r\",\"response\":\"ok\",\"next\":\"end\"}\n```";
        let parsed: CoordinatorOutput = parse_structured(text).expect("parses");
        assert_eq!(parsed.next, CoordinatorNext::End);
        assert_eq!(parsed.response, "ok");
    }

    #[test]
    fn parse_structured_accepts_bare_json() {
        let text = r#"{"reasoning":"r","planning":"p","next_action":"a","next":"agent"}"#;
        let parsed: SupervisorOutput = parse_structured(text).expect("parses");
        assert_eq!(parsed.next, SupervisorNext::Agent);
    }
}
