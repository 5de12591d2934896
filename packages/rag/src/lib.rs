#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The RAG Agent Graph.
//!
//! A bounded tool-calling loop over the LLM Gateway: a fixed iteration
//! cap, by-name tool dispatch, and truncation of oversized tool results
//! before they re-enter the message list. The tool set is
//! `corpus_search`/`web_search`/`web_extract`, and citation policy
//! (inline URLs only, no numeric footnotes) is enforced through the
//! system prompt rather than the message loop, since it is a property of
//! model output, not of control flow.

pub mod tools;

use paperwright_database::DbError;
use paperwright_database::queries::paper_chat;
use paperwright_llm::gateway::{Gateway, GatewayError, InvokeOptions};
use paperwright_llm::providers::{ContentBlock, Message, MessageContent, StopReason};
use paperwright_models::{MessageRole, PaperChatStatus};
use paperwright_vectorstore::embedder::Embedder;
use paperwright_vectorstore::VectorStore;
use serde::{Deserialize, Serialize};
use switchy_database::Database;
use thiserror::Error;

use crate::tools::{ToolError, WebTools};

/// Upper bound on loop iterations before the run is aborted as failed.
const MAX_ITERATIONS: u32 = 10;

/// Tool results larger than this are truncated before being fed back to
/// the model, matching `agent.rs::MAX_TOOL_RESULT_BYTES`.
const MAX_TOOL_RESULT_BYTES: usize = 8000;

/// Default number of corpus hits `corpus_search` requests.
const DEFAULT_CORPUS_K: usize = 8;

/// Errors from a RAG run.
#[derive(Debug, Error)]
pub enum RagError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Gateway call failed after exhausting retries/fallback.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A tool call failed in a way that aborts the run.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    /// The loop ran `MAX_ITERATIONS` times without reaching a final
    /// answer.
    #[error("RAG loop exceeded {0} iterations without a final answer")]
    MaxIterations(u32),
}

/// A reference extracted post-hoc from tool outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reference {
    /// A paper surfaced by `corpus_search`.
    Paper { paper_id: i64 },
    /// A web page surfaced by `web_search`.
    Web { title: String, url: String },
}

/// The result of one RAG run.
#[derive(Debug, Clone)]
pub struct RagOutcome {
    /// The model's final answer text.
    pub answer: String,
    /// References extracted from tool outputs over the run, de-duplicated
    /// in first-seen order.
    pub references: Vec<Reference>,
}

/// System prompt enforcing the citation policy.
fn system_prompt() -> String {
    "You are a research assistant answering questions from a user's paper corpus and the web. \
     Use corpus_search to find relevant passages from the user's own papers, and web_search/web_extract \
     for information beyond the corpus. Every external reference must embed its URL directly inline in \
     the sentence that uses it (e.g. \"as shown in https://arxiv.org/abs/...\"). Never use numbered \
     footnote citations like [1] or [2]. Answer concisely and cite as you go."
        .to_string()
}

/// JSON tool-definition schemas for the Gateway's `tools` parameter.
fn tool_definitions() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({
            "name": "corpus_search",
            "description": "Search the user's paper corpus (optionally restricted to a tag list) for relevant passages.",
            "input_schema": {
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"],
            },
        }),
        serde_json::json!({
            "name": "web_search",
            "description": "Search the web for a query, returning title+url+snippet hits.",
            "input_schema": {
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"],
            },
        }),
        serde_json::json!({
            "name": "web_extract",
            "description": "Fetch a URL and extract its plain-text content.",
            "input_schema": {
                "type": "object",
                "properties": { "url": { "type": "string" } },
                "required": ["url"],
            },
        }),
    ]
}

/// Runs the bounded RAG loop to completion for `question`, persisting
/// every message to the given paper-chat session.
///
/// # Errors
///
/// Returns [`RagError`] if the Gateway, a tool call, or the database
/// fails, or if the loop exceeds [`MAX_ITERATIONS`] without a final
/// answer.
#[allow(clippy::too_many_arguments)]
pub async fn run_rag(
    db: &dyn Database,
    gateway: &Gateway,
    vector_store: &dyn VectorStore,
    embedder: &dyn Embedder,
    web_tools: &dyn WebTools,
    session_id: i64,
    user_id: i64,
    tags: &[String],
    question: &str,
) -> Result<RagOutcome, RagError> {
    paper_chat::set_status(db, session_id, PaperChatStatus::Processing).await?;
    paper_chat::append_message(db, session_id, MessageRole::User, question).await?;

    let system_prompt = system_prompt();
    let tools = tool_definitions();
    let mut messages = vec![Message {
        role: "user".to_string(),
        content: MessageContent::Text(question.to_string()),
    }];
    let mut references = Vec::new();

    for _iteration in 0..MAX_ITERATIONS {
        let outcome = gateway.invoke(&system_prompt, &messages, &tools, &InvokeOptions::default(), |_| Ok(())).await;

        let response = match outcome {
            Ok(outcome) => outcome.response,
            Err(e) => {
                paper_chat::set_status(db, session_id, PaperChatStatus::Failed).await?;
                return Err(e.into());
            }
        };

        if response.stop_reason != StopReason::ToolUse
            || !response.content.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. }))
        {
            let answer = response.text();
            paper_chat::append_message(db, session_id, MessageRole::Assistant, &answer).await?;
            paper_chat::set_status(db, session_id, PaperChatStatus::Completed).await?;
            return Ok(RagOutcome { answer, references });
        }

        messages.push(Message {
            role: "assistant".to_string(),
            content: MessageContent::Blocks(response.content.clone()),
        });

        let mut tool_results = Vec::new();
        for block in &response.content {
            if let ContentBlock::ToolUse { id, name, input } = block {
                let (result_json, refs) =
                    execute_tool(db, vector_store, embedder, web_tools, user_id, tags, name, input).await?;
                references.extend(refs);

                let truncated = if result_json.len() > MAX_TOOL_RESULT_BYTES {
                    format!("{}... (truncated)", &result_json[..MAX_TOOL_RESULT_BYTES])
                } else {
                    result_json
                };

                tool_results.push(ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: truncated,
                });
            }
        }

        let metadata = serde_json::to_string(&response.content).ok();
        paper_chat::append_message(db, session_id, MessageRole::Tool, &metadata.unwrap_or_default()).await?;

        messages.push(Message {
            role: "user".to_string(),
            content: MessageContent::Blocks(tool_results),
        });
    }

    paper_chat::set_status(db, session_id, PaperChatStatus::Failed).await?;
    Err(RagError::MaxIterations(MAX_ITERATIONS))
}

/// Dispatches one tool call by name, returning its JSON result text and
/// any references it surfaces.
async fn execute_tool(
    db: &dyn Database,
    vector_store: &dyn VectorStore,
    embedder: &dyn Embedder,
    web_tools: &dyn WebTools,
    user_id: i64,
    tags: &[String],
    name: &str,
    input: &serde_json::Value,
) -> Result<(String, Vec<Reference>), RagError> {
    match name {
        "corpus_search" => {
            let query = input["query"].as_str().unwrap_or_default();
            let hits = tools::corpus_search(db, vector_store, embedder, user_id, tags, query, DEFAULT_CORPUS_K).await?;
            let refs = hits.iter().map(|h| Reference::Paper { paper_id: h.paper_id }).collect();
            Ok((serde_json::to_string(&hits).unwrap_or_default(), refs))
        }
        "web_search" => {
            let query = input["query"].as_str().unwrap_or_default();
            let hits = web_tools.search(query).await?;
            let refs = hits
                .iter()
                .map(|h| Reference::Web { title: h.title.clone(), url: h.url.clone() })
                .collect();
            Ok((serde_json::to_string(&hits).unwrap_or_default(), refs))
        }
        "web_extract" => {
            let url = input["url"].as_str().unwrap_or_default();
            let text = web_tools.extract(url).await?;
            Ok((text, Vec::new()))
        }
        other => Ok((format!("unknown tool: {other}"), Vec::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_forbids_numeric_footnotes() {
        let prompt = system_prompt();
        assert!(prompt.contains("inline"));
        assert!(prompt.to_lowercase().contains("footnote"));
    }

    #[test]
    fn tool_definitions_cover_the_three_rag_tools() {
        let defs = tool_definitions();
        let names: Vec<&str> = defs.iter().filter_map(|d| d["name"].as_str()).collect();
        assert_eq!(names, vec!["corpus_search", "web_search", "web_extract"]);
    }
}
