//! The five-role Research Graph state machine.
//!
//! Coordinator → Planner → Supervisor ↔ Agent → Tools → Summary, with
//! `processing_status` updated at the entry of each role
//! (`paperwright_database::queries::research::set_status`) and every
//! role's output persisted as a `ResearchMessage` before the next role
//! runs.
//!
//! The Agent↔Tools sub-cycle reuses `paperwright_rag::run_rag`'s bounded
//! tool-calling loop (same truncation and by-name dispatch), with the
//! fixed five-role outer shape layered on top as an explicit Rust state
//! machine rather than a framework-driven graph object.

use std::collections::HashMap;

use paperwright_database::DbError;
use paperwright_database::queries::{links, research};
use paperwright_database_models::{PromptGroupRow, ResearchMessageRow};
use paperwright_llm::gateway::{Gateway, GatewayError, InvokeOptions};
use paperwright_llm::providers::{ContentBlock, Message, MessageContent, StopReason};
use paperwright_models::{Character, MessageRole, PromptType, ResearchStatus};
use paperwright_prompts::PromptError;
use paperwright_rag::tools::{self, ToolError, WebTools};
use paperwright_vectorstore::VectorStore;
use paperwright_vectorstore::embedder::Embedder;
use switchy_database::Database;
use thiserror::Error;

use crate::roles::{CoordinatorNext, CoordinatorOutput, SupervisorNext, SupervisorOutput, parse_structured};

/// Safety-net recursion cap — the
/// graph's natural termination is the Summary node; the limit is a
/// safety net.
const MAX_GRAPH_STEPS: u32 = 20_000;

/// Bound on the Agent↔Tools sub-cycle within a single Supervisor
/// dispatch, the same shape as `paperwright_rag`'s `MAX_ITERATIONS`.
const MAX_AGENT_SUB_ITERATIONS: u32 = 10;

/// In-graph retry attempts per role on top of the Gateway's own
/// retry/fallback.
const ROLE_RETRY_LIMIT: u32 = 3;

/// Tool results larger than this are truncated, matching
/// `paperwright_rag`'s `MAX_TOOL_RESULT_BYTES`.
const MAX_TOOL_RESULT_BYTES: usize = 8000;

/// Which external tool set the Agent role dispatches to: Research (web
/// tools) or RAG (corpus tool only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFlavor {
    /// `web_search`/`web_extract` only.
    Research,
    /// `corpus_search` only.
    Rag,
}

/// Errors from running the Research Graph.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Prompt resolution failed.
    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// A role exhausted [`ROLE_RETRY_LIMIT`] attempts without a valid
    /// structured or free-text response.
    #[error("role {role} exhausted {ROLE_RETRY_LIMIT} attempts: {cause}")]
    RoleExhausted { role: &'static str, cause: String },

    /// A tool call failed in a way that aborts the run.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    /// The graph ran [`MAX_GRAPH_STEPS`] steps without reaching Summary.
    #[error("graph exceeded {0} steps without reaching Summary")]
    StepLimit(u32),
}

/// Runs the Research Graph to completion for `query`, persisting every
/// intermediate role output and updating `processing_status` as it goes.
///
/// On any internal error the session is marked `failed` and a
/// `system_error` message records the cause before the error is
/// propagated to the caller; partial progress (everything persisted so
/// far) is preserved.
///
/// # Errors
///
/// Returns [`ResearchError`] if the graph cannot make progress; the
/// session's `processing_status` is always left in a terminal or
/// inspectable state regardless.
#[allow(clippy::too_many_arguments)]
pub async fn run_research(
    db: &dyn Database,
    gateway: &Gateway,
    vector_store: &dyn VectorStore,
    embedder: &dyn Embedder,
    web_tools: &dyn WebTools,
    session_id: i64,
    user_id: i64,
    display_name: &str,
    character: Character,
    flavor: ToolFlavor,
    tags: &[String],
    prompt_group: Option<&PromptGroupRow>,
    query: &str,
) -> Result<(), ResearchError> {
    research::append_message(db, session_id, MessageRole::User, query, false, None).await?;

    match run_inner(
        db,
        gateway,
        vector_store,
        embedder,
        web_tools,
        session_id,
        user_id,
        display_name,
        character,
        flavor,
        tags,
        prompt_group,
        query,
    )
    .await
    {
        Ok(()) => Ok(()),
        Err(e) => {
            research::set_status(db, session_id, ResearchStatus::Failed).await?;
            research::append_message(db, session_id, MessageRole::SystemError, &e.to_string(), false, None).await?;
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_inner(
    db: &dyn Database,
    gateway: &Gateway,
    vector_store: &dyn VectorStore,
    embedder: &dyn Embedder,
    web_tools: &dyn WebTools,
    session_id: i64,
    user_id: i64,
    display_name: &str,
    character: Character,
    flavor: ToolFlavor,
    tags: &[String],
    prompt_group: Option<&PromptGroupRow>,
    query: &str,
) -> Result<(), ResearchError> {
    let mut placeholders = HashMap::new();
    placeholders.insert("query".to_string(), query.to_string());

    // --- Coordinator (runs exactly once) ---
    research::set_status(db, session_id, ResearchStatus::Coordinator).await?;
    let coordinator_prompt = resolve_prompt(
        db,
        PromptType::Coordinator,
        user_id,
        prompt_group.and_then(|g| g.coordinator_prompt_id),
        character,
        display_name,
        &placeholders,
    )
    .await?;

    let coordinator_output: CoordinatorOutput =
        call_structured(gateway, "coordinator", &coordinator_prompt, &[initial_message(query)]).await?;

    let coordinator_done = coordinator_output.next == CoordinatorNext::End;
    research::append_message(
        db,
        session_id,
        MessageRole::Assistant,
        &coordinator_output.response,
        !coordinator_done,
        Some(&serde_json::to_string(&coordinator_output).unwrap_or_default()),
    )
    .await?;

    if coordinator_done {
        research::set_status(db, session_id, ResearchStatus::Completed).await?;
        return Ok(());
    }

    // --- Planner (runs exactly once) ---
    research::set_status(db, session_id, ResearchStatus::Planning).await?;
    let planner_prompt = resolve_prompt(
        db,
        PromptType::Planner,
        user_id,
        prompt_group.and_then(|g| g.planner_prompt_id),
        character,
        display_name,
        &placeholders,
    )
    .await?;

    let plan = call_free_text(
        gateway,
        "planner",
        &planner_prompt,
        &[initial_message(query), Message {
            role: "assistant".to_string(),
            content: MessageContent::Text(coordinator_output.response.clone()),
        }],
    )
    .await?;
    research::append_message(db, session_id, MessageRole::Assistant, &plan, true, None).await?;

    // --- Supervisor ↔ Agent/Tools loop ---
    let supervisor_prompt = resolve_prompt(
        db,
        PromptType::Supervisor,
        user_id,
        prompt_group.and_then(|g| g.supervisor_prompt_id),
        character,
        display_name,
        &placeholders,
    )
    .await?;
    let agent_prompt = resolve_prompt(
        db,
        PromptType::Agent,
        user_id,
        prompt_group.and_then(|g| g.agent_prompt_id),
        character,
        display_name,
        &placeholders,
    )
    .await?;

    for _step in 0..MAX_GRAPH_STEPS {
        research::set_status(db, session_id, ResearchStatus::Supervising).await?;
        let history = research::list_messages(db, session_id).await?;
        let supervisor_messages = history_to_messages(&history);

        let supervisor_output: SupervisorOutput =
            call_structured(gateway, "supervisor", &supervisor_prompt, &supervisor_messages).await?;

        let supervisor_msg = research::append_message(
            db,
            session_id,
            MessageRole::SystemStep,
            &supervisor_output.next_action,
            true,
            Some(&serde_json::to_string(&supervisor_output).unwrap_or_default()),
        )
        .await?;

        match supervisor_output.next {
            SupervisorNext::Summary => {
                return run_summary(
                    db,
                    gateway,
                    user_id,
                    display_name,
                    character,
                    prompt_group,
                    session_id,
                    &placeholders,
                )
                .await;
            }
            SupervisorNext::Agent => {
                run_agent_cycle(
                    db,
                    gateway,
                    vector_store,
                    embedder,
                    web_tools,
                    session_id,
                    user_id,
                    flavor,
                    tags,
                    &agent_prompt,
                    supervisor_msg.id,
                )
                .await?;
            }
        }
    }

    research::set_status(db, session_id, ResearchStatus::UnknownCompletion).await?;
    Err(ResearchError::StepLimit(MAX_GRAPH_STEPS))
}

/// Runs the Agent role, executing any tool calls via the Tools role and
/// looping back to Agent until it produces a final (non-tool-use)
/// response, then hands control back to the Supervisor.
#[allow(clippy::too_many_arguments)]
async fn run_agent_cycle(
    db: &dyn Database,
    gateway: &Gateway,
    vector_store: &dyn VectorStore,
    embedder: &dyn Embedder,
    web_tools: &dyn WebTools,
    session_id: i64,
    user_id: i64,
    flavor: ToolFlavor,
    tags: &[String],
    agent_prompt: &str,
    since_message_id: i64,
) -> Result<(), ResearchError> {
    research::set_status(db, session_id, ResearchStatus::AgentRunning).await?;

    for _iteration in 0..MAX_AGENT_SUB_ITERATIONS {
        let history = research::list_messages_since(db, session_id, since_message_id).await?;
        let messages = history_to_messages(&history);
        let tool_defs = tool_definitions(flavor);

        let outcome = gateway
            .invoke(agent_prompt, &messages, &tool_defs, &InvokeOptions::default(), |_| Ok(()))
            .await
            .map_err(|e| gateway_to_role_error("agent", e))?;

        let response = outcome.response;
        let has_tool_calls = response.stop_reason == StopReason::ToolUse
            && response.content.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. }));

        if !has_tool_calls {
            research::append_message(db, session_id, MessageRole::Assistant, &response.text(), true, None).await?;
            return Ok(());
        }

        let metadata = serde_json::to_string(&response.content).ok();
        research::append_message(
            db,
            session_id,
            MessageRole::Assistant,
            &response.text(),
            true,
            metadata.as_deref(),
        )
        .await?;

        research::set_status(db, session_id, ResearchStatus::Tools).await?;
        for block in &response.content {
            if let ContentBlock::ToolUse { name, input, .. } = block {
                let result =
                    execute_tool(db, vector_store, embedder, web_tools, user_id, tags, flavor, name, input).await?;
                let truncated = if result.len() > MAX_TOOL_RESULT_BYTES {
                    format!("{}... (truncated)", &result[..MAX_TOOL_RESULT_BYTES])
                } else {
                    result
                };
                research::append_message(db, session_id, MessageRole::Tool, &truncated, true, None).await?;
            }
        }
        research::set_status(db, session_id, ResearchStatus::AgentRunning).await?;
    }

    research::append_message(
        db,
        session_id,
        MessageRole::SystemStep,
        "agent sub-cycle exceeded its iteration bound; returning control to supervisor",
        true,
        None,
    )
    .await?;
    Ok(())
}

/// Runs the Summary role: full history, last message's role rewritten as
/// `user`, producing the final
/// markdown report.
async fn run_summary(
    db: &dyn Database,
    gateway: &Gateway,
    user_id: i64,
    display_name: &str,
    character: Character,
    prompt_group: Option<&PromptGroupRow>,
    session_id: i64,
    placeholders: &HashMap<String, String>,
) -> Result<(), ResearchError> {
    research::set_status(db, session_id, ResearchStatus::Summarizing).await?;

    let summary_prompt = resolve_prompt(
        db,
        PromptType::ResearchSummary,
        user_id,
        prompt_group.and_then(|g| g.summary_prompt_id),
        character,
        display_name,
        placeholders,
    )
    .await?;

    let history = research::list_messages(db, session_id).await?;
    let mut messages = history_to_messages(&history);
    if let Some(last) = messages.last_mut() {
        last.role = "user".to_string();
    }

    let report = call_free_text(gateway, "summary", &summary_prompt, &messages).await?;
    research::append_message(db, session_id, MessageRole::Assistant, &report, false, None).await?;
    research::set_status(db, session_id, ResearchStatus::Completed).await?;
    Ok(())
}

fn initial_message(query: &str) -> Message {
    Message {
        role: "user".to_string(),
        content: MessageContent::Text(query.to_string()),
    }
}

/// Converts persisted session history into Gateway messages. Roles with
/// no direct chat-API analogue (`system_step`, `system`, `system_error`,
/// `tool`) are folded into assistant-authored text, since every role's
/// output is ultimately something the next role needs to read, not
/// something only a `user`/`assistant` pair can express.
fn history_to_messages(history: &[ResearchMessageRow]) -> Vec<Message> {
    history
        .iter()
        .map(|m| Message {
            role: match m.role {
                MessageRole::User => "user",
                _ => "assistant",
            }
            .to_string(),
            content: MessageContent::Text(m.content.clone()),
        })
        .collect()
}

async fn resolve_prompt(
    db: &dyn Database,
    prompt_type: PromptType,
    user_id: i64,
    prompt_id: Option<i64>,
    character: Character,
    display_name: &str,
    placeholders: &HashMap<String, String>,
) -> Result<String, ResearchError> {
    let resolved = paperwright_prompts::resolve(db, prompt_type, user_id, prompt_id, character, display_name, placeholders).await?;
    Ok(resolved.body)
}

/// Calls the Gateway for a role expected to return a JSON structured
/// output, retrying up to [`ROLE_RETRY_LIMIT`] times at the graph level
/// on top of the Gateway's own retry/fallback.
async fn call_structured<T: serde::de::DeserializeOwned>(
    gateway: &Gateway,
    role: &'static str,
    system_prompt: &str,
    messages: &[Message],
) -> Result<T, ResearchError> {
    let mut last_error = String::new();
    for _attempt in 0..ROLE_RETRY_LIMIT {
        let outcome = gateway
            .invoke(system_prompt, messages, &[], &InvokeOptions::default(), |response| {
                parse_structured::<T>(&response.text()).map(|_| ()).map_err(|e| e.to_string())
            })
            .await;

        match outcome {
            Ok(outcome) => match parse_structured::<T>(&outcome.response.text()) {
                Ok(value) => return Ok(value),
                Err(e) => last_error = e.to_string(),
            },
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(ResearchError::RoleExhausted { role, cause: last_error })
}

/// Calls the Gateway for a role expected to return free text.
async fn call_free_text(
    gateway: &Gateway,
    role: &'static str,
    system_prompt: &str,
    messages: &[Message],
) -> Result<String, ResearchError> {
    gateway
        .invoke(system_prompt, messages, &[], &InvokeOptions::default(), |_| Ok(()))
        .await
        .map(|outcome| outcome.response.text())
        .map_err(|e| gateway_to_role_error(role, e))
}

fn gateway_to_role_error(role: &'static str, e: GatewayError) -> ResearchError {
    ResearchError::RoleExhausted {
        role,
        cause: e.to_string(),
    }
}

fn tool_definitions(flavor: ToolFlavor) -> Vec<serde_json::Value> {
    match flavor {
        ToolFlavor::Research => vec![
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
        ],
        ToolFlavor::Rag => vec![serde_json::json!({
            "name": "corpus_search",
            "description": "Search the user's paper corpus (optionally restricted to a tag list) for relevant passages.",
            "input_schema": {
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"],
            },
        })],
    }
}

#[allow(clippy::too_many_arguments)]
async fn execute_tool(
    db: &dyn Database,
    vector_store: &dyn VectorStore,
    embedder: &dyn Embedder,
    web_tools: &dyn WebTools,
    user_id: i64,
    tags: &[String],
    flavor: ToolFlavor,
    name: &str,
    input: &serde_json::Value,
) -> Result<String, ResearchError> {
    match (flavor, name) {
        (ToolFlavor::Rag, "corpus_search") => {
            let query = input["query"].as_str().unwrap_or_default();
            let hits = tools::corpus_search(db, vector_store, embedder, user_id, tags, query, 8).await?;
            Ok(serde_json::to_string(&hits).unwrap_or_default())
        }
        (ToolFlavor::Research, "web_search") => {
            let query = input["query"].as_str().unwrap_or_default();
            let hits = web_tools.search(query).await?;
            Ok(serde_json::to_string(&hits).unwrap_or_default())
        }
        (ToolFlavor::Research, "web_extract") => {
            let url = input["url"].as_str().unwrap_or_default();
            Ok(web_tools.extract(url).await?)
        }
        (_, other) => Ok(format!("unknown tool for this session's flavor: {other}")),
    }
}

/// Ensures the given user owns a tag-filtered corpus before starting a
/// RAG-flavour session. Not used by the Research flavour,
/// which has no corpus dependency.
///
/// # Errors
///
/// Returns [`ResearchError`] if the database is unreachable.
pub async fn corpus_paper_count(db: &dyn Database, user_id: i64, tags: &[String]) -> Result<usize, ResearchError> {
    Ok(links::list_paper_ids_with_any_tag(db, user_id, tags).await?.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definitions_match_flavor() {
        let research_tools = tool_definitions(ToolFlavor::Research);
        assert_eq!(research_tools.len(), 2);
        let rag_tools = tool_definitions(ToolFlavor::Rag);
        assert_eq!(rag_tools.len(), 1);
        assert_eq!(rag_tools[0]["name"], "corpus_search");
    }

    #[test]
    fn history_to_messages_maps_non_user_roles_to_assistant() {
        let history = vec![
            ResearchMessageRow {
                id: 1,
                session_id: 1,
                role: MessageRole::User,
                content: "hello".to_string(),
                is_intermediate: false,
                metadata_json: None,
                created_at: chrono::Utc::now(),
            },
            ResearchMessageRow {
                id: 2,
                session_id: 1,
                role: MessageRole::SystemStep,
                content: "step".to_string(),
                is_intermediate: true,
                metadata_json: None,
                created_at: chrono::Utc::now(),
            },
        ];
        let messages = history_to_messages(&history);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
    }
}
