//! Seeds the built-in default prompts (`owner_user_id IS NULL`) that
//! [`paperwright_prompts::resolve`] falls back to when a user has no
//! custom prompt of a given type, plus the two character persona
//! prompts (`character_persona_a`/`character_persona_b`).
//!
//! Uses the same `INSERT ... ON CONFLICT DO UPDATE` idiom as
//! `queries::users::get_or_create`: seeding is idempotent, so an operator
//! can re-run it after editing `DEFAULT_PROMPTS` without duplicating
//! rows.

use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// One built-in prompt to seed: `(prompt_type, name, category, body)`.
struct DefaultPrompt {
    prompt_type: &'static str,
    name: &'static str,
    category: &'static str,
    body: &'static str,
}

const DEFAULT_PROMPTS: &[DefaultPrompt] = &[
    DefaultPrompt {
        prompt_type: "summary",
        name: "Default summary",
        category: "summary",
        body: "Summarize the following paper for {name} as of {today}. Produce a thorough \
               summary followed by a one-sentence takeaway prefixed with \"One point:\".\n\n{paper}",
    },
    DefaultPrompt {
        prompt_type: "tagging",
        name: "Default tagging",
        category: "tagging",
        body: "Given this paper's summary, choose a short set of topical tags describing it. \
               Existing tags in use: {existing_tags}\n\n{summary}",
    },
    DefaultPrompt {
        prompt_type: "coordinator",
        name: "Default coordinator",
        category: "research",
        body: "You are coordinating a research session for {name} on {today}. Decide whether \
               the question \"{query}\" needs a plan or can be answered directly.",
    },
    DefaultPrompt {
        prompt_type: "planner",
        name: "Default planner",
        category: "research",
        body: "Break the question \"{query}\" into a short ordered list of research steps.",
    },
    DefaultPrompt {
        prompt_type: "supervisor",
        name: "Default supervisor",
        category: "research",
        body: "Review the agent's progress so far against the plan and decide whether to \
               continue, revise, or conclude.",
    },
    DefaultPrompt {
        prompt_type: "agent",
        name: "Default agent",
        category: "research",
        body: "You are a research agent for {name}. Use the available tools to answer: {query}",
    },
    DefaultPrompt {
        prompt_type: "research_summary",
        name: "Default research summary",
        category: "research",
        body: "Summarize the research session's findings into a final answer for {name}, citing \
               sources where available.",
    },
    DefaultPrompt {
        prompt_type: "character_persona_a",
        name: "Character A persona",
        category: "persona",
        body: "Respond in the voice of character A: direct, terse, and skeptical of \
               unsupported claims.",
    },
    DefaultPrompt {
        prompt_type: "character_persona_b",
        name: "Character B persona",
        category: "persona",
        body: "Respond in the voice of character B: warm, encouraging, and quick to highlight \
               connections between ideas.",
    },
];

/// Seeds (or re-seeds) every built-in default prompt.
///
/// Idempotent: running this twice updates existing default rows in
/// place rather than duplicating them, so an operator can re-run it
/// after editing `DEFAULT_PROMPTS`.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails.
pub async fn seed_default_prompts(db: &dyn Database) -> Result<usize, DbError> {
    for prompt in DEFAULT_PROMPTS {
        db.exec_raw_params(
            "INSERT INTO prompts (prompt_type, name, category, body, owner_user_id, is_active, updated_at)
             VALUES ($1, $2, $3, $4, NULL, true, NOW())
             ON CONFLICT (prompt_type, owner_user_id) WHERE owner_user_id IS NULL
             DO UPDATE SET name = EXCLUDED.name, category = EXCLUDED.category, body = EXCLUDED.body,
                           is_active = true, updated_at = NOW()",
            &[
                DatabaseValue::String(prompt.prompt_type.to_string()),
                DatabaseValue::String(prompt.name.to_string()),
                DatabaseValue::String(prompt.category.to_string()),
                DatabaseValue::String(prompt.body.to_string()),
            ],
        )
        .await?;
    }

    Ok(DEFAULT_PROMPTS.len())
}
