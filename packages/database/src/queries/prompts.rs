//! Prompt and `PromptGroup` queries backing `paperwright_prompts`'s resolver.

use moosicbox_json_utils::database::ToValue as _;
use paperwright_database_models::{PromptGroupRow, PromptRow};
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Fetches a prompt by id, only if owned by `user_id` and active.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_owned_active_prompt(
    db: &dyn Database,
    prompt_id: i64,
    user_id: i64,
) -> Result<Option<PromptRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, prompt_type, name, category, body, owner_user_id, is_active, updated_at
             FROM prompts WHERE id = $1 AND owner_user_id = $2 AND is_active = true",
            &[DatabaseValue::Int64(prompt_id), DatabaseValue::Int64(user_id)],
        )
        .await?;
    rows.first().map(row_to_prompt).transpose()
}

/// Fetches the built-in default prompt for a type (`owner_user_id IS NULL`).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no default exists for `prompt_type`,
/// [`DbError`] otherwise.
pub async fn get_default_prompt(db: &dyn Database, prompt_type: &str) -> Result<PromptRow, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, prompt_type, name, category, body, owner_user_id, is_active, updated_at
             FROM prompts WHERE prompt_type = $1 AND owner_user_id IS NULL AND is_active = true
             ORDER BY id LIMIT 1",
            &[DatabaseValue::String(prompt_type.to_string())],
        )
        .await?;
    row_to_prompt(rows.first().ok_or_else(|| DbError::NotFound {
        message: format!("no default prompt for type {prompt_type}"),
    })?)
}

/// Fetches a prompt by id regardless of ownership (used once a custom
/// prompt has already been resolved, e.g. to read `updated_at`).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if absent, [`DbError`] otherwise.
pub async fn get_prompt(db: &dyn Database, prompt_id: i64) -> Result<PromptRow, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, prompt_type, name, category, body, owner_user_id, is_active, updated_at
             FROM prompts WHERE id = $1",
            &[DatabaseValue::Int64(prompt_id)],
        )
        .await?;
    row_to_prompt(rows.first().ok_or_else(|| DbError::NotFound {
        message: format!("prompt {prompt_id} not found"),
    })?)
}

/// Fetches a named `PromptGroup` for a user, if present.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_prompt_group(
    db: &dyn Database,
    user_id: i64,
    name: &str,
    category: &str,
) -> Result<Option<PromptGroupRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, user_id, category, coordinator_prompt_id, planner_prompt_id,
                    supervisor_prompt_id, agent_prompt_id, summary_prompt_id
             FROM prompt_groups WHERE user_id = $1 AND name = $2 AND category = $3",
            &[
                DatabaseValue::Int64(user_id),
                DatabaseValue::String(name.to_string()),
                DatabaseValue::String(category.to_string()),
            ],
        )
        .await?;
    rows.first().map(row_to_group).transpose()
}

fn row_to_prompt(row: &switchy_database::Row) -> Result<PromptRow, DbError> {
    Ok(PromptRow {
        id: row.to_value("id").map_err(conv)?,
        prompt_type: row.to_value("prompt_type").map_err(conv)?,
        name: row.to_value("name").map_err(conv)?,
        category: row.to_value("category").unwrap_or_default(),
        body: row.to_value("body").map_err(conv)?,
        owner_user_id: row.to_value("owner_user_id").unwrap_or(None),
        is_active: row.to_value("is_active").unwrap_or(true),
        updated_at: row.to_value("updated_at").map_err(conv)?,
    })
}

fn row_to_group(row: &switchy_database::Row) -> Result<PromptGroupRow, DbError> {
    Ok(PromptGroupRow {
        id: row.to_value("id").map_err(conv)?,
        name: row.to_value("name").map_err(conv)?,
        user_id: row.to_value("user_id").map_err(conv)?,
        category: row.to_value("category").unwrap_or_default(),
        coordinator_prompt_id: row.to_value("coordinator_prompt_id").unwrap_or(None),
        planner_prompt_id: row.to_value("planner_prompt_id").unwrap_or(None),
        supervisor_prompt_id: row.to_value("supervisor_prompt_id").unwrap_or(None),
        agent_prompt_id: row.to_value("agent_prompt_id").unwrap_or(None),
        summary_prompt_id: row.to_value("summary_prompt_id").unwrap_or(None),
    })
}

fn conv(e: impl std::fmt::Display) -> DbError {
    DbError::Conversion {
        message: e.to_string(),
    }
}
