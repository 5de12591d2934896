//! `ResearchSession`/`ResearchMessage` persistence backing the Research
//! Graph's state machine: Postgres-backed sessions with a typed
//! `processing_status` column and an append-only message log.

use moosicbox_json_utils::database::ToValue as _;
use paperwright_database_models::{ResearchMessageRow, ResearchSessionRow};
use paperwright_models::{MessageRole, ResearchStatus};
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Creates a new research session in `pending` state.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn create_session(db: &dyn Database, user_id: i64, title: &str) -> Result<ResearchSessionRow, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO research_sessions (user_id, title, processing_status, created_at, updated_at)
             VALUES ($1, $2, 'pending', now(), now())
             RETURNING id, user_id, title, processing_status, created_at, updated_at",
            &[DatabaseValue::Int64(user_id), DatabaseValue::String(title.to_string())],
        )
        .await?;
    row_to_session(rows.first().ok_or_else(|| DbError::Conversion {
        message: "create_session returned no row".to_string(),
    })?)
}

/// Updates a session's `processing_status`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_status(db: &dyn Database, session_id: i64, status: ResearchStatus) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE research_sessions SET processing_status = $1, updated_at = now() WHERE id = $2",
        &[
            DatabaseValue::String(status.to_string()),
            DatabaseValue::Int64(session_id),
        ],
    )
    .await?;
    Ok(())
}

/// Appends a message to a session. Ordering is guaranteed by the caller
/// serialising appends within a session.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn append_message(
    db: &dyn Database,
    session_id: i64,
    role: MessageRole,
    content: &str,
    is_intermediate: bool,
    metadata_json: Option<&str>,
) -> Result<ResearchMessageRow, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO research_messages (session_id, role, content, is_intermediate, metadata_json, created_at)
             VALUES ($1, $2, $3, $4, $5, now())
             RETURNING id, session_id, role, content, is_intermediate, metadata_json, created_at",
            &[
                DatabaseValue::Int64(session_id),
                DatabaseValue::String(role.to_string()),
                DatabaseValue::String(content.to_string()),
                DatabaseValue::Bool(is_intermediate),
                metadata_json.map_or(DatabaseValue::Null, |m| DatabaseValue::String(m.to_string())),
            ],
        )
        .await?;
    row_to_message(rows.first().ok_or_else(|| DbError::Conversion {
        message: "append_message returned no row".to_string(),
    })?)
}

/// Fetches a session by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if absent, [`DbError`] otherwise.
pub async fn get_session(db: &dyn Database, session_id: i64) -> Result<ResearchSessionRow, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, user_id, title, processing_status, created_at, updated_at
             FROM research_sessions WHERE id = $1",
            &[DatabaseValue::Int64(session_id)],
        )
        .await?;
    row_to_session(rows.first().ok_or_else(|| DbError::NotFound {
        message: format!("research session {session_id} not found"),
    })?)
}

/// Lists every message in a session, in creation order.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_messages(db: &dyn Database, session_id: i64) -> Result<Vec<ResearchMessageRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, session_id, role, content, is_intermediate, metadata_json, created_at
             FROM research_messages WHERE session_id = $1 ORDER BY id ASC",
            &[DatabaseValue::Int64(session_id)],
        )
        .await?;
    rows.iter().map(row_to_message).collect()
}

/// Builds a slice of message history from the given role onward, used by
/// the Agent role.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_messages_since(
    db: &dyn Database,
    session_id: i64,
    since_message_id: i64,
) -> Result<Vec<ResearchMessageRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, session_id, role, content, is_intermediate, metadata_json, created_at
             FROM research_messages WHERE session_id = $1 AND id >= $2 ORDER BY id ASC",
            &[DatabaseValue::Int64(session_id), DatabaseValue::Int64(since_message_id)],
        )
        .await?;
    rows.iter().map(row_to_message).collect()
}

fn row_to_session(row: &switchy_database::Row) -> Result<ResearchSessionRow, DbError> {
    Ok(ResearchSessionRow {
        id: row.to_value("id").map_err(conv)?,
        user_id: row.to_value("user_id").map_err(conv)?,
        title: row.to_value("title").map_err(conv)?,
        processing_status: parse_status(&row.to_value::<String>("processing_status").map_err(conv)?),
        created_at: row.to_value("created_at").map_err(conv)?,
        updated_at: row.to_value("updated_at").map_err(conv)?,
    })
}

fn row_to_message(row: &switchy_database::Row) -> Result<ResearchMessageRow, DbError> {
    Ok(ResearchMessageRow {
        id: row.to_value("id").map_err(conv)?,
        session_id: row.to_value("session_id").map_err(conv)?,
        role: parse_role(&row.to_value::<String>("role").map_err(conv)?),
        content: row.to_value("content").map_err(conv)?,
        is_intermediate: row.to_value("is_intermediate").unwrap_or(false),
        metadata_json: row.to_value("metadata_json").unwrap_or(None),
        created_at: row.to_value("created_at").map_err(conv)?,
    })
}

fn parse_status(s: &str) -> ResearchStatus {
    use std::str::FromStr as _;
    ResearchStatus::from_str(s).unwrap_or(ResearchStatus::Pending)
}

fn parse_role(s: &str) -> MessageRole {
    use std::str::FromStr as _;
    MessageRole::from_str(s).unwrap_or(MessageRole::System)
}

fn conv(e: impl std::fmt::Display) -> DbError {
    DbError::Conversion {
        message: e.to_string(),
    }
}
