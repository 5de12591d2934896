//! `PaperChatSession`/`PaperChatMessage` persistence — the per-paper
//! conversational threads, structurally the simplest of the
//! persisted session types since they carry no intermediate-step
//! bookkeeping.

use moosicbox_json_utils::database::ToValue as _;
use paperwright_database_models::{PaperChatMessageRow, PaperChatSessionRow};
use paperwright_models::{MessageRole, PaperChatStatus};
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Creates a new paper-chat session in `pending` state.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn create_session(db: &dyn Database, user_id: i64, paper_id: i64) -> Result<PaperChatSessionRow, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO paper_chat_sessions (user_id, paper_id, processing_status, created_at, updated_at)
             VALUES ($1, $2, 'pending', now(), now())
             RETURNING id, user_id, paper_id, processing_status, created_at, updated_at",
            &[DatabaseValue::Int64(user_id), DatabaseValue::Int64(paper_id)],
        )
        .await?;
    row_to_session(rows.first().ok_or_else(|| DbError::Conversion {
        message: "create_session returned no row".to_string(),
    })?)
}

/// Updates a paper-chat session's status.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_status(db: &dyn Database, session_id: i64, status: PaperChatStatus) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE paper_chat_sessions SET processing_status = $1, updated_at = now() WHERE id = $2",
        &[
            DatabaseValue::String(status.to_string()),
            DatabaseValue::Int64(session_id),
        ],
    )
    .await?;
    Ok(())
}

/// Appends a message, preserving order.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn append_message(
    db: &dyn Database,
    session_id: i64,
    role: MessageRole,
    content: &str,
) -> Result<PaperChatMessageRow, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO paper_chat_messages (session_id, role, content, created_at)
             VALUES ($1, $2, $3, now())
             RETURNING id, session_id, role, content, created_at",
            &[
                DatabaseValue::Int64(session_id),
                DatabaseValue::String(role.to_string()),
                DatabaseValue::String(content.to_string()),
            ],
        )
        .await?;
    row_to_message(rows.first().ok_or_else(|| DbError::Conversion {
        message: "append_message returned no row".to_string(),
    })?)
}

/// Fetches a paper-chat session by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if absent, [`DbError`] otherwise.
pub async fn get_session(db: &dyn Database, session_id: i64) -> Result<PaperChatSessionRow, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, user_id, paper_id, processing_status, created_at, updated_at
             FROM paper_chat_sessions WHERE id = $1",
            &[DatabaseValue::Int64(session_id)],
        )
        .await?;
    row_to_session(rows.first().ok_or_else(|| DbError::NotFound {
        message: format!("paper chat session {session_id} not found"),
    })?)
}

/// Lists messages for a paper-chat session in creation order.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_messages(db: &dyn Database, session_id: i64) -> Result<Vec<PaperChatMessageRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, session_id, role, content, created_at
             FROM paper_chat_messages WHERE session_id = $1 ORDER BY id ASC",
            &[DatabaseValue::Int64(session_id)],
        )
        .await?;
    rows.iter().map(row_to_message).collect()
}

fn row_to_session(row: &switchy_database::Row) -> Result<PaperChatSessionRow, DbError> {
    Ok(PaperChatSessionRow {
        id: row.to_value("id").map_err(conv)?,
        user_id: row.to_value("user_id").map_err(conv)?,
        paper_id: row.to_value("paper_id").map_err(conv)?,
        processing_status: parse_status(&row.to_value::<String>("processing_status").map_err(conv)?),
        created_at: row.to_value("created_at").map_err(conv)?,
        updated_at: row.to_value("updated_at").map_err(conv)?,
    })
}

fn row_to_message(row: &switchy_database::Row) -> Result<PaperChatMessageRow, DbError> {
    Ok(PaperChatMessageRow {
        id: row.to_value("id").map_err(conv)?,
        session_id: row.to_value("session_id").map_err(conv)?,
        role: parse_role(&row.to_value::<String>("role").map_err(conv)?),
        content: row.to_value("content").map_err(conv)?,
        created_at: row.to_value("created_at").map_err(conv)?,
    })
}

fn parse_status(s: &str) -> PaperChatStatus {
    use std::str::FromStr as _;
    PaperChatStatus::from_str(s).unwrap_or(PaperChatStatus::Pending)
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
