//! `UserPaperLink` queries.

use moosicbox_json_utils::database::ToValue as _;
use paperwright_database_models::UserPaperLinkRow;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Fetches (or implicitly expects the caller to create) the link between a
/// user and a paper.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_link(db: &dyn Database, user_id: i64, paper_id: i64) -> Result<Option<UserPaperLinkRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, user_id, paper_id, tags, memo, selected_default_summary_id,
                    selected_custom_summary_id, last_accessed
             FROM user_paper_links WHERE user_id = $1 AND paper_id = $2",
            &[DatabaseValue::Int64(user_id), DatabaseValue::Int64(paper_id)],
        )
        .await?;
    rows.first().map(row_to_link).transpose()
}

/// Creates the link if absent, bumping `last_accessed` either way.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn upsert_link(db: &dyn Database, user_id: i64, paper_id: i64) -> Result<UserPaperLinkRow, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO user_paper_links (user_id, paper_id, tags, memo, last_accessed)
             VALUES ($1, $2, '', '', now())
             ON CONFLICT (user_id, paper_id) DO UPDATE SET last_accessed = now()
             RETURNING id, user_id, paper_id, tags, memo, selected_default_summary_id,
                       selected_custom_summary_id, last_accessed",
            &[DatabaseValue::Int64(user_id), DatabaseValue::Int64(paper_id)],
        )
        .await?;
    row_to_link(rows.first().ok_or_else(|| DbError::Conversion {
        message: "upsert_link returned no row".to_string(),
    })?)
}

/// Sets the selected summary for a link, enforcing the "at most one
/// non-null" invariant by always clearing the other column.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_selected_summary(
    db: &dyn Database,
    link_id: i64,
    default_summary_id: Option<i64>,
    custom_summary_id: Option<i64>,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE user_paper_links SET selected_default_summary_id = $1, selected_custom_summary_id = $2
         WHERE id = $3",
        &[
            default_summary_id.map_or(DatabaseValue::Null, DatabaseValue::Int64),
            custom_summary_id.map_or(DatabaseValue::Null, DatabaseValue::Int64),
            DatabaseValue::Int64(link_id),
        ],
    )
    .await?;
    Ok(())
}

/// Replaces a link's tag set with the given comma-joined tags.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_tags(db: &dyn Database, link_id: i64, tags: &str) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE user_paper_links SET tags = $1 WHERE id = $2",
        &[DatabaseValue::String(tags.to_string()), DatabaseValue::Int64(link_id)],
    )
    .await?;
    Ok(())
}

/// Lists every paper id linked to a user, most recently accessed first —
/// the unfiltered corpus.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_paper_ids(db: &dyn Database, user_id: i64) -> Result<Vec<i64>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT paper_id FROM user_paper_links WHERE user_id = $1 ORDER BY last_accessed DESC",
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;
    rows.iter()
        .map(|r| r.to_value("paper_id").map_err(conv))
        .collect()
}

/// Lists every paper id linked to a user that carries at least one of
/// `tags`, most recently accessed first.
/// Returns the same as [`list_paper_ids`] if `tags` is empty.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_paper_ids_with_any_tag(db: &dyn Database, user_id: i64, tags: &[String]) -> Result<Vec<i64>, DbError> {
    if tags.is_empty() {
        return list_paper_ids(db, user_id).await;
    }

    let mut clauses = Vec::with_capacity(tags.len());
    let mut params = vec![DatabaseValue::Int64(user_id)];
    for tag in tags {
        clauses.push(format!("(',' || tags || ',') LIKE ${}", params.len() + 1));
        params.push(DatabaseValue::String(format!("%,{tag},%")));
    }

    let sql = format!(
        "SELECT paper_id FROM user_paper_links WHERE user_id = $1 AND ({})
         GROUP BY paper_id ORDER BY MAX(last_accessed) DESC",
        clauses.join(" OR ")
    );

    let rows = db.query_raw_params(&sql, &params).await?;
    rows.iter().map(|r| r.to_value("paper_id").map_err(conv)).collect()
}

/// Deletes a user-paper link. Callers are responsible for the cascading
/// deletes a full removal requires (edited summaries, custom summaries,
/// paper-chat sessions, vectors) — those span multiple crates (the vector
/// store in particular) so they are orchestrated one level up, not here.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_link(db: &dyn Database, link_id: i64) -> Result<(), DbError> {
    db.exec_raw_params(
        "DELETE FROM user_paper_links WHERE id = $1",
        &[DatabaseValue::Int64(link_id)],
    )
    .await?;
    Ok(())
}

/// Deletes all custom summaries owned by a user for a paper (part of the
/// cascade on link deletion).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_custom_summaries_for_link(db: &dyn Database, user_id: i64, paper_id: i64) -> Result<(), DbError> {
    db.exec_raw_params(
        "DELETE FROM custom_summaries WHERE user_id = $1 AND paper_id = $2",
        &[DatabaseValue::Int64(user_id), DatabaseValue::Int64(paper_id)],
    )
    .await?;
    Ok(())
}

/// Deletes all edited-summary overrides owned by a user that point at
/// summaries for this paper.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_edited_summaries_for_link(db: &dyn Database, user_id: i64, paper_id: i64) -> Result<(), DbError> {
    db.exec_raw_params(
        "DELETE FROM edited_summaries
         WHERE user_id = $1 AND (
             default_summary_id IN (SELECT id FROM default_summaries WHERE paper_id = $2)
             OR custom_summary_id IN (SELECT id FROM custom_summaries WHERE user_id = $1 AND paper_id = $2)
         )",
        &[DatabaseValue::Int64(user_id), DatabaseValue::Int64(paper_id)],
    )
    .await?;
    Ok(())
}

fn row_to_link(row: &switchy_database::Row) -> Result<UserPaperLinkRow, DbError> {
    Ok(UserPaperLinkRow {
        id: row.to_value("id").map_err(conv)?,
        user_id: row.to_value("user_id").map_err(conv)?,
        paper_id: row.to_value("paper_id").map_err(conv)?,
        tags: row.to_value("tags").unwrap_or_default(),
        memo: row.to_value("memo").unwrap_or_default(),
        selected_default_summary_id: row.to_value("selected_default_summary_id").unwrap_or(None),
        selected_custom_summary_id: row.to_value("selected_custom_summary_id").unwrap_or(None),
        last_accessed: row.to_value("last_accessed").map_err(conv)?,
    })
}

fn conv(e: impl std::fmt::Display) -> DbError {
    DbError::Conversion {
        message: e.to_string(),
    }
}
