//! Paper ingestion queries.

use moosicbox_json_utils::database::ToValue as _;
use paperwright_database_models::PaperRow;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Inserts a paper, or returns the existing row if `external_id` is already
/// known.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn upsert_paper(
    db: &dyn Database,
    external_id: &str,
    url: &str,
    title: &str,
    authors: &str,
    abstract_text: &str,
) -> Result<PaperRow, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO papers (external_id, url, title, authors, abstract_text)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
             RETURNING id, external_id, url, title, authors, abstract_text, full_text, created_at",
            &[
                DatabaseValue::String(external_id.to_string()),
                DatabaseValue::String(url.to_string()),
                DatabaseValue::String(title.to_string()),
                DatabaseValue::String(authors.to_string()),
                DatabaseValue::String(abstract_text.to_string()),
            ],
        )
        .await?;

    row_to_paper(rows.first())
}

/// Looks up a paper by `external_id` without inserting one, for duplicate
/// checks ahead of an import.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_paper_by_external_id(db: &dyn Database, external_id: &str) -> Result<Option<PaperRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, external_id, url, title, authors, abstract_text, full_text, created_at
             FROM papers WHERE external_id = $1",
            &[DatabaseValue::String(external_id.to_string())],
        )
        .await?;

    rows.first().map(|row| row_to_paper(Some(row))).transpose()
}

/// Fetches a paper by its primary key.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such paper exists, or [`DbError`] on
/// a database failure.
pub async fn get_paper(db: &dyn Database, paper_id: i64) -> Result<PaperRow, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, external_id, url, title, authors, abstract_text, full_text, created_at
             FROM papers WHERE id = $1",
            &[DatabaseValue::Int64(paper_id)],
        )
        .await?;

    row_to_paper(rows.first())
}

/// Lazily populates `full_text` for a paper.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_full_text(db: &dyn Database, paper_id: i64, full_text: &str) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE papers SET full_text = $1 WHERE id = $2",
        &[
            DatabaseValue::String(full_text.to_string()),
            DatabaseValue::Int64(paper_id),
        ],
    )
    .await?;
    Ok(())
}

fn row_to_paper(row: Option<&switchy_database::Row>) -> Result<PaperRow, DbError> {
    let row = row.ok_or_else(|| DbError::NotFound {
        message: "paper not found".to_string(),
    })?;

    Ok(PaperRow {
        id: row.to_value("id").map_err(conv)?,
        external_id: row.to_value("external_id").map_err(conv)?,
        url: row.to_value("url").map_err(conv)?,
        title: row.to_value("title").map_err(conv)?,
        authors: row.to_value("authors").map_err(conv)?,
        abstract_text: row.to_value("abstract_text").map_err(conv)?,
        full_text: row.to_value("full_text").unwrap_or(None),
        created_at: row.to_value("created_at").map_err(conv)?,
    })
}

fn conv(e: impl std::fmt::Display) -> DbError {
    DbError::Conversion {
        message: e.to_string(),
    }
}
