//! Summary generation queries — the data-access layer the Summary
//! Coordinator (`paperwright_summaries`) is built on.
//!
//! The coordinator treats a summary row's current state as the only source
//! of truth; these functions expose exactly the
//! primitives it needs: a conflict-detecting insert, a conditional update
//! gated on the placeholder's current generation number, and a conditional
//! delete. All of them rely on the table's unique index, never on an
//! in-process lock.

use moosicbox_json_utils::database::ToValue as _;
use paperwright_database_models::{CustomSummaryKey, CustomSummaryRow, DefaultSummaryKey, DefaultSummaryRow};
use paperwright_models::Character;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// The placeholder body prefix.
pub fn processing_body(n: u32) -> String {
    format!("[PROCESSING_{n}] summary generation in progress; please wait for completion.")
}

/// The placeholder `one_point` text for the same generation number.
pub fn processing_one_point(n: u32) -> String {
    format!("[PROCESSING_{n}] in progress...")
}

/// Parses the generation number `n` out of a `[PROCESSING_n] ...` body, if
/// the row is currently a placeholder.
#[must_use]
pub fn parse_processing_n(body: &str) -> Option<u32> {
    let rest = body.strip_prefix("[PROCESSING_")?;
    let end = rest.find(']')?;
    rest[..end].parse().ok()
}

fn character_str(c: Character) -> &'static str {
    c.as_key_str()
}

/// Attempts to insert a `PROCESSING_{n}` placeholder for a default-summary
/// key. Returns `Some(id)` if this caller won ownership (the insert
/// succeeded), `None` if a unique-index conflict occurred (a concurrent
/// owner already exists).
///
/// # Errors
///
/// Returns [`DbError`] for any failure other than a unique-index conflict.
pub async fn try_insert_default_processing(
    db: &dyn Database,
    key: &DefaultSummaryKey,
    n: u32,
) -> Result<Option<i64>, DbError> {
    let result = db
        .query_raw_params(
            "INSERT INTO default_summaries
                (paper_id, llm_provider, llm_model, character, affinity, body, one_point, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, now())
             ON CONFLICT (paper_id, llm_provider, llm_model, character, affinity) DO NOTHING
             RETURNING id",
            &[
                DatabaseValue::Int64(key.paper_id),
                DatabaseValue::String(key.llm_provider.clone()),
                DatabaseValue::String(key.llm_model.clone()),
                DatabaseValue::String(character_str(key.character).to_string()),
                DatabaseValue::Int32(i32::from(key.affinity)),
                DatabaseValue::String(processing_body(n)),
                DatabaseValue::String(processing_one_point(n)),
            ],
        )
        .await?;

    Ok(match result.first() {
        Some(row) => Some(row.to_value("id").map_err(conv)?),
        None => None,
    })
}

/// Same as [`try_insert_default_processing`] for the custom-summary table.
///
/// # Errors
///
/// Returns [`DbError`] for any failure other than a unique-index conflict.
pub async fn try_insert_custom_processing(
    db: &dyn Database,
    key: &CustomSummaryKey,
    n: u32,
) -> Result<Option<i64>, DbError> {
    let result = db
        .query_raw_params(
            "INSERT INTO custom_summaries
                (user_id, paper_id, prompt_id, llm_provider, llm_model, character, affinity,
                 body, one_point, prompt_updated_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
             ON CONFLICT (user_id, paper_id, prompt_id, llm_provider, llm_model, character, affinity)
                DO NOTHING
             RETURNING id",
            &[
                DatabaseValue::Int64(key.user_id),
                DatabaseValue::Int64(key.paper_id),
                DatabaseValue::Int64(key.prompt_id),
                DatabaseValue::String(key.llm_provider.clone()),
                DatabaseValue::String(key.llm_model.clone()),
                DatabaseValue::String(character_str(key.character).to_string()),
                DatabaseValue::Int32(i32::from(key.affinity)),
                DatabaseValue::String(processing_body(n)),
                DatabaseValue::String(processing_one_point(n)),
            ],
        )
        .await?;

    Ok(match result.first() {
        Some(row) => Some(row.to_value("id").map_err(conv)?),
        None => None,
    })
}

/// Fetches the current default-summary row for a key, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_default_summary(
    db: &dyn Database,
    key: &DefaultSummaryKey,
) -> Result<Option<DefaultSummaryRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, paper_id, llm_provider, llm_model, character, affinity, body, one_point, updated_at
             FROM default_summaries
             WHERE paper_id = $1 AND llm_provider = $2 AND llm_model = $3
                   AND character = $4 AND affinity = $5",
            &[
                DatabaseValue::Int64(key.paper_id),
                DatabaseValue::String(key.llm_provider.clone()),
                DatabaseValue::String(key.llm_model.clone()),
                DatabaseValue::String(character_str(key.character).to_string()),
                DatabaseValue::Int32(i32::from(key.affinity)),
            ],
        )
        .await?;

    rows.first().map(row_to_default).transpose()
}

/// Fetches the current custom-summary row for a key, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_custom_summary(
    db: &dyn Database,
    key: &CustomSummaryKey,
) -> Result<Option<CustomSummaryRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, user_id, paper_id, prompt_id, llm_provider, llm_model, character, affinity,
                    body, one_point, prompt_updated_at, updated_at
             FROM custom_summaries
             WHERE user_id = $1 AND paper_id = $2 AND prompt_id = $3 AND llm_provider = $4
                   AND llm_model = $5 AND character = $6 AND affinity = $7",
            &[
                DatabaseValue::Int64(key.user_id),
                DatabaseValue::Int64(key.paper_id),
                DatabaseValue::Int64(key.prompt_id),
                DatabaseValue::String(key.llm_provider.clone()),
                DatabaseValue::String(key.llm_model.clone()),
                DatabaseValue::String(character_str(key.character).to_string()),
                DatabaseValue::Int32(i32::from(key.affinity)),
            ],
        )
        .await?;

    rows.first().map(row_to_custom).transpose()
}

/// Fetches a default-summary row by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if absent, [`DbError`] otherwise.
pub async fn get_default_summary_by_id(db: &dyn Database, id: i64) -> Result<DefaultSummaryRow, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, paper_id, llm_provider, llm_model, character, affinity, body, one_point, updated_at
             FROM default_summaries WHERE id = $1",
            &[DatabaseValue::Int64(id)],
        )
        .await?;
    row_to_default(rows.first().ok_or_else(|| DbError::NotFound {
        message: format!("default summary {id} not found"),
    })?)
}

/// Fetches a custom-summary row by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if absent, [`DbError`] otherwise.
pub async fn get_custom_summary_by_id(db: &dyn Database, id: i64) -> Result<CustomSummaryRow, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, user_id, paper_id, prompt_id, llm_provider, llm_model, character, affinity,
                    body, one_point, prompt_updated_at, updated_at
             FROM custom_summaries WHERE id = $1",
            &[DatabaseValue::Int64(id)],
        )
        .await?;
    row_to_custom(rows.first().ok_or_else(|| DbError::NotFound {
        message: format!("custom summary {id} not found"),
    })?)
}

/// Conditionally bumps a default-summary placeholder from `expected_n` to
/// `new_n`. Returns `true` if the
/// write matched (this caller now owns generation `new_n`); `false` if the
/// row had already moved on (someone else won the race — the single
/// conditional `UPDATE` is what makes at most one escalator win).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn bump_default_n(db: &dyn Database, id: i64, expected_n: u32, new_n: u32) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "UPDATE default_summaries SET body = $1, one_point = $2
             WHERE id = $3 AND body = $4
             RETURNING id",
            &[
                DatabaseValue::String(processing_body(new_n)),
                DatabaseValue::String(processing_one_point(new_n)),
                DatabaseValue::Int64(id),
                DatabaseValue::String(processing_body(expected_n)),
            ],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Conditional bump for the custom-summary table. See [`bump_default_n`].
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn bump_custom_n(db: &dyn Database, id: i64, expected_n: u32, new_n: u32) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "UPDATE custom_summaries SET body = $1, one_point = $2
             WHERE id = $3 AND body = $4
             RETURNING id",
            &[
                DatabaseValue::String(processing_body(new_n)),
                DatabaseValue::String(processing_one_point(new_n)),
                DatabaseValue::Int64(id),
                DatabaseValue::String(processing_body(expected_n)),
            ],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Conditionally overwrites a default-summary placeholder with the final
/// body. Fails closed (returns `false`, does not
/// write) if the row no longer matches `expected_n` — this is how a
/// late-returning owner's stale result gets discarded.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
#[allow(clippy::too_many_arguments)]
pub async fn finalize_default(
    db: &dyn Database,
    id: i64,
    expected_n: u32,
    body: &str,
    one_point: &str,
    llm_provider: &str,
    llm_model: &str,
) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "UPDATE default_summaries
             SET body = $1, one_point = $2, llm_provider = $3, llm_model = $4, updated_at = now()
             WHERE id = $5 AND body = $6
             RETURNING id",
            &[
                DatabaseValue::String(body.to_string()),
                DatabaseValue::String(one_point.to_string()),
                DatabaseValue::String(llm_provider.to_string()),
                DatabaseValue::String(llm_model.to_string()),
                DatabaseValue::Int64(id),
                DatabaseValue::String(processing_body(expected_n)),
            ],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Conditional finalize for a custom summary; also stamps the
/// `prompt_updated_at` snapshot used by `requires_regeneration`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
#[allow(clippy::too_many_arguments)]
pub async fn finalize_custom(
    db: &dyn Database,
    id: i64,
    expected_n: u32,
    body: &str,
    one_point: &str,
    llm_provider: &str,
    llm_model: &str,
    prompt_updated_at: chrono::DateTime<chrono::Utc>,
) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "UPDATE custom_summaries
             SET body = $1, one_point = $2, llm_provider = $3, llm_model = $4,
                 prompt_updated_at = $5, updated_at = now()
             WHERE id = $6 AND body = $7
             RETURNING id",
            &[
                DatabaseValue::String(body.to_string()),
                DatabaseValue::String(one_point.to_string()),
                DatabaseValue::String(llm_provider.to_string()),
                DatabaseValue::String(llm_model.to_string()),
                DatabaseValue::DateTime(prompt_updated_at.naive_utc()),
                DatabaseValue::Int64(id),
                DatabaseValue::String(processing_body(expected_n)),
            ],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Unconditionally overwrites an already-`READY` default-summary row.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn overwrite_default_ready(
    db: &dyn Database,
    id: i64,
    body: &str,
    one_point: &str,
    llm_provider: &str,
    llm_model: &str,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE default_summaries
         SET body = $1, one_point = $2, llm_provider = $3, llm_model = $4, updated_at = now()
         WHERE id = $5",
        &[
            DatabaseValue::String(body.to_string()),
            DatabaseValue::String(one_point.to_string()),
            DatabaseValue::String(llm_provider.to_string()),
            DatabaseValue::String(llm_model.to_string()),
            DatabaseValue::Int64(id),
        ],
    )
    .await?;
    Ok(())
}

/// Unconditional overwrite for the custom-summary table. See
/// [`overwrite_default_ready`].
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn overwrite_custom_ready(
    db: &dyn Database,
    id: i64,
    body: &str,
    one_point: &str,
    llm_provider: &str,
    llm_model: &str,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE custom_summaries
         SET body = $1, one_point = $2, llm_provider = $3, llm_model = $4, updated_at = now()
         WHERE id = $5",
        &[
            DatabaseValue::String(body.to_string()),
            DatabaseValue::String(one_point.to_string()),
            DatabaseValue::String(llm_provider.to_string()),
            DatabaseValue::String(llm_model.to_string()),
            DatabaseValue::Int64(id),
        ],
    )
    .await?;
    Ok(())
}

/// Deletes a default-summary row, but only if it is still the placeholder
/// at `expected_n`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_default_processing(db: &dyn Database, id: i64, expected_n: u32) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "DELETE FROM default_summaries WHERE id = $1 AND body = $2 RETURNING id",
            &[
                DatabaseValue::Int64(id),
                DatabaseValue::String(processing_body(expected_n)),
            ],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Deletes a custom-summary row, but only if still the placeholder at
/// `expected_n`. See [`delete_default_processing`].
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_custom_processing(db: &dyn Database, id: i64, expected_n: u32) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "DELETE FROM custom_summaries WHERE id = $1 AND body = $2 RETURNING id",
            &[
                DatabaseValue::Int64(id),
                DatabaseValue::String(processing_body(expected_n)),
            ],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Lists all default summaries for a paper (used by the Selection Policy
/// and Tagging Pipeline to enumerate candidates).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_default_summaries_for_paper(
    db: &dyn Database,
    paper_id: i64,
) -> Result<Vec<DefaultSummaryRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, paper_id, llm_provider, llm_model, character, affinity, body, one_point, updated_at
             FROM default_summaries WHERE paper_id = $1",
            &[DatabaseValue::Int64(paper_id)],
        )
        .await?;
    rows.iter().map(row_to_default).collect()
}

/// Lists all custom summaries for a (user, paper) pair.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_custom_summaries_for_link(
    db: &dyn Database,
    user_id: i64,
    paper_id: i64,
) -> Result<Vec<CustomSummaryRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, user_id, paper_id, prompt_id, llm_provider, llm_model, character, affinity,
                    body, one_point, prompt_updated_at, updated_at
             FROM custom_summaries WHERE user_id = $1 AND paper_id = $2",
            &[DatabaseValue::Int64(user_id), DatabaseValue::Int64(paper_id)],
        )
        .await?;
    rows.iter().map(row_to_custom).collect()
}

fn row_to_default(row: &switchy_database::Row) -> Result<DefaultSummaryRow, DbError> {
    Ok(DefaultSummaryRow {
        id: row.to_value("id").map_err(conv)?,
        paper_id: row.to_value("paper_id").map_err(conv)?,
        llm_provider: row.to_value("llm_provider").map_err(conv)?,
        llm_model: row.to_value("llm_model").map_err(conv)?,
        character: parse_character(&row.to_value::<String>("character").map_err(conv)?),
        affinity: row
            .to_value::<i32>("affinity")
            .map_err(conv)?
            .clamp(0, 4)
            .unsigned_abs() as u8,
        body: row.to_value("body").map_err(conv)?,
        one_point: row.to_value("one_point").map_err(conv)?,
        updated_at: row.to_value("updated_at").map_err(conv)?,
    })
}

fn row_to_custom(row: &switchy_database::Row) -> Result<CustomSummaryRow, DbError> {
    Ok(CustomSummaryRow {
        id: row.to_value("id").map_err(conv)?,
        user_id: row.to_value("user_id").map_err(conv)?,
        paper_id: row.to_value("paper_id").map_err(conv)?,
        prompt_id: row.to_value("prompt_id").map_err(conv)?,
        llm_provider: row.to_value("llm_provider").map_err(conv)?,
        llm_model: row.to_value("llm_model").map_err(conv)?,
        character: parse_character(&row.to_value::<String>("character").map_err(conv)?),
        affinity: row
            .to_value::<i32>("affinity")
            .map_err(conv)?
            .clamp(0, 4)
            .unsigned_abs() as u8,
        body: row.to_value("body").map_err(conv)?,
        one_point: row.to_value("one_point").map_err(conv)?,
        prompt_updated_at: row.to_value("prompt_updated_at").map_err(conv)?,
        updated_at: row.to_value("updated_at").map_err(conv)?,
    })
}

fn parse_character(s: &str) -> Character {
    match s {
        "A" => Character::A,
        "B" => Character::B,
        _ => Character::None,
    }
}

fn conv(e: impl std::fmt::Display) -> DbError {
    DbError::Conversion {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_processing_n_round_trips_through_processing_body() {
        assert_eq!(parse_processing_n(&processing_body(1)), Some(1));
        assert_eq!(parse_processing_n(&processing_body(42)), Some(42));
    }

    #[test]
    fn parse_processing_n_rejects_ready_bodies() {
        assert_eq!(parse_processing_n("Diffusion models outperform GANs on FID."), None);
    }

    #[test]
    fn parse_processing_n_rejects_malformed_prefix() {
        assert_eq!(parse_processing_n("[PROCESSING_] missing number"), None);
        assert_eq!(parse_processing_n("[PROCESSING_abc] not a number"), None);
    }
}
