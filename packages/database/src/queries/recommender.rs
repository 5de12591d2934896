//! Queries backing the Recommender (`paperwright_recommender`). The
//! recommender itself owns the cosine-similarity scoring; this module
//! only resolves which paper ids belong to each tag bucket.

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Returns up to `limit` newest paper ids tagged with `tag` for a user,
/// newest-accessed first.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn paper_ids_with_tag(db: &dyn Database, user_id: i64, tag: &str, limit: u32) -> Result<Vec<i64>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT paper_id FROM user_paper_links
             WHERE user_id = $1 AND (',' || tags || ',') LIKE $2
             ORDER BY last_accessed DESC
             LIMIT $3",
            &[
                DatabaseValue::Int64(user_id),
                DatabaseValue::String(format!("%,{tag},%")),
                DatabaseValue::Int64(i64::from(limit)),
            ],
        )
        .await?;

    rows.iter()
        .map(|r| r.to_value("paper_id").map_err(|e| DbError::Conversion { message: e.to_string() }))
        .collect()
}

/// Returns candidate (link_id, paper_id) pairs for a user: papers with
/// none of the recommender's level tags set.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn candidate_links(db: &dyn Database, user_id: i64) -> Result<Vec<(i64, i64)>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, paper_id FROM user_paper_links
             WHERE user_id = $1
               AND (',' || tags || ',') NOT LIKE '%,Favourite,%'
               AND (',' || tags || ',') NOT LIKE '%,NotInterested,%'
               AND (',' || tags || ',') NOT LIKE '%,Recommended,%'",
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;

    rows.iter()
        .map(|r| {
            Ok((
                r.to_value("id").map_err(|e| DbError::Conversion { message: e.to_string() })?,
                r.to_value("paper_id").map_err(|e| DbError::Conversion { message: e.to_string() })?,
            ))
        })
        .collect()
}

/// Counts links already tagged "Recommended" for a user (needed to compute
/// `5 - existing_recommended_count`).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn recommended_count(db: &dyn Database, user_id: i64) -> Result<u32, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT COUNT(*) as cnt FROM user_paper_links
             WHERE user_id = $1 AND (',' || tags || ',') LIKE '%,Recommended,%'",
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;
    let cnt: i64 = rows
        .first()
        .map_or(0, |r| r.to_value("cnt").unwrap_or(0));
    Ok(u32::try_from(cnt).unwrap_or(0))
}

/// Appends `tag` to a link's comma-separated tag set, if not already
/// present.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn add_tag(db: &dyn Database, link_id: i64, tag: &str) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE user_paper_links
         SET tags = CASE
             WHEN (',' || tags || ',') LIKE $1 THEN tags
             WHEN tags = '' THEN $2
             ELSE tags || ',' || $2
         END
         WHERE id = $3",
        &[
            DatabaseValue::String(format!("%,{tag},%")),
            DatabaseValue::String(tag.to_string()),
            DatabaseValue::Int64(link_id),
        ],
    )
    .await?;
    Ok(())
}
