//! User account queries.
//!
//! The HTTP surface trusts a pre-validated `Authorization: Bearer
//! <user_id>` header rather than owning a real auth backend, so the only
//! user-facing operation the core needs is "fetch this user, or lazily
//! create a bare row for an id seen for the first time."

use moosicbox_json_utils::database::ToValue as _;
use paperwright_database_models::UserRow;
use paperwright_models::Character;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Fetches a user by id, creating a bare default row if none exists yet.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_or_create(db: &dyn Database, user_id: i64) -> Result<UserRow, DbError> {
    if let Some(row) = get(db, user_id).await? {
        return Ok(row);
    }

    let rows = db
        .query_raw_params(
            "INSERT INTO users (id, display_name, points, selected_character, affinity_a, affinity_b)
             VALUES ($1, $2, 0, 'none', 0, 0)
             ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
             RETURNING id, display_name, points, selected_character, affinity_a, affinity_b",
            &[
                DatabaseValue::Int64(user_id),
                DatabaseValue::String(format!("user_{user_id}")),
            ],
        )
        .await?;

    row_to_user(rows.first().ok_or_else(|| DbError::Conversion {
        message: "get_or_create returned no row".to_string(),
    })?)
}

/// Fetches a user by id, if present.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get(db: &dyn Database, user_id: i64) -> Result<Option<UserRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, display_name, points, selected_character, affinity_a, affinity_b
             FROM users WHERE id = $1",
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;
    rows.first().map(row_to_user).transpose()
}

/// Updates a user's selected character.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_selected_character(db: &dyn Database, user_id: i64, character: Character) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE users SET selected_character = $1 WHERE id = $2",
        &[
            DatabaseValue::String(character.as_key_str().to_string()),
            DatabaseValue::Int64(user_id),
        ],
    )
    .await?;
    Ok(())
}

fn row_to_user(row: &switchy_database::Row) -> Result<UserRow, DbError> {
    let affinity_a: i32 = row.to_value("affinity_a").map_err(conv)?;
    let affinity_b: i32 = row.to_value("affinity_b").map_err(conv)?;
    Ok(UserRow {
        id: row.to_value("id").map_err(conv)?,
        display_name: row.to_value("display_name").map_err(conv)?,
        points: row.to_value("points").unwrap_or(0),
        selected_character: parse_character(&row.to_value::<String>("selected_character").map_err(conv)?),
        affinity_a: u8::try_from(affinity_a.clamp(0, u8::MAX.into())).unwrap_or(0),
        affinity_b: u8::try_from(affinity_b.clamp(0, u8::MAX.into())).unwrap_or(0),
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
