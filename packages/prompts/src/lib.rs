#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The Prompt Resolver.
//!
//! Resolves `(prompt_type, user_id, optional prompt_id)` to an effective
//! prompt body, applies `{today}`/`{name}`/caller placeholder
//! substitution, and — for prompt types that support it — prepends the
//! user's selected character persona ahead of a separator.
//!
//! Resolution is a two-tier lookup: an owned custom prompt if one is
//! named and active, else the built-in default. Built-in prompt bodies
//! are themselves seeded rows (`owner_user_id IS NULL`) rather than
//! constants in this crate, keeping every default prompt body in one
//! place and customizable per-user via the database rather than
//! redeployment.

use std::collections::HashMap;

use chrono::Utc;
use paperwright_database::DbError;
use paperwright_database::queries::prompts;
use paperwright_models::{Character, PromptType};
use switchy_database::Database;
use thiserror::Error;

/// Errors from prompt resolution.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] DbError),
}

/// The result of resolving a prompt.
#[derive(Debug, Clone)]
pub struct ResolvedPrompt {
    /// Final prompt body, after placeholder substitution and any
    /// character-persona prepend.
    pub body: String,
    /// `true` if a user-owned custom prompt was used instead of the
    /// built-in default.
    pub is_custom: bool,
    /// Id of the prompt row that supplied the base body (before
    /// substitution/persona prepend).
    pub source_prompt_id: i64,
    /// `updated_at` of the source prompt row, used by callers to decide
    /// whether a stored summary needs regeneration.
    pub source_updated_at: chrono::DateTime<Utc>,
}

/// Separator emitted between a prepended character persona and the base
/// prompt.
const CHARACTER_SEPARATOR: &str = "\n\n---\n\n";

/// Resolves the effective prompt for `prompt_type`.
///
/// `prompt_id`, if given, is only honored when it names a prompt owned
/// by `user_id` and marked active; otherwise resolution falls back to
/// the built-in default.
///
/// `placeholders` supplies caller-specific substitutions (e.g. `query`,
/// `documents`, `summary`) beyond the always-available `{today}` and
/// `{name}`. Placeholders absent from the template, or present in the
/// template but not supplied here, are left untouched rather than
/// raising.
///
/// # Errors
///
/// Returns [`PromptError`] if no built-in default exists for
/// `prompt_type` or the database is unreachable.
pub async fn resolve(
    db: &dyn Database,
    prompt_type: PromptType,
    user_id: i64,
    prompt_id: Option<i64>,
    character: Character,
    user_display_name: &str,
    placeholders: &HashMap<String, String>,
) -> Result<ResolvedPrompt, PromptError> {
    let type_key = prompt_type.to_string();

    let (base_body, is_custom, source_prompt_id, source_updated_at) = match prompt_id {
        Some(pid) => match prompts::get_owned_active_prompt(db, pid, user_id).await? {
            Some(p) => (p.body, true, p.id, p.updated_at),
            None => {
                let p = prompts::get_default_prompt(db, &type_key).await?;
                (p.body, false, p.id, p.updated_at)
            }
        },
        None => {
            let p = prompts::get_default_prompt(db, &type_key).await?;
            (p.body, false, p.id, p.updated_at)
        }
    };

    let substituted = substitute(&base_body, user_display_name, placeholders);

    let body = if prompt_type.supports_character() && character != Character::None {
        match prompts::get_default_prompt(db, &character_persona_type(character)).await {
            Ok(persona) => format!("{}{CHARACTER_SEPARATOR}{substituted}", persona.body),
            Err(DbError::NotFound { .. }) => substituted,
            Err(e) => return Err(e.into()),
        }
    } else {
        substituted
    };

    Ok(ResolvedPrompt {
        body,
        is_custom,
        source_prompt_id,
        source_updated_at,
    })
}

/// Prompt-type key used to look up a character's persona prompt.
fn character_persona_type(character: Character) -> String {
    format!("character_persona_{}", character.as_key_str())
}

/// Applies `{today}`, `{name}`, and caller placeholders. Unknown
/// `{...}` tokens in the template are left as-is.
fn substitute(template: &str, user_display_name: &str, placeholders: &HashMap<String, String>) -> String {
    let mut out = template.replace("{today}", &Utc::now().format("%Y-%m-%d").to_string());
    out = out.replace("{name}", user_display_name);
    for (key, value) in placeholders {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_leaves_unknown_placeholders_literal() {
        let placeholders = HashMap::from([("query".to_string(), "model X vs model Y".to_string())]);
        let result = substitute("Q: {query} — see {unresolved}", "Ada", &placeholders);
        assert_eq!(result, "Q: model X vs model Y — see {unresolved}");
    }

    #[test]
    fn substitute_fills_today_and_name() {
        let result = substitute("Hello {name}, today is {today}.", "Ada", &HashMap::new());
        assert!(result.starts_with("Hello Ada, today is "));
        assert!(!result.contains("{name}"));
        assert!(!result.contains("{today}"));
    }
}
