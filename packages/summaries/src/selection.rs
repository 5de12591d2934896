//! The Selection Policy: chooses which
//! stored summary a `UserPaperLink` should point at, given every summary
//! row for the (user, paper) pair and the user's current character.

use paperwright_database_models::{CustomSummaryRow, DefaultSummaryRow};
use paperwright_models::Character;

/// Invocation mode: affects tie-breaking preference, not
/// the base score formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// After first ingest — pick globally.
    Initial,
    /// User clicked "regenerate" on the detail page — prefer staying in
    /// the same custom/default lane as the summary currently displayed.
    RegenerateDetail,
    /// User triggered regeneration from the add flow — pick globally.
    RegenerateAdd,
}

/// One scoreable candidate: either a default or a custom summary.
pub enum Candidate {
    Default(DefaultSummaryRow),
    Custom(CustomSummaryRow),
}

impl Candidate {
    fn character(&self) -> Character {
        match self {
            Self::Default(row) => row.character,
            Self::Custom(row) => row.character,
        }
    }

    fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            Self::Default(row) => row.updated_at,
            Self::Custom(row) => row.updated_at,
        }
    }

    fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

/// Scores one candidate against the user's selected character.
#[must_use]
pub fn score(candidate: &Candidate, selected_character: Character) -> i64 {
    let mut score = 0i64;
    if candidate.is_custom() {
        score += 1000;
    }
    score += match (candidate.character(), selected_character) {
        (Character::None, _) => 0,
        (character, selected) if character == selected => 200,
        (_, Character::None) => 100,
        _ => -50,
    };
    score
}

/// What the `UserPaperLink` should be updated to point at: exactly one of
/// (default_summary, null) or (null, custom_summary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Default(i64),
    Custom(i64),
}

/// Picks the best candidate from `candidates` for `selected_character`
/// under `mode`.
///
/// In [`SelectionMode::RegenerateDetail`], `current` (the summary
/// currently displayed, if any) biases the outcome toward staying within
/// the same custom/default lane: candidates in the other lane are scored
/// normally but only chosen if no same-lane candidate exists, since a
/// user who clicked "regenerate" on a custom-prompt summary expects to
/// stay looking at a custom-prompt summary.
///
/// Returns `None` if `candidates` is empty.
#[must_use]
pub fn select(candidates: &[Candidate], selected_character: Character, mode: SelectionMode, current: Option<Selection>) -> Option<Selection> {
    if candidates.is_empty() {
        return None;
    }

    let prefer_custom_lane = matches!(mode, SelectionMode::RegenerateDetail)
        && matches!(current, Some(Selection::Custom(_)));
    let prefer_default_lane = matches!(mode, SelectionMode::RegenerateDetail)
        && matches!(current, Some(Selection::Default(_)));

    let lane_filtered: Vec<&Candidate> = if prefer_custom_lane {
        let custom_only: Vec<&Candidate> = candidates.iter().filter(|c| c.is_custom()).collect();
        if custom_only.is_empty() { candidates.iter().collect() } else { custom_only }
    } else if prefer_default_lane {
        let default_only: Vec<&Candidate> = candidates.iter().filter(|c| !c.is_custom()).collect();
        if default_only.is_empty() { candidates.iter().collect() } else { default_only }
    } else {
        candidates.iter().collect()
    };

    let best = lane_filtered.into_iter().max_by(|a, b| {
        let score_a = score(a, selected_character);
        let score_b = score(b, selected_character);
        score_a.cmp(&score_b).then_with(|| a.created_at().cmp(&b.created_at()))
    })?;

    Some(match best {
        Candidate::Default(row) => Selection::Default(row.id),
        Candidate::Custom(row) => Selection::Custom(row.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn default_row(id: i64, character: Character, updated_at: chrono::DateTime<Utc>) -> DefaultSummaryRow {
        DefaultSummaryRow {
            id,
            paper_id: 1,
            llm_provider: "anthropic".to_string(),
            llm_model: "claude".to_string(),
            character,
            affinity: 0,
            body: "ready".to_string(),
            one_point: "one point".to_string(),
            updated_at,
        }
    }

    fn custom_row(id: i64, character: Character, updated_at: chrono::DateTime<Utc>) -> CustomSummaryRow {
        CustomSummaryRow {
            id,
            user_id: 1,
            paper_id: 1,
            prompt_id: 5,
            llm_provider: "anthropic".to_string(),
            llm_model: "claude".to_string(),
            character,
            affinity: 0,
            body: "ready".to_string(),
            one_point: "one point".to_string(),
            prompt_updated_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn custom_beats_default_even_with_character_mismatch() {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let candidates = vec![
            Candidate::Default(default_row(1, Character::A, t)),
            Candidate::Custom(custom_row(2, Character::B, t)),
        ];
        let result = select(&candidates, Character::A, SelectionMode::Initial, None);
        assert_eq!(result, Some(Selection::Custom(2)));
    }

    #[test]
    fn character_match_beats_character_absent() {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let candidates = vec![
            Candidate::Default(default_row(1, Character::None, t)),
            Candidate::Default(default_row(2, Character::A, t)),
        ];
        let result = select(&candidates, Character::A, SelectionMode::Initial, None);
        assert_eq!(result, Some(Selection::Default(2)));
    }

    #[test]
    fn regenerate_detail_prefers_current_lane() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let candidates = vec![
            Candidate::Custom(custom_row(1, Character::None, earlier)),
            Candidate::Default(default_row(2, Character::A, later)),
        ];
        let result = select(
            &candidates,
            Character::A,
            SelectionMode::RegenerateDetail,
            Some(Selection::Custom(99)),
        );
        assert_eq!(result, Some(Selection::Custom(1)));
    }

    #[test]
    fn ties_broken_by_newer_created_at() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let candidates = vec![
            Candidate::Default(default_row(1, Character::None, earlier)),
            Candidate::Default(default_row(2, Character::None, later)),
        ];
        let result = select(&candidates, Character::None, SelectionMode::Initial, None);
        assert_eq!(result, Some(Selection::Default(2)));
    }
}
