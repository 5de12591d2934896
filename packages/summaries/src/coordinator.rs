//! The acquisition/waiting/generation state machine, written once against a small [`SummaryTable`] trait and
//! instantiated for both the default- and custom-summary tables so the
//! protocol logic exists exactly once.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paperwright_database::DbError;
use paperwright_database::queries::summaries as q;
use paperwright_database_models::{CustomSummaryKey, CustomSummaryRow, DefaultSummaryKey, DefaultSummaryRow};
use paperwright_llm::gateway::{Gateway, InvokeOptions};
use paperwright_llm::providers::{Message, MessageContent};
use switchy_database::Database;

use crate::{POLL_INTERVAL, SummaryError, WAIT_TIMEOUT, extract_one_point};

/// Abstracts the two summary tables behind one generic key/row pair so the
/// acquisition/waiting/escalation engine (`run_to_ready`, below) is written
/// exactly once.
#[async_trait]
pub trait SummaryTable: Send + Sync {
    /// The table's uniqueness tuple.
    type Key: Clone + Send + Sync;
    /// The table's row type.
    type Row: Send + Sync;

    async fn get(db: &dyn Database, key: &Self::Key) -> Result<Option<Self::Row>, DbError>;
    async fn get_by_id(db: &dyn Database, id: i64) -> Result<Self::Row, DbError>;
    async fn try_insert_processing(db: &dyn Database, key: &Self::Key, n: u32) -> Result<Option<i64>, DbError>;
    async fn bump_n(db: &dyn Database, id: i64, expected_n: u32, new_n: u32) -> Result<bool, DbError>;
    async fn delete_processing(db: &dyn Database, id: i64, expected_n: u32) -> Result<bool, DbError>;

    /// `key` rewritten to address the row under a different
    /// provider/model.
    fn with_route(key: &Self::Key, provider: &str, model: &str) -> Self::Key;

    fn row_id(row: &Self::Row) -> i64;
    fn row_body(row: &Self::Row) -> &str;

    /// Writes the final body, conditioned on the placeholder's current
    /// generation number (fails closed if a later escalator already
    /// bumped it).
    async fn finalize(
        db: &dyn Database,
        id: i64,
        expected_n: u32,
        body: &str,
        one_point: &str,
        llm_provider: &str,
        llm_model: &str,
    ) -> Result<bool, DbError>;

    /// Unconditionally overwrites an already-`READY` row at `id` (used
    /// only by fallback reconciliation, which found a pre-existing ready
    /// row under the fallback's key).
    async fn overwrite_ready(
        db: &dyn Database,
        id: i64,
        body: &str,
        one_point: &str,
        llm_provider: &str,
        llm_model: &str,
    ) -> Result<(), DbError>;
}

/// Adapter for `default_summaries`.
pub struct DefaultTable;

#[async_trait]
impl SummaryTable for DefaultTable {
    type Key = DefaultSummaryKey;
    type Row = DefaultSummaryRow;

    async fn get(db: &dyn Database, key: &Self::Key) -> Result<Option<Self::Row>, DbError> {
        q::get_default_summary(db, key).await
    }

    async fn get_by_id(db: &dyn Database, id: i64) -> Result<Self::Row, DbError> {
        q::get_default_summary_by_id(db, id).await
    }

    async fn try_insert_processing(db: &dyn Database, key: &Self::Key, n: u32) -> Result<Option<i64>, DbError> {
        q::try_insert_default_processing(db, key, n).await
    }

    async fn bump_n(db: &dyn Database, id: i64, expected_n: u32, new_n: u32) -> Result<bool, DbError> {
        q::bump_default_n(db, id, expected_n, new_n).await
    }

    async fn delete_processing(db: &dyn Database, id: i64, expected_n: u32) -> Result<bool, DbError> {
        q::delete_default_processing(db, id, expected_n).await
    }

    fn with_route(key: &Self::Key, provider: &str, model: &str) -> Self::Key {
        DefaultSummaryKey {
            llm_provider: provider.to_string(),
            llm_model: model.to_string(),
            ..key.clone()
        }
    }

    fn row_id(row: &Self::Row) -> i64 {
        row.id
    }

    fn row_body(row: &Self::Row) -> &str {
        &row.body
    }

    async fn finalize(
        db: &dyn Database,
        id: i64,
        expected_n: u32,
        body: &str,
        one_point: &str,
        llm_provider: &str,
        llm_model: &str,
    ) -> Result<bool, DbError> {
        q::finalize_default(db, id, expected_n, body, one_point, llm_provider, llm_model).await
    }

    async fn overwrite_ready(
        db: &dyn Database,
        id: i64,
        body: &str,
        one_point: &str,
        llm_provider: &str,
        llm_model: &str,
    ) -> Result<(), DbError> {
        q::overwrite_default_ready(db, id, body, one_point, llm_provider, llm_model).await
    }
}

/// Adapter for `custom_summaries`. Finalization additionally stamps
/// `prompt_updated_at`; [`generate`] calls `queries::summaries::finalize_custom`
/// directly with the real snapshot whenever one is supplied, so
/// [`CustomTable::finalize`]'s own `Utc::now()` stand-in is only exercised
/// on paths that never carry a snapshot (there are none in practice —
/// every `CustomTable` caller supplies `prompt_snapshot`).
pub struct CustomTable;

#[async_trait]
impl SummaryTable for CustomTable {
    type Key = CustomSummaryKey;
    type Row = CustomSummaryRow;

    async fn get(db: &dyn Database, key: &Self::Key) -> Result<Option<Self::Row>, DbError> {
        q::get_custom_summary(db, key).await
    }

    async fn get_by_id(db: &dyn Database, id: i64) -> Result<Self::Row, DbError> {
        q::get_custom_summary_by_id(db, id).await
    }

    async fn try_insert_processing(db: &dyn Database, key: &Self::Key, n: u32) -> Result<Option<i64>, DbError> {
        q::try_insert_custom_processing(db, key, n).await
    }

    async fn bump_n(db: &dyn Database, id: i64, expected_n: u32, new_n: u32) -> Result<bool, DbError> {
        q::bump_custom_n(db, id, expected_n, new_n).await
    }

    async fn delete_processing(db: &dyn Database, id: i64, expected_n: u32) -> Result<bool, DbError> {
        q::delete_custom_processing(db, id, expected_n).await
    }

    fn with_route(key: &Self::Key, provider: &str, model: &str) -> Self::Key {
        CustomSummaryKey {
            llm_provider: provider.to_string(),
            llm_model: model.to_string(),
            ..key.clone()
        }
    }

    fn row_id(row: &Self::Row) -> i64 {
        row.id
    }

    fn row_body(row: &Self::Row) -> &str {
        &row.body
    }

    async fn finalize(
        db: &dyn Database,
        id: i64,
        expected_n: u32,
        body: &str,
        one_point: &str,
        llm_provider: &str,
        llm_model: &str,
    ) -> Result<bool, DbError> {
        // The plain trait method is used when there is no fresh prompt
        // snapshot available (e.g. from the generic escalation path);
        // `generate` calls `finalize_custom` directly with the snapshot
        // when one is available.
        q::finalize_custom(db, id, expected_n, body, one_point, llm_provider, llm_model, Utc::now()).await
    }

    async fn overwrite_ready(
        db: &dyn Database,
        id: i64,
        body: &str,
        one_point: &str,
        llm_provider: &str,
        llm_model: &str,
    ) -> Result<(), DbError> {
        q::overwrite_custom_ready(db, id, body, one_point, llm_provider, llm_model).await
    }
}

/// Outcome of driving a single key to readiness: either it was already
/// `READY` / became `READY` while we waited, or we ended up the owner
/// responsible for generating it.
pub enum Acquisition<Row> {
    Ready(Row),
    Owner { id: i64, n: u32 },
}

/// Reads the row, and either returns it (`READY`), becomes the owner
/// (row was `ABSENT`), or falls through to the waiting protocol (row is
/// `PROCESSING`).
///
/// # Errors
///
/// Returns [`SummaryError`] on database failure or protocol inconsistency.
pub async fn acquire<T: SummaryTable>(db: &dyn Database, key: &T::Key) -> Result<Acquisition<T::Row>, SummaryError> {
    match T::get(db, key).await? {
        Some(row) => match q::parse_processing_n(T::row_body(&row)) {
            None => Ok(Acquisition::Ready(row)),
            Some(n) => wait_for_ready::<T>(db, key, T::row_id(&row), n).await,
        },
        None => match T::try_insert_processing(db, key, 1).await? {
            Some(id) => Ok(Acquisition::Owner { id, n: 1 }),
            None => {
                // Lost the insert race; the winner's row is now readable.
                let row = T::get(db, key).await?.ok_or(SummaryError::Inconsistent("acquire"))?;
                match q::parse_processing_n(T::row_body(&row)) {
                    None => Ok(Acquisition::Ready(row)),
                    Some(n) => wait_for_ready::<T>(db, key, T::row_id(&row), n).await,
                }
            }
        },
    }
}

/// Polls every [`POLL_INTERVAL`] until [`WAIT_TIMEOUT`] elapses without
/// progress, handling the row becoming `READY`, its
/// generation number advancing (another waiter restarted — reset our own
/// deadline), and the row disappearing (insert a safe-number placeholder
/// and become the new owner). On timeout, escalate: bump `n` by one in a
/// single conditional write: whichever waiter's write lands first becomes
/// the new owner, everyone else simply keeps waiting on the bumped number.
///
/// # Errors
///
/// Returns [`SummaryError`] on database failure or protocol inconsistency.
async fn wait_for_ready<T: SummaryTable>(
    db: &dyn Database,
    key: &T::Key,
    mut id: i64,
    mut n: u32,
) -> Result<Acquisition<T::Row>, SummaryError> {
    let max_polls = (WAIT_TIMEOUT.as_secs() / POLL_INTERVAL.as_secs().max(1)).max(1) as u32;
    let mut polls_since_progress = 0u32;

    loop {
        tokio::time::sleep(POLL_INTERVAL).await;

        match T::get_by_id(db, id).await {
            Ok(row) => match q::parse_processing_n(T::row_body(&row)) {
                None => return Ok(Acquisition::Ready(row)),
                Some(m) if m > n => {
                    n = m;
                    polls_since_progress = 0;
                    continue;
                }
                Some(_) => {}
            },
            Err(DbError::NotFound { .. }) => {
                let safe_n = (n + 100).max(101);
                match T::try_insert_processing(db, key, safe_n).await? {
                    Some(new_id) => return Ok(Acquisition::Owner { id: new_id, n: safe_n }),
                    None => {
                        let row = T::get(db, key).await?.ok_or(SummaryError::Inconsistent("wait_for_ready"))?;
                        id = T::row_id(&row);
                        n = q::parse_processing_n(T::row_body(&row)).unwrap_or(1);
                        polls_since_progress = 0;
                        continue;
                    }
                }
            }
            Err(e) => return Err(e.into()),
        }

        polls_since_progress += 1;
        if polls_since_progress >= max_polls {
            if T::bump_n(db, id, n, n + 1).await? {
                return Ok(Acquisition::Owner { id, n: n + 1 });
            }
            // Someone else's write landed first; re-read and keep going —
            // either they finished (READY) or we resume waiting on their
            // bumped n.
            let row = T::get_by_id(db, id).await?;
            match q::parse_processing_n(T::row_body(&row)) {
                None => return Ok(Acquisition::Ready(row)),
                Some(m) => {
                    n = m;
                    polls_since_progress = 0;
                }
            }
        }
    }
}

/// The owner invokes the Gateway, finalizes the row, and handles both
/// total failure (row deleted, `ABSENT` again) and fallback
/// reconciliation.
///
/// `finalize_with_prompt_snapshot` lets the custom-summary caller pass the
/// prompt's current `updated_at` for the `requires_regeneration` snapshot;
/// default summaries pass `None`.
///
/// # Errors
///
/// Returns [`SummaryError::Generation`] if the Gateway exhausts every
/// route, or [`SummaryError::Database`] on a database failure.
#[allow(clippy::too_many_arguments)]
pub async fn generate<T: SummaryTable>(
    db: &dyn Database,
    gateway: &Gateway,
    key: &T::Key,
    id: i64,
    n: u32,
    system_prompt: &str,
    user_content: &str,
    invoke_options: &InvokeOptions,
    prompt_snapshot: Option<DateTime<Utc>>,
) -> Result<T::Row, SummaryError> {
    let messages = [Message {
        role: "user".to_string(),
        content: MessageContent::Text(user_content.to_string()),
    }];

    let outcome = match gateway.invoke(system_prompt, &messages, &[], invoke_options, |_| Ok(())).await {
        Ok(outcome) => outcome,
        Err(e) => {
            T::delete_processing(db, id, n).await?;
            return Err(e.into());
        }
    };

    let body = outcome.response.text();
    let one_point = extract_one_point(&body);

    if outcome.route.used_fallback {
        let alt_key = T::with_route(key, &outcome.route.provider, &outcome.route.model);
        if let Some(alt_row) = T::get(db, &alt_key).await? {
            T::overwrite_ready(
                db,
                T::row_id(&alt_row),
                &body,
                &one_point,
                &outcome.route.provider,
                &outcome.route.model,
            )
            .await?;
            T::delete_processing(db, id, n).await?;
            return T::get_by_id(db, T::row_id(&alt_row)).await.map_err(Into::into);
        }
    }

    let finalized = if let Some(snapshot) = prompt_snapshot {
        q::finalize_custom(db, id, n, &body, &one_point, &outcome.route.provider, &outcome.route.model, snapshot).await?
    } else {
        T::finalize(db, id, n, &body, &one_point, &outcome.route.provider, &outcome.route.model).await?
    };

    if finalized {
        T::get_by_id(db, id).await.map_err(Into::into)
    } else {
        // A late-returning owner after an escalator already bumped past
        // us: our result is discarded and we report
        // whatever is currently there, re-joining as a waiter if it is
        // still processing.
        match T::get_by_id(db, id).await {
            Ok(row) => match q::parse_processing_n(T::row_body(&row)) {
                None => Ok(row),
                Some(m) => match wait_for_ready::<T>(db, key, id, m).await? {
                    Acquisition::Ready(row) => Ok(row),
                    Acquisition::Owner { id, n } => {
                        // We escalated again; recurse once more with a
                        // fresh generation attempt using the same prompt.
                        Box::pin(generate::<T>(
                            db,
                            gateway,
                            key,
                            id,
                            n,
                            system_prompt,
                            user_content,
                            invoke_options,
                            prompt_snapshot,
                        ))
                        .await
                    }
                },
            },
            Err(e) => Err(e.into()),
        }
    }
}

/// Drives a single key through acquisition, waiting, and (if this caller
/// ends up the owner) generation, returning the final `READY` row.
///
/// # Errors
///
/// Returns [`SummaryError`] if the database fails or the Gateway exhausts
/// every route.
#[allow(clippy::too_many_arguments)]
pub async fn ensure_ready<T: SummaryTable>(
    db: &dyn Database,
    gateway: &Gateway,
    key: &T::Key,
    system_prompt: &str,
    user_content: &str,
    invoke_options: &InvokeOptions,
    prompt_snapshot: Option<DateTime<Utc>>,
) -> Result<T::Row, SummaryError> {
    match acquire::<T>(db, key).await? {
        Acquisition::Ready(row) => Ok(row),
        Acquisition::Owner { id, n } => {
            generate::<T>(db, gateway, key, id, n, system_prompt, user_content, invoke_options, prompt_snapshot).await
        }
    }
}

/// The outcome of a dual-generation request: the character=none row plus
/// the character=selected row, when the user has a character selected.
pub struct DualOutcome<Row> {
    pub none: Row,
    pub selected: Option<Row>,
}

/// Runs the character=none and character=selected acquisitions
/// concurrently. If the user has no
/// character selected, the two keys are identical and only one acquisition
/// actually runs.
///
/// # Errors
///
/// Returns [`SummaryError`] if either branch fails.
#[allow(clippy::too_many_arguments)]
pub async fn ensure_ready_dual<T: SummaryTable>(
    db: &dyn Database,
    gateway: &Gateway,
    key_none: &T::Key,
    key_selected: Option<&T::Key>,
    system_prompt_none: &str,
    system_prompt_selected: Option<&str>,
    user_content: &str,
    invoke_options: &InvokeOptions,
    prompt_snapshot: Option<DateTime<Utc>>,
) -> Result<DualOutcome<T::Row>, SummaryError> {
    let Some(key_selected) = key_selected else {
        let row = ensure_ready::<T>(db, gateway, key_none, system_prompt_none, user_content, invoke_options, prompt_snapshot)
            .await?;
        return Ok(DualOutcome { none: row, selected: None });
    };
    let system_prompt_selected = system_prompt_selected.unwrap_or(system_prompt_none);

    let (none_result, selected_result) = tokio::join!(
        ensure_ready::<T>(db, gateway, key_none, system_prompt_none, user_content, invoke_options, prompt_snapshot),
        ensure_ready::<T>(db, gateway, key_selected, system_prompt_selected, user_content, invoke_options, prompt_snapshot),
    );

    Ok(DualOutcome {
        none: none_result?,
        selected: Some(selected_result?),
    })
}

/// Per-call timeout the waiting protocol itself does not bound (the
/// Gateway's `InvokeOptions::timeout` governs individual LLM calls; this
/// constant exists only so callers composing a top-level deadline for the
/// whole `ensure_ready_dual` call have a sane default to add on top of it).
pub const OWNER_GENERATION_BUDGET: Duration = Duration::from_secs(600);
