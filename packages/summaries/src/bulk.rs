//! The bulk generation variant: a per-paper worker pool of bounded
//! fan-out, dispatching multiple prompts per paper in parallel, writing
//! per-user progress to the Job Registry.
//!
//! Built on a `futures::stream::iter(...).buffer_unordered(concurrency)`
//! pipeline so a slow or failing paper never blocks the rest of the
//! batch.

use futures::stream::{self, StreamExt as _};
use paperwright_jobs::JobRegistry;

use crate::SummaryError;

/// One unit of bulk work: a paper id paired with the prompt ids to
/// generate for it.
pub struct BulkItem {
    pub paper_id: i64,
    pub prompt_ids: Vec<i64>,
}

/// Result of processing one [`BulkItem`].
pub struct BulkItemResult {
    pub paper_id: i64,
    pub succeeded_prompt_ids: Vec<i64>,
    pub failed: Vec<(i64, String)>,
}

/// Runs `items` through `generate_one` with bounded fan-out, reporting
/// progress to `registry` under `user_id` as each item completes.
///
/// `generate_one` is given a `BulkItem` and returns one outcome per
/// requested prompt id; a per-prompt failure does not stop the other
/// prompts for that paper, nor the rest of the papers in the batch.
pub async fn run_bulk<F, Fut>(registry: &JobRegistry, user_id: i64, items: Vec<BulkItem>, concurrency: usize, generate_one: F) -> Vec<BulkItemResult>
where
    F: Fn(BulkItem) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = BulkItemResult> + Send,
{
    registry.start(user_id, items.len() as u64);

    let results: Vec<BulkItemResult> = stream::iter(items.into_iter().map(|item| {
        let fut = generate_one(item);
        async move { fut.await }
    }))
    .buffer_unordered(concurrency.max(1))
    .inspect(|result: &BulkItemResult| {
        registry.increment(user_id);
        if let Some((_, error)) = result.failed.first() {
            registry.record_error(user_id, error.clone());
        }
    })
    .collect()
    .await;

    registry.finish(user_id);
    results
}

/// Dispatches every prompt for a single paper in parallel, collecting
/// successes and failures independently so one bad prompt does not
/// abort the rest.
pub async fn dispatch_paper<F, Fut>(item: BulkItem, concurrency: usize, generate_prompt: F) -> BulkItemResult
where
    F: Fn(i64, i64) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(), SummaryError>> + Send,
{
    let paper_id = item.paper_id;
    let results: Vec<(i64, Result<(), SummaryError>)> = stream::iter(item.prompt_ids.into_iter().map(|prompt_id| {
        let fut = generate_prompt(paper_id, prompt_id);
        async move { (prompt_id, fut.await) }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    let mut succeeded_prompt_ids = Vec::new();
    let mut failed = Vec::new();
    for (prompt_id, outcome) in results {
        match outcome {
            Ok(()) => succeeded_prompt_ids.push(prompt_id),
            Err(e) => failed.push((prompt_id, e.to_string())),
        }
    }

    BulkItemResult {
        paper_id,
        succeeded_prompt_ids,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_bulk_reports_progress_for_every_item() {
        let registry = JobRegistry::new();
        let items = vec![
            BulkItem { paper_id: 1, prompt_ids: vec![10] },
            BulkItem { paper_id: 2, prompt_ids: vec![11] },
        ];

        let results = run_bulk(&registry, 7, items, 4, |item| async move {
            BulkItemResult {
                paper_id: item.paper_id,
                succeeded_prompt_ids: item.prompt_ids,
                failed: vec![],
            }
        })
        .await;

        assert_eq!(results.len(), 2);
        let status = registry.status(7);
        assert!(!status.is_running);
        assert_eq!(status.processed, 2);
        assert_eq!(status.total, 2);
    }

    #[tokio::test]
    async fn dispatch_paper_separates_successes_from_failures() {
        let item = BulkItem {
            paper_id: 1,
            prompt_ids: vec![10, 11],
        };

        let result = dispatch_paper(item, 4, |_paper_id, prompt_id| async move {
            if prompt_id == 11 {
                Err(SummaryError::Inconsistent("test"))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(result.succeeded_prompt_ids, vec![10]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0, 11);
    }
}
