//! Round scheduler: bounded fan-out of targets to fetch workers
//!
//! Every round is a batch. All targets of the working set are dispatched,
//! at most `concurrency` of them run at once, and the round only ends once
//! every target has reported an outcome.

use crate::crawler::worker::{FetchWorker, Outcome};
use crate::crawler::Target;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Dispatches one round and collects its outcomes
///
/// # Arguments
///
/// * `worker` - The fetch worker cloned into every task
/// * `targets` - The round's working set
/// * `concurrency` - Maximum number of targets in flight (at least 1)
///
/// # Returns
///
/// One outcome per target, index-aligned with `targets`
pub async fn dispatch_round(
    worker: &FetchWorker,
    targets: &[Target],
    concurrency: usize,
) -> Vec<Outcome> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = targets.len();
    let completed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::with_capacity(total);
    for target in targets.iter().cloned() {
        let worker = worker.clone();
        let semaphore = semaphore.clone();
        let completed = completed.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();

            let outcome = worker.fetch(&target).await;

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!("Progress: {}/{} targets processed", done, total);
            outcome
        }));
    }

    let mut outcomes = Vec::with_capacity(total);
    for (handle, target) in handles.into_iter().zip(targets) {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::error!("Worker task for {} did not finish: {}", target.url, e);
                outcomes.push(Outcome::failed(
                    &target.url,
                    format!("worker task failed: {}", e),
                ));
            }
        }
    }

    outcomes
}
