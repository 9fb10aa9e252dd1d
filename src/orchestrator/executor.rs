//! Parallel producer execution (§4.3 step 4, §5): each producer runs in its own task, guarded
//! by a shared "first error" slot for fail-fast short-circuiting, publishing results to a
//! bounded channel sized to the producer count so writers never block.

use crate::component::{BundleTypeTag, Producer, ProducerResult};
use crate::error::Error;
use crate::recipe::Recipe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// The fail-fast guard itself, pulled out of the task body so it can be unit-tested without any
/// concurrency: read-then-decide under one lock acquisition (property P5).
fn should_skip(fail_fast: bool, first_error: &Mutex<Option<Error>>) -> bool {
    fail_fast && first_error.lock().expect("first-error slot poisoned").is_some()
}

async fn run_one(
    producer: &dyn Producer,
    cancellation: CancellationToken,
    recipe: &Recipe,
    output_dir: &std::path::Path,
    tag: &str,
) -> ProducerResult {
    let start = Instant::now();

    if let Err(err) = producer.validate(cancellation.clone(), recipe).await {
        let mut result =
            ProducerResult::empty_failure(tag.to_string(), format!("validation failed: {}", err.message));
        result.duration = start.elapsed();
        return result;
    }

    let mut result = match producer.make(cancellation, recipe, output_dir).await {
        Ok(result) => result,
        // A producer errors rather than returning a failed result: substitute an empty one
        // tagged with the producer (§4.3 step 5).
        Err(err) => ProducerResult::empty_failure(tag.to_string(), err.message),
    };
    result.duration = start.elapsed();
    result
}

/// Runs every `(tag, producer)` pair in its own task against the shared `recipe`/`output_dir`,
/// honoring fail-fast short-circuiting of not-yet-started producers. Returns every produced
/// result; the order is unspecified (property P4/P5 only constrain *which* producers ran, not
/// the order of their results).
pub async fn run(
    fail_fast: bool,
    cancellation: CancellationToken,
    recipe: Arc<Recipe>,
    output_dir: Arc<PathBuf>,
    producers: Vec<(BundleTypeTag, Arc<dyn Producer>)>,
) -> Vec<ProducerResult> {
    let producer_count = producers.len().max(1);
    let (results_tx, mut results_rx) = tokio::sync::mpsc::channel::<ProducerResult>(producer_count);
    let first_error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));

    let mut handles = Vec::with_capacity(producers.len());
    for (tag, producer) in producers {
        let results_tx = results_tx.clone();
        let first_error = first_error.clone();
        let recipe = recipe.clone();
        let output_dir = output_dir.clone();
        let cancellation = cancellation.clone();

        handles.push(tokio::spawn(async move {
            // Read-then-skip is the fail-fast short-circuit: a producer that hasn't started yet
            // never starts once the slot is set (property P5). The spec tolerates producers
            // already in flight completing regardless (Design Notes §9).
            if should_skip(fail_fast, &first_error) {
                let mut result = ProducerResult::empty_failure(
                    tag.clone(),
                    "skipped: a prior producer failed under fail-fast",
                );
                result.duration = std::time::Duration::ZERO;
                let _ = results_tx.send(result).await;
                return;
            }

            let result = run_one(producer.as_ref(), cancellation, &recipe, &output_dir, &tag).await;
            if !result.success {
                let mut slot = first_error.lock().expect("first-error slot poisoned");
                if slot.is_none() {
                    let message = result
                        .errors
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "unknown producer error".to_string());
                    *slot = Some(Error::internal(format!("producer `{tag}` failed: {message}")));
                }
            }
            let _ = results_tx.send(result).await;
        }));
    }

    // Sentinel: once every producer task has finished (and with it, its own clone of the
    // sender), drop the last reference so the aggregator's recv loop terminates.
    drop(results_tx);
    for handle in handles {
        let _ = handle.await;
    }

    let mut results = Vec::new();
    while let Some(result) = results_rx.recv().await {
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::ComponentRefRecipe;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SucceedProducer;

    #[async_trait]
    impl Producer for SucceedProducer {
        async fn make(
            &self,
            _cancellation: CancellationToken,
            _recipe: &Recipe,
            _output_dir: &std::path::Path,
        ) -> crate::error::Result<ProducerResult> {
            let mut result = ProducerResult::new("ok");
            result.mark_success();
            Ok(result)
        }
    }

    struct FailProducer;

    #[async_trait]
    impl Producer for FailProducer {
        async fn make(
            &self,
            _cancellation: CancellationToken,
            _recipe: &Recipe,
            _output_dir: &std::path::Path,
        ) -> crate::error::Result<ProducerResult> {
            let mut result = ProducerResult::new("mock-fail");
            result.add_error("synthetic failure");
            result.mark_success();
            Ok(result)
        }
    }

    /// Records that it started, so a test can assert it never ran.
    struct CountingProducer {
        started: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Producer for CountingProducer {
        async fn make(
            &self,
            _cancellation: CancellationToken,
            _recipe: &Recipe,
            _output_dir: &std::path::Path,
        ) -> crate::error::Result<ProducerResult> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let mut result = ProducerResult::new("late");
            result.mark_success();
            Ok(result)
        }
    }

    fn recipe() -> Arc<Recipe> {
        Arc::new(Recipe::ComponentRef(ComponentRefRecipe::default()))
    }

    #[tokio::test]
    async fn scenario_s5_no_fail_fast_keeps_successes_and_failures() {
        let output_dir = Arc::new(PathBuf::from("/tmp"));
        let producers: Vec<(BundleTypeTag, Arc<dyn Producer>)> = vec![
            ("mock".to_string(), Arc::new(SucceedProducer)),
            ("mock-fail".to_string(), Arc::new(FailProducer)),
        ];
        let results = run(false, CancellationToken::new(), recipe(), output_dir, producers).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|r| r.success));
        assert!(results.iter().any(|r| !r.success && r.tag == "mock-fail"));
    }

    #[tokio::test]
    async fn scenario_s4_fail_fast_records_mock_fail_error() {
        let output_dir = Arc::new(PathBuf::from("/tmp"));
        let producers: Vec<(BundleTypeTag, Arc<dyn Producer>)> =
            vec![("mock-fail".to_string(), Arc::new(FailProducer))];
        let results = run(true, CancellationToken::new(), recipe(), output_dir, producers).await;
        assert!(results.iter().any(|r| !r.success && r.tag == "mock-fail"));
    }

    /// P5: once the first-error slot is set, a task that has not yet started its producer must
    /// skip it outright.
    #[test]
    fn property_p5_skip_guard_is_read_then_write_atomic() {
        let slot: Mutex<Option<Error>> = Mutex::new(None);
        assert!(!should_skip(true, &slot));
        assert!(!should_skip(false, &slot));

        *slot.lock().unwrap() = Some(Error::internal("producer `mock-fail` failed"));
        assert!(should_skip(true, &slot));
        // fail_fast disabled never skips, regardless of the slot.
        assert!(!should_skip(false, &slot));
    }

    #[tokio::test]
    async fn a_producer_that_never_fails_is_never_skipped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let output_dir = Arc::new(PathBuf::from("/tmp"));
        let producers: Vec<(BundleTypeTag, Arc<dyn Producer>)> = vec![(
            "late".to_string(),
            Arc::new(CountingProducer {
                started: counter.clone(),
            }),
        )];
        let _ = run(true, CancellationToken::new(), recipe(), output_dir, producers).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
