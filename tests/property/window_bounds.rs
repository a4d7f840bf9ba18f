//! Property-based tests for concurrency windows

use async_trait::async_trait;
use parking_lot::Mutex;
use proptest::prelude::*;
use quire::generator::{BlockProgress, ContentGenerator};
use quire::orchestrator::{Orchestrator, ProgressStatus};
use quire::types::{ContentBlockResult, FieldMap, GenerationRequest, GenerationResult};
use quire::GenerationError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct ConcurrencyMeter {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ContentGenerator for ConcurrencyMeter {
    async fn generate(
        &self,
        request: &GenerationRequest,
        _progress: &dyn BlockProgress,
    ) -> Result<GenerationResult, GenerationError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().push(request.section_type.clone());
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(GenerationResult::from_blocks(
            request.section_type.clone(),
            vec![ContentBlockResult::succeeded("body", FieldMap::new())],
        ))
    }
}

/// Never more than `limit` requests in flight, and every request runs exactly once.
#[test]
fn test_windows_respect_concurrency_limit() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(32));

    runner
        .run(&(0usize..12, 1usize..5), |(count, limit)| {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let meter = Arc::new(ConcurrencyMeter::default());
            let orchestrator = Orchestrator::new(meter.clone(), limit).unwrap();
            let requests: Vec<GenerationRequest> = (0..count)
                .map(|i| GenerationRequest::new(format!("section-{}", i), "fast"))
                .collect();

            let results = runtime.block_on(orchestrator.run(requests)).unwrap();

            prop_assert_eq!(results.len(), count);
            prop_assert_eq!(meter.calls.lock().len(), count);
            prop_assert!(meter.max_in_flight.load(Ordering::SeqCst) <= limit);
            if count > 0 {
                prop_assert_eq!(
                    meter.max_in_flight.load(Ordering::SeqCst),
                    limit.min(count)
                );
            }
            prop_assert!(orchestrator
                .progress()
                .values()
                .all(|entry| entry.status == ProgressStatus::Completed));
            Ok(())
        })
        .unwrap();
}
