//! Batch Orchestrator
//!
//! Runs generation requests in fixed-size concurrency windows. Windows run
//! strictly in input order; every request inside a window runs concurrently
//! and the next window starts only after all of them settle. Progress and
//! results are keyed by [`RequestId`], so each concurrent request only ever
//! writes its own entries.

use crate::error::GenerationError;
use crate::generator::{BlockProgress, ContentGenerator};
use crate::types::{GenerationRequest, GenerationResult, RequestId};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod events;
pub mod progress;

pub use events::{
    ChannelObserver, NoopObserver, OrchestratorEvent, OrchestratorEventKind, ProgressMap,
    ProgressObserver, ResultMap,
};
pub use progress::{BatchSummary, ProgressEntry, ProgressStatus};

/// Working set of the current batch, kept between runs to support retries.
#[derive(Debug, Default)]
struct BatchState {
    original_requests: Vec<(RequestId, GenerationRequest)>,
    progress: ProgressMap,
    results: ResultMap,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Orchestrator {
    generator: Arc<dyn ContentGenerator>,
    concurrency_limit: usize,
    request_timeout: Option<Duration>,
    observer: Arc<dyn ProgressObserver>,
    state: Mutex<BatchState>,
    running: AtomicBool,
}

impl Orchestrator {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        concurrency_limit: usize,
    ) -> Result<Self, GenerationError> {
        if concurrency_limit == 0 {
            return Err(GenerationError::InvalidBatch(
                "Concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            generator,
            concurrency_limit,
            request_timeout: Some(Self::DEFAULT_REQUEST_TIMEOUT),
            observer: Arc::new(NoopObserver),
            state: Mutex::new(BatchState::default()),
            running: AtomicBool::new(false),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Per-request timeout; `None` lets a request run indefinitely.
    pub fn with_request_timeout(mut self, request_timeout: Option<Duration>) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Run a new batch, replacing any previous batch state.
    pub async fn run(&self, requests: Vec<GenerationRequest>) -> Result<ResultMap, GenerationError> {
        if requests.is_empty() {
            debug!("Empty batch; nothing to generate");
            return Ok(ResultMap::new());
        }
        let _running = self.begin_batch()?;

        let entries: Vec<(RequestId, GenerationRequest)> = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| (RequestId::from_index(index), request))
            .collect();
        {
            let mut state = self.state.lock();
            state.progress = entries
                .iter()
                .map(|(id, _)| (*id, ProgressEntry::pending(*id)))
                .collect();
            state.results.clear();
            state.original_requests = entries.clone();
        }

        info!(
            total = entries.len(),
            concurrency_limit = self.concurrency_limit,
            "Generation batch started"
        );
        self.emit_progress();
        self.execute(&entries).await;
        Ok(self.finish())
    }

    /// Re-run only the requests whose last attempt failed, under their original ids.
    pub async fn retry_failed(&self) -> Result<ResultMap, GenerationError> {
        let failed: Vec<(RequestId, GenerationRequest)> = {
            let state = self.state.lock();
            state
                .original_requests
                .iter()
                .filter(|(id, _)| {
                    state
                        .progress
                        .get(id)
                        .is_some_and(|entry| entry.status == ProgressStatus::Error)
                })
                .cloned()
                .collect()
        };
        if failed.is_empty() {
            debug!("No failed requests to retry");
            return Ok(self.results());
        }
        let _running = self.begin_batch()?;

        {
            let mut state = self.state.lock();
            for (id, _) in &failed {
                state.progress.insert(*id, ProgressEntry::pending(*id));
                state.results.remove(id);
            }
        }

        info!(
            retrying = failed.len(),
            concurrency_limit = self.concurrency_limit,
            "Retrying failed requests"
        );
        self.emit_progress();
        self.execute(&failed).await;
        Ok(self.finish())
    }

    /// Clear all progress and results. In-flight work is not cancelled.
    pub fn reset(&self) {
        *self.state.lock() = BatchState::default();
        debug!("Orchestrator state reset");
    }

    pub fn progress(&self) -> ProgressMap {
        self.state.lock().progress.clone()
    }

    pub fn results(&self) -> ResultMap {
        self.state.lock().results.clone()
    }

    pub fn summary(&self) -> BatchSummary {
        self.state.lock().progress.values().collect()
    }

    fn begin_batch(&self) -> Result<RunningGuard<'_>, GenerationError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let err = GenerationError::BatchInProgress;
            warn!(error = %err, "Rejected batch submission");
            self.observer.on_error(&err);
            return Err(err);
        }
        Ok(RunningGuard(&self.running))
    }

    async fn execute(&self, entries: &[(RequestId, GenerationRequest)]) {
        let window_count = entries.len().div_ceil(self.concurrency_limit);
        for (window_index, window) in entries.chunks(self.concurrency_limit).enumerate() {
            let start = Instant::now();
            debug!(
                window = window_index + 1,
                windows = window_count,
                size = window.len(),
                "Window started"
            );
            join_all(
                window
                    .iter()
                    .map(|(id, request)| self.run_request(*id, request)),
            )
            .await;
            debug!(
                window = window_index + 1,
                windows = window_count,
                duration_ms = start.elapsed().as_millis(),
                "Window settled"
            );
        }
    }

    async fn run_request(&self, id: RequestId, request: &GenerationRequest) {
        self.update_entry(id, |entry| entry.mark_processing());

        let sink = EntryProgress {
            orchestrator: self,
            id,
        };
        let generation = self.generator.generate(request, &sink);
        let outcome = match self.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, generation).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GenerationError::Timeout(limit)),
            },
            None => generation.await,
        };

        match outcome {
            Ok(result) if result.success => {
                debug!(request_id = %id, section_type = %request.section_type, "Request completed");
                self.settle(id, result.clone(), |entry| entry.mark_completed(result));
            }
            Ok(result) => {
                let message = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Generation produced no content".to_string());
                warn!(request_id = %id, section_type = %request.section_type, error = %message, "Request failed");
                self.settle(id, result.clone(), |entry| entry.mark_failed(message, Some(result)));
            }
            Err(err) => {
                warn!(request_id = %id, section_type = %request.section_type, error = %err, "Request failed");
                let message = err.to_string();
                let result = GenerationResult::request_failed(request.section_type.clone(), message.clone());
                self.settle(id, result, |entry| entry.mark_failed(message, None));
            }
        }
    }

    fn update_entry(&self, id: RequestId, apply: impl FnOnce(&mut ProgressEntry) -> bool) {
        let changed = {
            let mut state = self.state.lock();
            state.progress.get_mut(&id).map(apply).unwrap_or(false)
        };
        if changed {
            self.emit_progress();
        }
    }

    fn settle(
        &self,
        id: RequestId,
        result: GenerationResult,
        apply: impl FnOnce(&mut ProgressEntry) -> bool,
    ) {
        let settled = {
            let mut state = self.state.lock();
            let settled = state.progress.get_mut(&id).and_then(|entry| {
                (apply(entry) && entry.status.is_settled()).then_some(entry.status)
            });
            if settled.is_some() {
                state.results.insert(id, result);
            }
            settled
        };
        if let Some(status) = settled {
            debug!(request_id = %id, status = status.as_str(), "Request settled");
            self.emit_progress();
        }
    }

    fn emit_progress(&self) {
        let snapshot = self.progress();
        self.observer.on_progress(&snapshot);
    }

    fn finish(&self) -> ResultMap {
        let results = self.results();
        let summary = self.summary();
        info!(
            total = summary.total,
            completed = summary.completed,
            failed = summary.failed,
            "Generation batch finished"
        );
        self.observer.on_complete(&results);
        results
    }
}

/// Records a request's block progress on its own entry.
struct EntryProgress<'a> {
    orchestrator: &'a Orchestrator,
    id: RequestId,
}

impl BlockProgress for EntryProgress<'_> {
    fn block_started(&self, block_name: &str, index: usize, total: usize) {
        self.orchestrator
            .update_entry(self.id, |entry| entry.mark_block(block_name, index, total));
    }
}
