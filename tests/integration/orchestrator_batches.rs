//! Batch orchestration through the public API

use async_trait::async_trait;
use parking_lot::Mutex;
use quire::generator::{BlockProgress, ContentGenerator};
use quire::orchestrator::{
    ChannelObserver, Orchestrator, OrchestratorEventKind, ProgressStatus,
};
use quire::types::{ContentBlockResult, FieldMap, GenerationRequest, GenerationResult, RequestId};
use quire::GenerationError;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Records how many requests had settled when each request started.
struct WindowRecorder {
    settled: AtomicUsize,
    started_after: Mutex<Vec<(String, usize)>>,
    attempts: Mutex<HashMap<String, usize>>,
    fail_first_attempts: usize,
    failing: Vec<String>,
}

impl WindowRecorder {
    fn new(failing: &[&str], fail_first_attempts: usize) -> Self {
        Self {
            settled: AtomicUsize::new(0),
            started_after: Mutex::new(Vec::new()),
            attempts: Mutex::new(HashMap::new()),
            fail_first_attempts,
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ContentGenerator for WindowRecorder {
    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn BlockProgress,
    ) -> Result<GenerationResult, GenerationError> {
        let name = request.section_type.clone();
        self.started_after
            .lock()
            .push((name.clone(), self.settled.load(Ordering::SeqCst)));
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(name.clone()).or_insert(0);
            *count += 1;
            *count
        };

        for (index, block) in request.requested_blocks.iter().enumerate() {
            progress.block_started(block, index, request.requested_blocks.len());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.settled.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(&name) && attempt <= self.fail_first_attempts {
            return Err(GenerationError::ProviderRequestFailed(format!(
                "{} attempt {} failed",
                name, attempt
            )));
        }

        let mut fields = FieldMap::new();
        fields.insert("attempt".to_string(), json!(attempt));
        Ok(GenerationResult::from_blocks(
            name,
            vec![ContentBlockResult::succeeded("body", fields)],
        ))
    }
}

fn batch(names: &[&str]) -> Vec<GenerationRequest> {
    names
        .iter()
        .map(|name| GenerationRequest::new(*name, "fast").with_blocks(["intro", "body"]))
        .collect()
}

#[tokio::test]
async fn five_requests_with_limit_two_run_as_two_two_one() {
    let recorder = Arc::new(WindowRecorder::new(&[], 0));
    let orchestrator = Orchestrator::new(recorder.clone(), 2).unwrap();

    let results = orchestrator
        .run(batch(&["a", "b", "c", "d", "e"]))
        .await
        .unwrap();

    assert_eq!(results.len(), 5);
    let started_after: Vec<usize> = recorder
        .started_after
        .lock()
        .iter()
        .map(|(_, settled)| *settled)
        .collect();
    assert_eq!(started_after, vec![0, 0, 2, 2, 4]);

    let ids: Vec<RequestId> = results.keys().copied().collect();
    assert_eq!(ids, (0..5).map(RequestId::from_index).collect::<Vec<_>>());
    assert_eq!(results[&RequestId::from_index(3)].section_type, "d");
}

#[tokio::test]
async fn observer_sees_block_progress_and_one_completion() {
    let recorder = Arc::new(WindowRecorder::new(&[], 0));
    let (observer, events) = ChannelObserver::new_pair();
    let orchestrator = Orchestrator::new(recorder, 3)
        .unwrap()
        .with_observer(Arc::new(observer));

    orchestrator.run(batch(&["a", "b"])).await.unwrap();

    let events: Vec<_> = events.try_iter().collect();
    assert!(events.windows(2).all(|pair| pair[1].seq == pair[0].seq + 1));
    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(OrchestratorEventKind::Completed(results)) if results.len() == 2
    ));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e.kind, OrchestratorEventKind::Completed(_)))
            .count(),
        1
    );

    let id = RequestId::from_index(0);
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|event| match &event.kind {
            OrchestratorEventKind::Progress(progress) => Some(progress[&id].percent_complete),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percents.last(), Some(&100));

    let saw_body_block = events.iter().any(|event| match &event.kind {
        OrchestratorEventKind::Progress(progress) => {
            progress[&id].current_block.as_deref() == Some("body")
                && progress[&id].status == ProgressStatus::Processing
        }
        _ => false,
    });
    assert!(saw_body_block);
}

#[tokio::test]
async fn retry_failed_reinvokes_only_the_failed_requests() {
    let recorder = Arc::new(WindowRecorder::new(&["b", "d"], 1));
    let orchestrator = Orchestrator::new(recorder.clone(), 2).unwrap();

    let first = orchestrator
        .run(batch(&["a", "b", "c", "d", "e"]))
        .await
        .unwrap();
    let summary = orchestrator.summary();
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.failed, 2);
    assert!(first[&RequestId::from_index(1)]
        .error
        .as_deref()
        .unwrap()
        .contains("b attempt 1 failed"));

    let retried = orchestrator.retry_failed().await.unwrap();
    let attempts = recorder.attempts.lock().clone();
    assert_eq!(attempts["a"], 1);
    assert_eq!(attempts["b"], 2);
    assert_eq!(attempts["c"], 1);
    assert_eq!(attempts["d"], 2);
    assert_eq!(attempts["e"], 1);

    assert!(retried.values().all(|result| result.success));
    assert_eq!(retried[&RequestId::from_index(0)], first[&RequestId::from_index(0)]);
    let retried_b = retried[&RequestId::from_index(1)].data.as_ref().unwrap();
    assert_eq!(retried_b["attempt"], json!(2));
    assert_eq!(orchestrator.summary().completed, 5);
}

#[tokio::test]
async fn reset_clears_progress_and_results() {
    let recorder = Arc::new(WindowRecorder::new(&["a"], 1));
    let orchestrator = Orchestrator::new(recorder.clone(), 2).unwrap();
    orchestrator.run(batch(&["a", "b"])).await.unwrap();
    assert_eq!(orchestrator.progress().len(), 2);

    orchestrator.reset();
    assert!(orchestrator.progress().is_empty());
    assert!(orchestrator.results().is_empty());
    assert_eq!(orchestrator.summary().total, 0);

    // Nothing left to retry after a reset
    orchestrator.retry_failed().await.unwrap();
    assert_eq!(recorder.attempts.lock()["a"], 1);
}

#[tokio::test]
async fn a_new_run_replaces_previous_state() {
    let recorder = Arc::new(WindowRecorder::new(&[], 0));
    let orchestrator = Orchestrator::new(recorder, 2).unwrap();
    orchestrator.run(batch(&["a", "b", "c"])).await.unwrap();

    let results = orchestrator.run(batch(&["x"])).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(orchestrator.progress().len(), 1);
    assert_eq!(results[&RequestId::from_index(0)].section_type, "x");
}
