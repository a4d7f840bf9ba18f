//! Observer interface for progress, completion, and batch failure.

use crate::error::GenerationError;
use crate::orchestrator::progress::ProgressEntry;
use crate::types::{GenerationResult, RequestId};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use tracing::warn;

pub type ProgressMap = BTreeMap<RequestId, ProgressEntry>;
pub type ResultMap = BTreeMap<RequestId, GenerationResult>;

/// Receives orchestrator notifications. Every method defaults to a no-op.
pub trait ProgressObserver: Send + Sync {
    /// Called on every status transition with the full progress map
    fn on_progress(&self, _progress: &ProgressMap) {}

    /// Called once per run with the full result map
    fn on_complete(&self, _results: &ResultMap) {}

    /// Called on whole-batch failure
    fn on_error(&self, _error: &GenerationError) {}
}

pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

#[derive(Debug, Clone)]
pub enum OrchestratorEventKind {
    Progress(ProgressMap),
    Completed(ResultMap),
    Failed(String),
}

impl OrchestratorEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            OrchestratorEventKind::Progress(_) => "progress",
            OrchestratorEventKind::Completed(_) => "completed",
            OrchestratorEventKind::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorEvent {
    pub ts: String,
    pub seq: u64,
    pub kind: OrchestratorEventKind,
}

/// Forwards notifications as timestamped events over a channel.
pub struct ChannelObserver {
    sender: Mutex<Sender<OrchestratorEvent>>,
    seq: AtomicU64,
}

impl ChannelObserver {
    pub fn new_pair() -> (Self, Receiver<OrchestratorEvent>) {
        let (sender, receiver) = channel();
        (
            Self {
                sender: Mutex::new(sender),
                seq: AtomicU64::new(1),
            },
            receiver,
        )
    }

    fn emit(&self, kind: OrchestratorEventKind) {
        let event = OrchestratorEvent {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            kind,
        };
        let event_type = event.kind.name();
        if self.sender.lock().send(event).is_err() {
            warn!(event_type, "Progress receiver dropped; event discarded");
        }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, progress: &ProgressMap) {
        self.emit(OrchestratorEventKind::Progress(progress.clone()));
    }

    fn on_complete(&self, results: &ResultMap) {
        self.emit(OrchestratorEventKind::Completed(results.clone()));
    }

    fn on_error(&self, error: &GenerationError) {
        self.emit(OrchestratorEventKind::Failed(error.to_string()));
    }
}
