//! Per-request progress entries.

use crate::types::{GenerationResult, RequestId};
use serde::{Deserialize, Serialize};

/// Percent shown once a request has been handed to its generator.
pub const PROCESSING_START_PERCENT: u8 = 10;
/// Upper bound reached by block-level progress before completion.
pub const PROCESSING_END_PERCENT: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::Pending => "pending",
            ProgressStatus::Processing => "processing",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Error => "error",
        }
    }

    pub fn is_settled(self) -> bool {
        matches!(self, ProgressStatus::Completed | ProgressStatus::Error)
    }
}

/// Live state of one request. Transitions only move forward:
/// pending, processing, then completed or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub request_id: RequestId,
    pub status: ProgressStatus,
    pub percent_complete: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GenerationResult>,
}

impl ProgressEntry {
    pub fn pending(request_id: RequestId) -> Self {
        Self {
            request_id,
            status: ProgressStatus::Pending,
            percent_complete: 0,
            current_block: None,
            error: None,
            result: None,
        }
    }

    pub(crate) fn mark_processing(&mut self) -> bool {
        if self.status != ProgressStatus::Pending {
            return false;
        }
        self.status = ProgressStatus::Processing;
        self.percent_complete = PROCESSING_START_PERCENT;
        true
    }

    pub(crate) fn mark_block(&mut self, block_name: &str, index: usize, total: usize) -> bool {
        if self.status != ProgressStatus::Processing {
            return false;
        }
        let index = index.min(total);
        let span = usize::from(PROCESSING_END_PERCENT - PROCESSING_START_PERCENT);
        let step = if total == 0 { 0 } else { span * index / total };
        let percent = u8::try_from(usize::from(PROCESSING_START_PERCENT) + step)
            .unwrap_or(PROCESSING_END_PERCENT)
            .min(PROCESSING_END_PERCENT);
        self.current_block = Some(block_name.to_string());
        self.percent_complete = self.percent_complete.max(percent);
        true
    }

    pub(crate) fn mark_completed(&mut self, result: GenerationResult) -> bool {
        if self.status != ProgressStatus::Processing {
            return false;
        }
        self.status = ProgressStatus::Completed;
        self.percent_complete = 100;
        self.current_block = None;
        self.result = Some(result);
        true
    }

    pub(crate) fn mark_failed(&mut self, error: String, result: Option<GenerationResult>) -> bool {
        if self.status != ProgressStatus::Processing {
            return false;
        }
        self.status = ProgressStatus::Error;
        self.percent_complete = 0;
        self.current_block = None;
        self.error = Some(error);
        self.result = result;
        true
    }
}

/// Counts of requests by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl<'a> FromIterator<&'a ProgressEntry> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = &'a ProgressEntry>>(iter: I) -> Self {
        let mut summary = BatchSummary::default();
        for entry in iter {
            summary.total += 1;
            match entry.status {
                ProgressStatus::Pending => summary.pending += 1,
                ProgressStatus::Processing => summary.processing += 1,
                ProgressStatus::Completed => summary.completed += 1,
                ProgressStatus::Error => summary.failed += 1,
            }
        }
        summary
    }
}
