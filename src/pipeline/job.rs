//! Capture job lifecycle
//!
//! A capture job moves `queued -> processing -> done | failed`. The
//! `edited` status is reached only through an external user adjustment,
//! never by this pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Queued,
    Processing,
    Done,
    Failed,
    Edited,
}

impl std::fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureStatus::Queued => write!(f, "queued"),
            CaptureStatus::Processing => write!(f, "processing"),
            CaptureStatus::Done => write!(f, "done"),
            CaptureStatus::Failed => write!(f, "failed"),
            CaptureStatus::Edited => write!(f, "edited"),
        }
    }
}

/// One capture job owned by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureJob {
    pub capture_id: String,
    pub status: CaptureStatus,
    pub created_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// Pipeline attempts consumed, including the first
    pub attempts: u32,
}

impl CaptureJob {
    /// Create a freshly queued job
    pub fn new(capture_id: impl Into<String>) -> Self {
        Self {
            capture_id: capture_id.into(),
            status: CaptureStatus::Queued,
            created_at: Utc::now(),
            processing_started_at: None,
            processing_completed_at: None,
            error_message: None,
            attempts: 0,
        }
    }

    /// Transition `queued -> processing`, recording the start timestamp
    pub fn start_processing(&mut self) {
        self.status = CaptureStatus::Processing;
        self.processing_started_at = Some(Utc::now());
        self.error_message = None;
    }

    /// Transition `processing -> done`, recording the completion timestamp
    pub fn complete(&mut self) {
        self.status = CaptureStatus::Done;
        self.processing_completed_at = Some(Utc::now());
        self.error_message = None;
    }

    /// Transition `processing -> failed` with a human-readable message
    pub fn fail(&mut self, error_message: impl Into<String>) {
        self.status = CaptureStatus::Failed;
        self.processing_completed_at = Some(Utc::now());
        self.error_message = Some(error_message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_queued() {
        let job = CaptureJob::new("cap-1");
        assert_eq!(job.status, CaptureStatus::Queued);
        assert!(job.processing_started_at.is_none());
        assert!(job.error_message.is_none());
        assert_eq!(job.attempts, 0);
    }

    #[test]
    fn test_lifecycle_timestamps() {
        let mut job = CaptureJob::new("cap-1");
        job.start_processing();
        assert_eq!(job.status, CaptureStatus::Processing);
        assert!(job.processing_started_at.is_some());

        job.complete();
        assert_eq!(job.status, CaptureStatus::Done);
        assert!(job.processing_completed_at.is_some());
    }

    #[test]
    fn test_failure_records_message() {
        let mut job = CaptureJob::new("cap-1");
        job.start_processing();
        job.fail("front image missing");
        assert_eq!(job.status, CaptureStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("front image missing"));
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&CaptureStatus::Processing).unwrap(),
            "\"processing\""
        );
    }
}
