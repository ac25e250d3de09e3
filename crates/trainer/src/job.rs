//! Lifecycle tracking for training jobs.
//!
//! One record per job in a shared table; the job's own pipeline task is the
//! only writer apart from externally requested stops. `Complete` and
//! `Failed` are terminal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Processing,
    Training,
    Stopping,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Training => "training",
            JobStatus::Stopping => "stopping",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    pub message: String,
}

/// Outcome of an external stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Accepted,
    NotFound,
    /// The job exists but is not currently training.
    NotTraining(JobStatus),
}

/// Shared table of job records, keyed by job id.
///
/// Cloned into the request layer and into each job's background task; every
/// access is a per-key read-modify-write under the table lock.
#[derive(Clone, Default)]
pub struct JobTable {
    inner: Arc<Mutex<HashMap<String, JobRecord>>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job_id: &str, status: JobStatus, message: &str) {
        let mut jobs = self.inner.lock().unwrap();
        jobs.insert(
            job_id.to_string(),
            JobRecord {
                status,
                message: message.to_string(),
            },
        );
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.inner.lock().unwrap().get(job_id).cloned()
    }

    pub fn set(&self, job_id: &str, status: JobStatus, message: &str) {
        if let Some(record) = self.inner.lock().unwrap().get_mut(job_id) {
            record.status = status;
            record.message = message.to_string();
        }
    }

    /// Accept a stop request only while the job is training. The
    /// check-and-set happens under the lock, so a stop can never land on a
    /// record that has already moved on.
    pub fn request_stop(&self, job_id: &str) -> StopOutcome {
        let mut jobs = self.inner.lock().unwrap();
        match jobs.get_mut(job_id) {
            None => StopOutcome::NotFound,
            Some(record) if record.status == JobStatus::Training => {
                record.status = JobStatus::Stopping;
                record.message = "Stop requested; finishing current epoch".to_string();
                StopOutcome::Accepted
            }
            Some(record) => StopOutcome::NotTraining(record.status),
        }
    }

    /// Polled by the training loop at epoch boundaries.
    pub fn stop_requested(&self, job_id: &str) -> bool {
        matches!(
            self.get(job_id),
            Some(JobRecord {
                status: JobStatus::Stopping,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_gated_on_training() {
        let jobs = JobTable::new();

        for status in [
            JobStatus::Starting,
            JobStatus::Processing,
            JobStatus::Stopping,
            JobStatus::Complete,
            JobStatus::Failed,
        ] {
            jobs.insert("job", status, "");
            assert_eq!(jobs.request_stop("job"), StopOutcome::NotTraining(status));
            // A rejected stop leaves the record untouched.
            assert_eq!(jobs.get("job").unwrap().status, status);
        }

        jobs.insert("job", JobStatus::Training, "Training in progress");
        assert_eq!(jobs.request_stop("job"), StopOutcome::Accepted);
        assert_eq!(jobs.get("job").unwrap().status, JobStatus::Stopping);
        assert!(jobs.stop_requested("job"));
    }

    #[test]
    fn test_unknown_job_is_distinct_from_failed() {
        let jobs = JobTable::new();
        assert!(jobs.get("missing").is_none());
        assert_eq!(jobs.request_stop("missing"), StopOutcome::NotFound);
        assert!(!jobs.stop_requested("missing"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Training.is_terminal());
        assert!(!JobStatus::Stopping.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let record = JobRecord {
            status: JobStatus::Training,
            message: "Training in progress".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"status\":\"training\""));
    }
}
