//! Analytics job record and status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{JobId, UserId};

/// Lifecycle status of an analytics job.
///
/// `Submitted` is the entry state, written when the record is created.
/// `Processing` is set once ownership has been validated and execution
/// starts. `Completed` and `Failed` are terminal and mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of analytics-query work tracked through the status lifecycle.
///
/// The job store owns the authoritative copy. Processors read the record
/// and announce transitions through the notification channel; they never
/// hold the durable state themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub user_id: UserId,
    pub job_id: JobId,
    /// Natural-language query text as submitted.
    pub query: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    /// Serialized result envelope; present iff the job completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Retention TTL, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_after: Option<i64>,
}

impl JobRecord {
    /// Create a freshly submitted record.
    pub fn new(user_id: UserId, job_id: JobId, query: impl Into<String>) -> Self {
        Self {
            user_id,
            job_id,
            query: query.into(),
            status: JobStatus::Submitted,
            created_at: Utc::now(),
            result: None,
            completed_at: None,
            expires_after: None,
        }
    }

    /// Set the retention TTL.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_after = Some(expires_at.timestamp());
        self
    }

    /// Mark the record as picked up for execution.
    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
    }

    /// Mark the record completed with its normalized result.
    ///
    /// Completed always carries a result; this is the only transition that
    /// attaches one.
    pub fn mark_completed(&mut self, result: String) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    /// Mark the record failed. Failed never carries a result.
    pub fn mark_failed(&mut self) {
        self.status = JobStatus::Failed;
        self.result = None;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record() -> JobRecord {
        JobRecord::new(
            UserId::new("u1").unwrap(),
            JobId::new("j1").unwrap(),
            "show me sales by region",
        )
    }

    #[test]
    fn status_wire_format_is_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Submitted).unwrap(),
            "\"SUBMITTED\""
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"PROCESSING\""
        );
        let back: JobStatus = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(back, JobStatus::Completed);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Submitted.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn completed_carries_result_failed_does_not() {
        let mut record = test_record();
        record.mark_processing();
        assert_eq!(record.status, JobStatus::Processing);
        assert!(record.result.is_none());

        record.mark_completed("{\"responseType\":\"text\"}".to_string());
        assert_eq!(record.status, JobStatus::Completed);
        assert!(record.result.is_some());
        assert!(record.completed_at.is_some());

        let mut record = test_record();
        record.mark_processing();
        record.mark_failed();
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.result.is_none());
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = test_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["jobId"], "j1");
        assert_eq!(json["status"], "SUBMITTED");
        assert!(json.get("createdAt").is_some());
        // Absent optionals are omitted, not null.
        assert!(json.get("result").is_none());
        assert!(json.get("completedAt").is_none());
    }
}
