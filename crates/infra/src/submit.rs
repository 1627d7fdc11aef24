//! Job submission: mint a record and hand it to the pipeline.
//!
//! The processor is invoked by the enclosing execution environment once the
//! record exists; this module only owns record creation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use analytiq_core::{JobId, JobRecord, JobStatus, UserId};

use crate::response::ErrorResponse;
use crate::store::JobStore;

/// Submission input. The query is mandatory; a missing identity degrades to
/// the anonymous owner rather than rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub user_id: Option<String>,
    pub query: Option<String>,
}

impl SubmitRequest {
    pub fn new(user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            query: Some(query.into()),
        }
    }
}

/// Acknowledgement returned to the submitting client. The owner id is
/// deliberately not echoed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedJob {
    pub job_id: JobId,
    pub status: JobStatus,
    pub query: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubmitResponse {
    Accepted(SubmittedJob),
    Error(ErrorResponse),
}

impl SubmitResponse {
    pub fn as_accepted(&self) -> Option<&SubmittedJob> {
        match self {
            SubmitResponse::Accepted(job) => Some(job),
            SubmitResponse::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorResponse> {
        match self {
            SubmitResponse::Accepted(_) => None,
            SubmitResponse::Error(err) => Some(err),
        }
    }
}

/// Creates job records with a retention TTL.
pub struct JobSubmitter<S> {
    store: S,
    retention_days: u32,
}

impl<S: JobStore> JobSubmitter<S> {
    pub fn new(store: S, retention_days: u32) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    pub fn submit(&self, request: SubmitRequest) -> SubmitResponse {
        let query = match request.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => query.to_string(),
            _ => {
                error!("query parameter missing from submission");
                return SubmitResponse::Error(ErrorResponse::bad_request(
                    "Query parameter is required",
                ));
            }
        };

        let user_id = match request.user_id.as_deref().and_then(|u| UserId::new(u).ok()) {
            Some(user_id) => user_id,
            None => {
                warn!("no valid user identity on submission, using anonymous");
                UserId::anonymous()
            }
        };

        let record = JobRecord::new(user_id.clone(), JobId::generate(), query);
        let expiry = record.created_at + Duration::days(self.retention_days as i64);
        let record = record.with_expiry(expiry);

        let accepted = SubmittedJob {
            job_id: record.job_id.clone(),
            status: record.status,
            query: record.query.clone(),
            created_at: record.created_at,
        };

        if let Err(e) = self.store.put(record) {
            error!(job_id = %accepted.job_id, error = %e, "failed to create job record");
            return SubmitResponse::Error(ErrorResponse::internal(format!("Database error: {e}")));
        }
        info!(job_id = %accepted.job_id, user_id = %user_id, "created job record");

        SubmitResponse::Accepted(accepted)
    }
}
