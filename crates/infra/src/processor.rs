//! The job orchestrator: one analytics job run, end to end.
//!
//! Validate the request, check ownership via composite-key lookup, announce
//! PROCESSING, drive the retry controller, normalize the output, announce
//! the terminal status, and return exactly one structured response. Nothing
//! propagates past `process` as a panic or unhandled error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use analytiq_core::{JobId, JobStatus, UserId};
use analytiq_query::{
    AlwaysRetry, QueryContext, QueryExecutor, ResultEnvelope, RetryClassifier, RetryController,
    normalize,
};

use crate::notify::{StatusNotifier, StatusUpdate};
use crate::response::ErrorResponse;
use crate::store::JobStore;

/// Entry contract: both fields must be present and non-blank.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub user_id: Option<String>,
    pub job_id: Option<String>,
}

impl ProcessRequest {
    pub fn new(user_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            job_id: Some(job_id.into()),
        }
    }
}

/// Success surface: the terminal job state with its normalized result.
/// The owner id is deliberately not echoed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedJob {
    pub job_id: JobId,
    pub status: JobStatus,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub result: ResultEnvelope,
}

/// Exactly one of these comes back from every `process` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProcessResponse {
    Completed(CompletedJob),
    Error(ErrorResponse),
}

impl ProcessResponse {
    pub fn as_completed(&self) -> Option<&CompletedJob> {
        match self {
            ProcessResponse::Completed(job) => Some(job),
            ProcessResponse::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorResponse> {
        match self {
            ProcessResponse::Completed(_) => None,
            ProcessResponse::Error(err) => Some(err),
        }
    }
}

/// Orchestrates analytics job runs against the store, notifier, and query
/// engine it is built with. One invocation per job; no state is shared
/// between invocations.
pub struct JobProcessor<S, N, E, C = AlwaysRetry> {
    store: S,
    notifier: N,
    executor: E,
    retry: RetryController<C>,
}

impl<S, N, E> JobProcessor<S, N, E> {
    pub fn new(store: S, notifier: N, executor: E) -> Self {
        Self {
            store,
            notifier,
            executor,
            retry: RetryController::default(),
        }
    }
}

impl<S, N, E, C> JobProcessor<S, N, E, C> {
    /// Replace the retry controller (policy and/or classifier).
    pub fn with_retry<C2>(self, retry: RetryController<C2>) -> JobProcessor<S, N, E, C2> {
        JobProcessor {
            store: self.store,
            notifier: self.notifier,
            executor: self.executor,
            retry,
        }
    }
}

impl<S, N, E, C> JobProcessor<S, N, E, C>
where
    S: JobStore,
    N: StatusNotifier,
    E: QueryExecutor,
    C: RetryClassifier,
{
    /// Run one job to its terminal state.
    pub fn process(&self, request: ProcessRequest) -> ProcessResponse {
        let (user_id, job_id) = match parse_identities(&request) {
            Some(ids) => ids,
            None => {
                error!("userId and jobId are required");
                return ProcessResponse::Error(ErrorResponse::bad_request(
                    "userId and jobId are required",
                ));
            }
        };

        // Ownership is enforced by key construction: a record under another
        // owner is indistinguishable from a missing one.
        let record = match self.store.get(&user_id, &job_id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                error!(job_id = %job_id, user_id = %user_id, "job not found for user");
                return ProcessResponse::Error(ErrorResponse::forbidden(format!(
                    "Job not found: {job_id} for user: {user_id}"
                )));
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "job store lookup failed");
                return ProcessResponse::Error(ErrorResponse::internal(format!(
                    "Database error: {e}"
                )));
            }
        };
        info!(job_id = %job_id, user_id = %user_id, "job ownership validated");

        self.publish(StatusUpdate::new(
            job_id.clone(),
            JobStatus::Processing,
            user_id.clone(),
        ));

        let ctx = QueryContext::for_job(job_id.clone(), user_id.clone());
        match self.retry.run(&self.executor, &record.query, &ctx) {
            Ok(output) => {
                let envelope = normalize(output, &record.query);
                match serde_json::to_string(&envelope) {
                    Ok(serialized) => {
                        self.publish(
                            StatusUpdate::new(
                                job_id.clone(),
                                JobStatus::Completed,
                                user_id.clone(),
                            )
                            .with_result(serialized),
                        );
                        info!(job_id = %job_id, "job completed");
                        ProcessResponse::Completed(CompletedJob {
                            job_id,
                            status: JobStatus::Completed,
                            query: record.query,
                            created_at: record.created_at,
                            result: envelope,
                        })
                    }
                    Err(e) => {
                        // Assembling the terminal payload failed; the run is
                        // unrecoverable even though the query succeeded.
                        error!(job_id = %job_id, error = %e, "failed to serialize result envelope");
                        self.fail(&job_id, &user_id, &format!("{e}"))
                    }
                }
            }
            Err(exhausted) => {
                error!(
                    job_id = %job_id,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "query processing exhausted retries"
                );
                self.fail(&job_id, &user_id, &exhausted.last_error.to_string())
            }
        }
    }

    fn fail(&self, job_id: &JobId, user_id: &UserId, cause: &str) -> ProcessResponse {
        self.publish(StatusUpdate::new(
            job_id.clone(),
            JobStatus::Failed,
            user_id.clone(),
        ));
        ProcessResponse::Error(ErrorResponse::internal(format!(
            "Analytics query processing failed: {cause}"
        )))
    }

    /// Best-effort status announcement: rejection is logged, never surfaced.
    fn publish(&self, update: StatusUpdate) {
        if self.notifier.publish(&update) {
            info!(job_id = %update.job_id, status = %update.status, "status update published");
        } else {
            error!(
                job_id = %update.job_id,
                status = %update.status,
                "status update publish rejected"
            );
        }
    }
}

fn parse_identities(request: &ProcessRequest) -> Option<(UserId, JobId)> {
    let user_id = UserId::new(request.user_id.as_deref()?).ok()?;
    let job_id = JobId::new(request.job_id.as_deref()?).ok()?;
    Some((user_id, job_id))
}
