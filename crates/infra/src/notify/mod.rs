//! Status notification port and implementations.
//!
//! Status changes are announced through a one-way, fire-and-forget call
//! rather than observed from the store, so that remote subscribers can
//! react without polling the record. The channel is explicitly best-effort:
//! subscribers that miss an update fall back to polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use analytiq_core::{JobId, JobStatus, UserId};

pub mod graphql;

pub use graphql::{GraphqlNotifier, NotifyError, SigningContext};

/// One status announcement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub job_id: JobId,
    pub status: JobStatus,
    pub user_id: UserId,
    /// Serialized result envelope, present only on COMPLETED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl StatusUpdate {
    pub fn new(job_id: JobId, status: JobStatus, user_id: UserId) -> Self {
        Self {
            job_id,
            status,
            user_id,
            result: None,
        }
    }

    pub fn with_result(mut self, result: String) -> Self {
        self.result = Some(result);
        self
    }
}

/// Notification port: announce a job's new status to downstream observers.
///
/// One-way and best-effort. `publish` returns whether the remote side
/// accepted the update; implementations must never panic and never return
/// an error — every failure mode (network, auth, remote-side validation) is
/// logged and collapsed to `false`. Callers treat `false` as non-fatal: the
/// synchronous response to the immediate caller stays authoritative, and
/// the publish is purely a secondary channel.
pub trait StatusNotifier: Send + Sync {
    fn publish(&self, update: &StatusUpdate) -> bool;
}

impl<N> StatusNotifier for Arc<N>
where
    N: StatusNotifier + ?Sized,
{
    fn publish(&self, update: &StatusUpdate) -> bool {
        (**self).publish(update)
    }
}

/// In-memory notifier for tests/dev, recording every update it sees.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    published: Mutex<Vec<StatusUpdate>>,
    reject: AtomicBool,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// A notifier whose remote side rejects everything (still records, so
    /// tests can assert that publishes were attempted).
    pub fn rejecting() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            reject: AtomicBool::new(true),
        }
    }

    pub fn published(&self) -> Vec<StatusUpdate> {
        self.published.lock().unwrap().clone()
    }
}

impl StatusNotifier for InMemoryNotifier {
    fn publish(&self, update: &StatusUpdate) -> bool {
        self.published.lock().unwrap().push(update.clone());
        !self.reject.load(Ordering::Relaxed)
    }
}
