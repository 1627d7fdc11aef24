//! Job record storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use analytiq_core::{JobId, JobRecord, UserId};

/// Partition key for an owner's slice of the store.
///
/// Ownership is enforced by key construction, not by comparing an owner
/// field: a lookup under the wrong owner lands in a different partition and
/// simply finds nothing.
pub fn partition_key(user_id: &UserId) -> String {
    format!("analytics#{}", user_id.as_str())
}

/// Job record store abstraction.
///
/// The durable backend is an external collaborator; this crate ships the
/// port and an in-memory implementation for tests/dev.
pub trait JobStore: Send + Sync {
    /// Fetch a record by composite key. `None` means not found, which
    /// includes "exists under a different owner".
    fn get(&self, user_id: &UserId, job_id: &JobId) -> Result<Option<JobRecord>, JobStoreError>;

    /// Write (or overwrite) a record under its owner's partition.
    fn put(&self, record: JobRecord) -> Result<(), JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("storage error: {0}")]
    Storage(String),
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn get(&self, user_id: &UserId, job_id: &JobId) -> Result<Option<JobRecord>, JobStoreError> {
        (**self).get(user_id, job_id)
    }

    fn put(&self, record: JobRecord) -> Result<(), JobStoreError> {
        (**self).put(record)
    }
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    records: RwLock<HashMap<(String, String), JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl JobStore for InMemoryJobStore {
    fn get(&self, user_id: &UserId, job_id: &JobId) -> Result<Option<JobRecord>, JobStoreError> {
        let records = self.records.read().unwrap();
        let key = (partition_key(user_id), job_id.as_str().to_string());
        Ok(records.get(&key).cloned())
    }

    fn put(&self, record: JobRecord) -> Result<(), JobStoreError> {
        let mut records = self.records.write().unwrap();
        let key = (
            partition_key(&record.user_id),
            record.job_id.as_str().to_string(),
        );
        records.insert(key, record);
        Ok(())
    }
}
