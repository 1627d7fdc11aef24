//! Infrastructure layer: job storage, status notification, configuration,
//! and the orchestration pipeline wiring them together.

pub mod config;
pub mod notify;
pub mod processor;
pub mod response;
pub mod store;
pub mod submit;

pub use config::{AnalyticsConfig, ConfigError};
pub use notify::{
    GraphqlNotifier, InMemoryNotifier, SigningContext, StatusNotifier, StatusUpdate,
};
pub use processor::{CompletedJob, JobProcessor, ProcessRequest, ProcessResponse};
pub use response::ErrorResponse;
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
pub use submit::{JobSubmitter, SubmitRequest, SubmitResponse, SubmittedJob};
