//! `analytiq-query`
//!
//! **Responsibility:** The query-execution subsystem boundary.
//!
//! This crate is intentionally storage- and transport-agnostic:
//! - It defines the port for the natural-language query engine.
//! - It classifies raw executor output into tagged variants and normalizes
//!   them into the canonical result envelope.
//! - It owns the bounded-retry policy wrapped around executor invocation.

pub mod executor;
pub mod normalize;
pub mod output;
pub mod retry;

pub use executor::{QueryContext, QueryExecutor};
pub use normalize::{ResultEnvelope, ResultMetadata, normalize, normalize_at};
pub use output::{QueryError, QueryOutput, ResponseKind};
pub use retry::{
    AlwaysRetry, AttemptRecord, RetryClassifier, RetryController, RetryExhausted, RetryPolicy,
};
