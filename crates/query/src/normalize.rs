//! Normalization of query outputs into the canonical result envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::output::{QueryOutput, ResponseKind};

/// `generatedAt` wire format: millisecond-precision UTC.
const GENERATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Generation metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    /// When normalization ran, not when the executor answered.
    pub generated_at: String,
    /// The job's stored query text, never the executor's echo of it.
    pub query: String,
}

/// Canonical result shape returned to callers regardless of executor output
/// variety.
///
/// Exactly one payload field is populated, matching `response_type`:
/// `content` for text, `table_data` for table, `plot_data` for chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub response_type: ResponseKind,
    pub metadata: ResultMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_data: Option<JsonValue>,
    /// Single-element today; an array for forward compatibility with
    /// multi-chart results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_data: Option<Vec<JsonValue>>,
}

/// Normalize a query output, stamping generation time with `Utc::now()`.
pub fn normalize(output: QueryOutput, query: &str) -> ResultEnvelope {
    normalize_at(output, query, Utc::now())
}

/// Normalize with an explicit generation timestamp.
pub fn normalize_at(
    output: QueryOutput,
    query: &str,
    generated_at: DateTime<Utc>,
) -> ResultEnvelope {
    let metadata = ResultMetadata {
        generated_at: generated_at.format(GENERATED_AT_FORMAT).to_string(),
        query: query.to_string(),
    };

    let (response_type, content, table_data, plot_data) = match output {
        QueryOutput::Text { content } => (ResponseKind::Text, Some(content), None, None),
        QueryOutput::Table { data } => (ResponseKind::Table, None, Some(data), None),
        QueryOutput::Chart { data } => (ResponseKind::Chart, None, None, Some(vec![data])),
    };

    ResultEnvelope {
        response_type,
        metadata,
        content,
        table_data,
        plot_data,
    }
}
