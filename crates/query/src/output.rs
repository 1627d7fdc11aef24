//! Tagged query outputs and classification of raw executor output.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Discriminant tag shared by query outputs and result envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "plotData")]
    Chart,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Text => "text",
            ResponseKind::Table => "table",
            ResponseKind::Chart => "plotData",
        }
    }
}

impl core::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one query executor run, classified by response kind.
///
/// Consumers dispatch on the variant before touching the payload; exactly
/// one payload shape exists per tag.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Prose answer.
    Text { content: String },
    /// Tabular payload. Column/row shape is executor-defined and kept opaque.
    Table { data: JsonValue },
    /// Chart/plot payload, kept opaque.
    Chart { data: JsonValue },
}

impl QueryOutput {
    pub fn kind(&self) -> ResponseKind {
        match self {
            QueryOutput::Text { .. } => ResponseKind::Text,
            QueryOutput::Table { .. } => ResponseKind::Table,
            QueryOutput::Chart { .. } => ResponseKind::Chart,
        }
    }

    /// Classify raw executor output.
    ///
    /// Total over arbitrary input: a JSON object with a recognized
    /// `responseType` maps to the matching variant; anything else degrades
    /// to `Text` so a malformed result shape never fails the pipeline. An
    /// unknown tag falls back to whatever prose the payload carries, and
    /// unparseable output is embedded in a diagnostic string.
    pub fn parse(raw: &str) -> Self {
        let value: JsonValue = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => return Self::degraded(raw),
        };

        match value.get("responseType").and_then(JsonValue::as_str) {
            Some("text") => {
                let content = value
                    .get("content")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("No content available")
                    .to_string();
                QueryOutput::Text { content }
            }
            Some("table") => QueryOutput::Table { data: value },
            Some("plotData") => QueryOutput::Chart { data: value },
            _ => match value.get("content").and_then(JsonValue::as_str) {
                Some(content) => QueryOutput::Text {
                    content: content.to_string(),
                },
                None => Self::degraded(raw),
            },
        }
    }

    fn degraded(raw: &str) -> Self {
        QueryOutput::Text {
            content: format!("Error parsing response: {raw}"),
        }
    }
}

/// Failure raised by a query executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The engine could not translate the natural-language query.
    #[error("query translation failed: {0}")]
    Translation(String),

    /// Translation succeeded but running the query did not.
    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognized_tags_map_to_variants() {
        let text = QueryOutput::parse(r#"{"responseType":"text","content":"42 units"}"#);
        assert_eq!(
            text,
            QueryOutput::Text {
                content: "42 units".to_string()
            }
        );

        let table = QueryOutput::parse(r#"{"responseType":"table","rows":[[1,2]]}"#);
        match table {
            QueryOutput::Table { data } => {
                assert_eq!(data["responseType"], "table");
                assert_eq!(data["rows"], json!([[1, 2]]));
            }
            other => panic!("expected table, got {other:?}"),
        }

        let chart = QueryOutput::parse(r#"{"responseType":"plotData","series":[]}"#);
        assert_eq!(chart.kind(), ResponseKind::Chart);
    }

    #[test]
    fn text_without_content_gets_placeholder() {
        let out = QueryOutput::parse(r#"{"responseType":"text"}"#);
        assert_eq!(
            out,
            QueryOutput::Text {
                content: "No content available".to_string()
            }
        );
    }

    #[test]
    fn unknown_tag_falls_back_to_payload_prose() {
        let out = QueryOutput::parse(r#"{"responseType":"histogram","content":"see chart"}"#);
        assert_eq!(
            out,
            QueryOutput::Text {
                content: "see chart".to_string()
            }
        );
    }

    #[test]
    fn unparseable_output_degrades_to_diagnostic_text() {
        let out = QueryOutput::parse("Sorry, I could not build a query for that.");
        match out {
            QueryOutput::Text { content } => {
                assert!(content.starts_with("Error parsing response: "));
                assert!(content.contains("could not build a query"));
            }
            other => panic!("expected text, got {other:?}"),
        }

        let out = QueryOutput::parse(r#"{"responseType":"mystery"}"#);
        match out {
            QueryOutput::Text { content } => {
                assert!(content.starts_with("Error parsing response: "));
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn kind_tag_wire_names() {
        assert_eq!(
            serde_json::to_string(&ResponseKind::Chart).unwrap(),
            "\"plotData\""
        );
        assert_eq!(
            serde_json::to_string(&ResponseKind::Text).unwrap(),
            "\"text\""
        );
    }
}
