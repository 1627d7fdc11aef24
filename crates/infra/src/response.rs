//! HTTP-style failure surface shared by the pipeline entry points.
//!
//! Callers branch on the status code, so the tiering is part of the
//! contract: 400 for validation, 403 for ownership/not-found, 500 for
//! execution and infrastructure failures.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub body: String,
}

impl ErrorResponse {
    pub fn bad_request(body: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            body: body.into(),
        }
    }

    pub fn forbidden(body: impl Into<String>) -> Self {
        Self {
            status_code: 403,
            body: body.into(),
        }
    }

    pub fn internal(body: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_helpers_set_expected_codes() {
        assert_eq!(ErrorResponse::bad_request("x").status_code, 400);
        assert_eq!(ErrorResponse::forbidden("x").status_code, 403);
        assert_eq!(ErrorResponse::internal("x").status_code, 500);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(ErrorResponse::bad_request("userId and jobId are required"))
            .unwrap();
        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["body"], "userId and jobId are required");
    }
}
