//! Signed GraphQL status publisher.
//!
//! The remote mutation both updates the durable record and fans out to
//! subscribers, so the pipeline treats it as the single status-announcement
//! call. Acceptance means HTTP 200 with no protocol-level `errors` in the
//! response body; everything else is a rejection.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::{Value as JsonValue, json};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, info};

use super::{StatusNotifier, StatusUpdate};

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SIGNATURE_SCHEME: &str = "ANALYTIQ1-HMAC-SHA256";
const SIGNING_KEY_PREFIX: &str = "ANALYTIQ1";

const UPDATE_STATUS_MUTATION: &str = "mutation UpdateAnalyticsJobStatus($jobId: ID!, $status: String!, $userId: String!, $result: String) {\n    updateAnalyticsJobStatus(jobId: $jobId, status: $status, userId: $userId, result: $result)\n}";

/// Failure while constructing or issuing the notification call.
///
/// Only `publish` callers never see these: the port contract collapses them
/// to `false`. They surface from the constructor and in logs.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("failed to encode mutation payload: {0}")]
    Encode(String),

    #[error("request signing failed")]
    Signing,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Request-signing identity, passed explicitly rather than pulled from
/// process-global credential state.
#[derive(Debug, Clone)]
pub struct SigningContext {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    /// Service name bound into the credential scope (e.g. `"analytics"`).
    pub service: String,
}

impl SigningContext {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            region: region.into(),
            service: service.into(),
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Compute signature headers for a request body at the given instant.
    ///
    /// Derived-key chain (date → region → service → "request") over a
    /// canonical string of timestamp, credential scope, and body digest.
    pub fn sign(
        &self,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<(&'static str, String)>, NotifyError> {
        let date = at.format("%Y%m%d").to_string();
        let timestamp = at.format("%Y%m%dT%H%M%SZ").to_string();
        let scope = format!(
            "{}/{date}/{}/{}",
            self.access_key_id, self.region, self.service
        );

        let body_digest = hex::encode(Sha256::digest(body.as_bytes()));
        let string_to_sign = format!("{timestamp}\n{scope}\n{body_digest}");

        let initial = format!("{SIGNING_KEY_PREFIX}{}", self.secret_access_key);
        let k_date = hmac_sha256(initial.as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, b"request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

        let mut headers = vec![
            ("x-analytiq-date", timestamp),
            (
                "authorization",
                format!("{SIGNATURE_SCHEME} Credential={scope}, Signature={signature}"),
            ),
        ];
        if let Some(token) = &self.session_token {
            headers.push(("x-analytiq-security-token", token.clone()));
        }
        Ok(headers)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, NotifyError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| NotifyError::Signing)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Builds the mutation payload for one status update.
fn mutation_payload(update: &StatusUpdate) -> JsonValue {
    let mut variables = json!({
        "jobId": update.job_id.as_str(),
        "status": update.status.as_str(),
        "userId": update.user_id.as_str(),
    });
    if let Some(result) = &update.result {
        variables["result"] = json!(result);
    }
    json!({
        "query": UPDATE_STATUS_MUTATION,
        "variables": variables,
    })
}

/// Publishes status updates as a signed GraphQL mutation against the
/// notification endpoint.
pub struct GraphqlNotifier {
    endpoint: String,
    signing: SigningContext,
    client: reqwest::blocking::Client,
}

impl GraphqlNotifier {
    pub fn new(endpoint: impl Into<String>, signing: SigningContext) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            signing,
            client,
        })
    }

    fn send(&self, update: &StatusUpdate) -> Result<bool, NotifyError> {
        let payload = mutation_payload(update);
        let body =
            serde_json::to_string(&payload).map_err(|e| NotifyError::Encode(e.to_string()))?;
        let headers = self.signing.sign(&body, Utc::now())?;

        debug!(job_id = %update.job_id, payload = %body, "publishing status mutation");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header("accept", "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request
            .body(body)
            .send()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!(
                job_id = %update.job_id,
                status = %status,
                body = %text,
                "status publish rejected by endpoint"
            );
            return Ok(false);
        }

        let body_json: JsonValue = serde_json::from_str(&text).unwrap_or(JsonValue::Null);
        if let Some(errors) = body_json.get("errors").filter(|e| !e.is_null()) {
            error!(
                job_id = %update.job_id,
                errors = %errors,
                "protocol-level errors in publish response"
            );
            return Ok(false);
        }

        info!(
            job_id = %update.job_id,
            status = %update.status,
            "published analytics job update"
        );
        Ok(true)
    }
}

impl StatusNotifier for GraphqlNotifier {
    fn publish(&self, update: &StatusUpdate) -> bool {
        match self.send(update) {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(
                    job_id = %update.job_id,
                    status = %update.status,
                    error = %e,
                    "status publish failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytiq_core::{JobId, JobStatus, UserId};
    use chrono::TimeZone;

    fn context() -> SigningContext {
        SigningContext::new("AKFAKEKEY", "secret", "us-east-1", "analytics")
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 45).unwrap()
    }

    #[test]
    fn signing_is_deterministic_for_fixed_inputs() {
        let a = context().sign("{}", at()).unwrap();
        let b = context().sign("{}", at()).unwrap();
        assert_eq!(a, b);

        assert_eq!(a[0].0, "x-analytiq-date");
        assert_eq!(a[0].1, "20240305T123045Z");

        let auth = &a[1].1;
        assert!(auth.starts_with("ANALYTIQ1-HMAC-SHA256 Credential=AKFAKEKEY/20240305/us-east-1/analytics"));
        assert!(auth.contains("Signature="));
    }

    #[test]
    fn signature_depends_on_body() {
        let a = context().sign("{}", at()).unwrap();
        let b = context().sign("{\"x\":1}", at()).unwrap();
        assert_ne!(a[1].1, b[1].1);
    }

    #[test]
    fn session_token_header_only_when_present() {
        let without = context().sign("{}", at()).unwrap();
        assert!(without.iter().all(|(name, _)| *name != "x-analytiq-security-token"));

        let with = context()
            .with_session_token("token123")
            .sign("{}", at())
            .unwrap();
        assert!(
            with.iter()
                .any(|(name, value)| *name == "x-analytiq-security-token" && value == "token123")
        );
    }

    #[test]
    fn mutation_payload_carries_variables() {
        let update = StatusUpdate::new(
            JobId::new("j1").unwrap(),
            JobStatus::Completed,
            UserId::new("u1").unwrap(),
        )
        .with_result("{\"responseType\":\"text\"}".to_string());

        let payload = mutation_payload(&update);
        assert_eq!(payload["variables"]["jobId"], "j1");
        assert_eq!(payload["variables"]["status"], "COMPLETED");
        assert_eq!(payload["variables"]["userId"], "u1");
        assert_eq!(payload["variables"]["result"], "{\"responseType\":\"text\"}");
        assert!(
            payload["query"]
                .as_str()
                .unwrap()
                .contains("updateAnalyticsJobStatus")
        );
    }

    #[test]
    fn mutation_payload_omits_absent_result() {
        let update = StatusUpdate::new(
            JobId::new("j1").unwrap(),
            JobStatus::Processing,
            UserId::new("u1").unwrap(),
        );
        let payload = mutation_payload(&update);
        assert!(payload["variables"].get("result").is_none());
    }
}
