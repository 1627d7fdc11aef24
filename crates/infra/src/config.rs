//! Environment-driven configuration for the analytics pipeline.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use analytiq_query::RetryPolicy;

const ENV_NOTIFY_ENDPOINT: &str = "ANALYTIQ_NOTIFY_ENDPOINT";
const ENV_REGION: &str = "ANALYTIQ_REGION";
const ENV_RETENTION_DAYS: &str = "ANALYTIQ_RETENTION_DAYS";
const ENV_RETRY_MAX_ATTEMPTS: &str = "ANALYTIQ_RETRY_MAX_ATTEMPTS";
const ENV_RETRY_DELAY_SECS: &str = "ANALYTIQ_RETRY_DELAY_SECS";

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Runtime configuration for the analytics pipeline.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Endpoint receiving the status mutation calls.
    pub notify_endpoint: String,
    pub region: String,
    /// Job record retention, in days.
    pub retention_days: u32,
    pub retry: RetryPolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl AnalyticsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source (tests pass a closure over a
    /// map; `from_env` passes the process environment).
    pub fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let notify_endpoint =
            lookup(ENV_NOTIFY_ENDPOINT).ok_or(ConfigError::Missing(ENV_NOTIFY_ENDPOINT))?;
        let region = lookup(ENV_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string());

        let retention_days = parse_or(&lookup, ENV_RETENTION_DAYS, DEFAULT_RETENTION_DAYS)?;
        let default_retry = RetryPolicy::default();
        let max_attempts = parse_or(&lookup, ENV_RETRY_MAX_ATTEMPTS, default_retry.max_attempts)?;
        let delay_secs = parse_or(&lookup, ENV_RETRY_DELAY_SECS, default_retry.delay.as_secs())?;

        Ok(Self {
            notify_endpoint,
            region,
            retention_days,
            retry: RetryPolicy::fixed(max_attempts, Duration::from_secs(delay_secs)),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}
