//! Runtime configuration.
//!
//! Everything is environment-variable driven with sensible defaults, so the
//! binary runs with no configuration at all:
//! - `HOST` / `PORT` - bind address (default `0.0.0.0:8080`)
//! - `ENVIRONMENT` - deployment environment label (default `dev`)
//! - `API_STAGE` - API stage label surfaced in response metadata (default `v1`)
//! - `DLQ_DIR` - directory for dead-letter output; unset disables the DLQ
//! - `MAX_RETRIES` - retry budget for transient failures (default 3)
//! - `RETRY_BASE_DELAY_MS` / `RETRY_MAX_DELAY_MS` - backoff tuning

use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::RetryPolicy;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Deployment environment label (e.g. "dev", "prod").
    pub environment: String,
    /// API stage label included in response metadata.
    pub api_stage: String,
    /// Dead-letter output directory. `None` disables dead-lettering.
    pub dlq_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: "dev".to_string(),
            api_stage: "v1".to_string(),
            dlq_dir: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Build configuration from environment variables.
    ///
    /// Unparseable numeric values fall back to the default with a warning
    /// rather than refusing to start.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_retry = RetryPolicy::default();

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            api_stage: std::env::var("API_STAGE").unwrap_or(defaults.api_stage),
            dlq_dir: std::env::var("DLQ_DIR").ok().map(PathBuf::from),
            retry: RetryPolicy {
                max_retries: parse_var("MAX_RETRIES", default_retry.max_retries),
                base_delay: Duration::from_millis(parse_var(
                    "RETRY_BASE_DELAY_MS",
                    default_retry.base_delay.as_millis() as u64,
                )),
                max_delay: Duration::from_millis(parse_var(
                    "RETRY_MAX_DELAY_MS",
                    default_retry.max_delay.as_millis() as u64,
                )),
            },
        }
    }

    /// Whether dead-lettering is enabled.
    pub fn dlq_enabled(&self) -> bool {
        self.dlq_dir.is_some()
    }
}

fn parse_var<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} value {:?}, using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}
