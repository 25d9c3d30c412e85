//! Configuration for talking to the chaos control plane
//!
//! A `ChaosConfig` is an explicit value handed to the client and manager at
//! construction. Operations read it when they start, so replacing it only
//! affects operations started afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::retry::RetryConfig;
use crate::Error;

/// Default API group of the chaos custom resources
pub const DEFAULT_API_GROUP: &str = "chaos-mesh.org";

/// Default API version of the chaos custom resources
pub const DEFAULT_API_VERSION: &str = "v1alpha1";

/// Process-level settings for the client, manager and controller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// API group of the chaos CRDs
    pub api_group: String,
    /// API version of the chaos CRDs
    pub api_version: String,
    /// Maximum attempts for retried reads (get/list)
    pub retry_max_attempts: u32,
    /// Exponential backoff multiplier
    pub retry_backoff_multiplier: f64,
    /// Lower bound for the delay between retries
    #[serde(with = "secs")]
    pub retry_min_wait: Duration,
    /// Upper bound for the delay between retries
    #[serde(with = "secs")]
    pub retry_max_wait: Duration,
    /// Default status polling interval
    #[serde(with = "secs")]
    pub poll_interval: Duration,
    /// Default timeout for `wait_for_injection`
    #[serde(with = "secs")]
    pub wait_timeout: Duration,
    /// Default timeout for `wait_for_deletion`
    #[serde(with = "secs")]
    pub deletion_timeout: Duration,
    /// Default polling interval for `wait_for_deletion`
    #[serde(with = "secs")]
    pub deletion_poll_interval: Duration,
    /// Fixed deletion-confirmation budget used during scope cleanup
    #[serde(with = "secs")]
    pub cleanup_timeout: Duration,
    /// Explicit kubeconfig to fall back to when not running in-cluster
    pub kubeconfig_path: Option<PathBuf>,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            api_group: DEFAULT_API_GROUP.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            retry_max_attempts: 3,
            retry_backoff_multiplier: 1.0,
            retry_min_wait: Duration::from_secs(1),
            retry_max_wait: Duration::from_secs(10),
            poll_interval: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(60),
            deletion_timeout: Duration::from_secs(30),
            deletion_poll_interval: Duration::from_secs(1),
            cleanup_timeout: Duration::from_secs(30),
            kubeconfig_path: None,
        }
    }
}

impl ChaosConfig {
    /// Defaults overridden by `CHAOS_*` / `KUBECONFIG_PATH` environment variables
    pub fn from_env() -> Result<Self, Error> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Load a YAML config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::validation(
                "config",
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            Error::serialization(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Apply overrides from a key lookup (the environment, in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CHAOS_API_GROUP") {
            self.api_group = v;
        }
        if let Some(v) = lookup("CHAOS_API_VERSION") {
            self.api_version = v;
        }
        if let Some(v) = lookup("CHAOS_RETRY_MAX_ATTEMPTS") {
            self.retry_max_attempts = parse_env("CHAOS_RETRY_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("CHAOS_RETRY_BACKOFF_MULTIPLIER") {
            self.retry_backoff_multiplier = parse_env("CHAOS_RETRY_BACKOFF_MULTIPLIER", &v)?;
        }
        if let Some(v) = lookup("CHAOS_RETRY_MIN_WAIT_SECS") {
            self.retry_min_wait = parse_secs("CHAOS_RETRY_MIN_WAIT_SECS", &v)?;
        }
        if let Some(v) = lookup("CHAOS_RETRY_MAX_WAIT_SECS") {
            self.retry_max_wait = parse_secs("CHAOS_RETRY_MAX_WAIT_SECS", &v)?;
        }
        if let Some(v) = lookup("CHAOS_POLL_INTERVAL_SECS") {
            self.poll_interval = parse_secs("CHAOS_POLL_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("CHAOS_WAIT_TIMEOUT_SECS") {
            self.wait_timeout = parse_secs("CHAOS_WAIT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("KUBECONFIG_PATH") {
            self.kubeconfig_path = Some(PathBuf::from(v));
        }
        debug!(config = ?self, "resolved chaos config");
        Ok(self)
    }

    /// `apiVersion` string for manifests, e.g. `chaos-mesh.org/v1alpha1`
    pub fn api_version_string(&self) -> String {
        format!("{}/{}", self.api_group, self.api_version)
    }

    /// Retry policy for reads derived from this config
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            backoff_multiplier: self.retry_backoff_multiplier,
            min_delay: self.retry_min_wait,
            max_delay: self.retry_max_wait,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::validation(key, format!("cannot parse '{}'", value)))
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, Error> {
    let secs: f64 = parse_env(key, value)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| Error::validation(key, format!("'{}' is not a valid number of seconds", value)))
}

/// Durations are written as (fractional) seconds in config files
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
