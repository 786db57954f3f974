//! Admission control configuration with validation.
//!
//! Loaded once at startup by the host process and treated as immutable for
//! the process lifetime.

use crate::domain::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Upper bound for the policy time windows
const MAX_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Admission control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Enable enforcement. When false every request is admitted untouched.
    pub enabled: bool,
    /// Distinct signers an origin may be associated with before its
    /// submissions are throttle-checked
    pub association_threshold: u32,
    /// Minimum time between over-threshold submissions for one signer
    #[serde(with = "humantime_serde")]
    pub min_activity_interval: Duration,
    /// How long a signer stays managed once it trips the interval check
    #[serde(with = "humantime_serde")]
    pub management_duration: Duration,
    /// Cap on tracked origins (None = unbounded). Least-recently-touched
    /// entries are evicted past the cap; see the registry docs.
    pub max_origins: Option<NonZeroUsize>,
    /// Cap on tracked signers (None = unbounded)
    pub max_signers: Option<NonZeroUsize>,
    /// Largest request body the transport adapter will buffer for inspection
    pub max_capture_bytes: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            association_threshold: 5,
            min_activity_interval: Duration::from_secs(5 * 60),
            management_duration: Duration::from_secs(10 * 60),
            max_origins: None,
            max_signers: None,
            max_capture_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl AdmissionConfig {
    /// Enforcing configuration with explicit policy windows. Handy for tests
    /// and embedded setups; production loads the serialized form.
    pub fn enforcing(
        association_threshold: u32,
        min_activity_interval: Duration,
        management_duration: Duration,
    ) -> Self {
        Self {
            enabled: true,
            association_threshold,
            min_activity_interval,
            management_duration,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.association_threshold == 0 {
            return Err(ConfigError::InvalidThreshold(
                "association_threshold cannot be 0".into(),
            ));
        }

        if self.min_activity_interval.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "min_activity_interval cannot be 0".into(),
            ));
        }

        if self.management_duration.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "management_duration cannot be 0".into(),
            ));
        }

        if self.min_activity_interval > MAX_WINDOW {
            return Err(ConfigError::InvalidDuration(
                "min_activity_interval exceeds 30 days".into(),
            ));
        }

        if self.management_duration > MAX_WINDOW {
            return Err(ConfigError::InvalidDuration(
                "management_duration exceeds 30 days".into(),
            ));
        }

        if self.max_capture_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_capture_bytes cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }

}
