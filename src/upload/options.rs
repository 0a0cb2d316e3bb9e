//! Uploader configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use ask_screenshot::UploadOptions;
//!
//! let options = UploadOptions::new()
//!     .with_max_attempts(8)
//!     .with_retry_interval(Duration::from_millis(500));
//!
//! let from_json = UploadOptions::from_json(r#"{"maxAttempts": 8, "retryIntervalMs": 500}"#)?;
//! assert_eq!(options, from_json);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::DEFAULT_FILE_NAME;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1000);

/// Pause before the first attempt, while the page finishes loading.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(2000);

/// Pending records older than this are discarded.
pub const DEFAULT_MAX_RECORD_AGE: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// UploadOptions
// ============================================================================

/// Retry and delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadOptions {
    /// Upper bound on discovery-and-injection attempts.
    pub max_attempts: u32,

    /// Delay between failed attempts.
    #[serde(rename = "retryIntervalMs", with = "millis")]
    pub retry_interval: Duration,

    /// Delay before the first attempt.
    #[serde(rename = "settleDelayMs", with = "millis")]
    pub settle_delay: Duration,

    /// Maximum age of a pending record picked up by `resume`.
    #[serde(rename = "maxRecordAgeMs", with = "millis")]
    pub max_record_age: Duration,

    /// Name of the delivered file.
    pub file_name: Cow<'static, str>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl UploadOptions {
    /// Creates options with the default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            max_record_age: DEFAULT_MAX_RECORD_AGE,
            file_name: Cow::Borrowed(DEFAULT_FILE_NAME),
        }
    }

    /// Parses and validates options from JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl UploadOptions {
    /// Sets the attempt bound.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay between attempts.
    #[inline]
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Sets the delay before the first attempt.
    #[inline]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the maximum pending-record age.
    #[inline]
    #[must_use]
    pub fn with_max_record_age(mut self, age: Duration) -> Self {
        self.max_record_age = age;
        self
    }

    /// Sets the delivered file name.
    #[inline]
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Cow::Owned(name.into());
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl UploadOptions {
    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for a zero attempt bound or a blank file name.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config("max_attempts must be at least 1"));
        }
        if self.file_name.trim().is_empty() {
            return Err(Error::config("file_name must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = UploadOptions::default();
        assert_eq!(options.max_attempts, 5);
        assert_eq!(options.retry_interval, Duration::from_secs(1));
        assert_eq!(options.settle_delay, Duration::from_secs(2));
        assert_eq!(options.max_record_age, Duration::from_secs(300));
        assert_eq!(options.file_name, "ask-screenshot.png");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = UploadOptions::new()
            .with_max_attempts(3)
            .with_retry_interval(Duration::from_millis(250))
            .with_settle_delay(Duration::ZERO)
            .with_max_record_age(Duration::from_secs(60))
            .with_file_name("capture.png");
        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.retry_interval, Duration::from_millis(250));
        assert_eq!(options.settle_delay, Duration::ZERO);
        assert_eq!(options.file_name, "capture.png");
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let err = UploadOptions::new().with_max_attempts(0).validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(UploadOptions::new().with_file_name("  ").validate().is_err());
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let options = UploadOptions::from_json(r#"{"maxAttempts": 8, "retryIntervalMs": 500}"#).unwrap();
        assert_eq!(options.max_attempts, 8);
        assert_eq!(options.retry_interval, Duration::from_millis(500));
        assert_eq!(options.settle_delay, DEFAULT_SETTLE_DELAY);
    }

    #[test]
    fn test_json_round_trip_field_names() {
        let json = serde_json::to_value(UploadOptions::new()).unwrap();
        assert_eq!(json["retryIntervalMs"], 1000);
        assert_eq!(json["fileName"], "ask-screenshot.png");
        assert!(UploadOptions::from_json(r#"{"maxAttempts": 0}"#).is_err());
    }
}
