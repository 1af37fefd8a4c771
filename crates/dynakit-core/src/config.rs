//! Stream processing configuration.

use std::env;
use std::time::Duration;

use dynakit_model::stream::StartingPosition;

use crate::stream::StreamError;

/// Largest batch a single fetch may request.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Settings for one stream processing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamProcessingConfig {
    /// Records requested per fetch (`1..=1000`).
    pub batch_size: usize,
    /// Stop after delivering this many records; `None` runs until every shard
    /// is exhausted.
    pub max_records: Option<usize>,
    /// Sleep between polls of an idle shard and before retries.
    pub poll_interval: Duration,
    /// Abort the run on the first fetch or handler failure.
    pub stop_on_error: bool,
    /// Where each shard's initial cursor starts.
    pub starting_position: StartingPosition,
}

impl StreamProcessingConfig {
    /// Create configuration from environment variables.
    ///
    /// Unset or unparseable variables keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_parse("DYNAKIT_STREAM_BATCH_SIZE").unwrap_or(defaults.batch_size),
            max_records: env_parse("DYNAKIT_STREAM_MAX_RECORDS").or(defaults.max_records),
            poll_interval: env_parse("DYNAKIT_STREAM_POLL_INTERVAL_MS")
                .map_or(defaults.poll_interval, Duration::from_millis),
            stop_on_error: env_bool("DYNAKIT_STREAM_STOP_ON_ERROR", defaults.stop_on_error),
            starting_position: defaults.starting_position,
        }
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Cap the number of delivered records.
    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records);
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Choose between aborting and continuing on failures.
    #[must_use]
    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Set where new cursors start.
    #[must_use]
    pub fn with_starting_position(mut self, position: StartingPosition) -> Self {
        self.starting_position = position;
        self
    }

    /// Check invariants.
    pub fn validate(&self) -> Result<(), StreamError> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(StreamError::InvalidConfig(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.max_records == Some(0) {
            return Err(StreamError::InvalidConfig(
                "max_records must be positive when set".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for StreamProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_records: None,
            poll_interval: Duration::from_secs(1),
            stop_on_error: true,
            starting_position: StartingPosition::TrimHorizon,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_use_documented_defaults() {
        let config = StreamProcessingConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_records, None);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.stop_on_error);
        assert_eq!(config.starting_position, StartingPosition::TrimHorizon);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_should_reject_out_of_range_batch_size() {
        for batch_size in [0, 1001] {
            let config = StreamProcessingConfig::default().with_batch_size(batch_size);
            assert!(matches!(
                config.validate(),
                Err(StreamError::InvalidConfig(_))
            ));
        }
        let config = StreamProcessingConfig::default().with_batch_size(1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_should_reject_zero_record_budget() {
        let config = StreamProcessingConfig::default().with_max_records(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_fall_back_to_defaults_for_missing_env() {
        assert_eq!(env_parse::<usize>("DYNAKIT_TEST_SURELY_UNSET_VARIABLE"), None);
        assert!(env_bool("DYNAKIT_TEST_SURELY_UNSET_VARIABLE", true));
        assert!(!env_bool("DYNAKIT_TEST_SURELY_UNSET_VARIABLE", false));
    }
}
