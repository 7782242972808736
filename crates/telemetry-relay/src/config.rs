// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ConfigError;
use std::env;
use std::time::Duration;

/// Queues never shrink below this hard capacity regardless of batch size.
const MIN_QUEUE_CAPACITY: usize = 500;

/// Configuration for the telemetry relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Whether the relay is active at all. When false, tracked events are
    /// discarded immediately and no flush scheduler runs.
    pub enabled: bool,
    /// Soft flush trigger: a pipeline schedules a flush once its queue
    /// reaches this many events.
    pub batch_size: usize,
    /// Hard queue capacity is `max(capacity_multiplier * batch_size, 500)`.
    pub capacity_multiplier: usize,
    /// Period of the scheduled all-pipelines flush.
    pub flush_interval: Duration,
    /// Drain attempts during shutdown before remaining events are
    /// declared lost.
    pub shutdown_retry_attempts: u32,
    /// Pause between shutdown drain attempts.
    pub shutdown_retry_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: 50,
            capacity_multiplier: 2,
            flush_interval: Duration::from_millis(10_000),
            shutdown_retry_attempts: 3,
            shutdown_retry_delay: Duration::from_millis(1_000),
        }
    }
}

impl RelayConfig {
    /// Create configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let enabled = env::var("TELEMETRY_ENABLED")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.enabled);
        let batch_size = env::var("TELEMETRY_BATCH_SIZE")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.batch_size);
        let capacity_multiplier = env::var("TELEMETRY_CAPACITY_MULTIPLIER")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.capacity_multiplier);
        let flush_interval = env::var("TELEMETRY_FLUSH_INTERVAL_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.flush_interval);
        let shutdown_retry_attempts = env::var("TELEMETRY_SHUTDOWN_RETRY_ATTEMPTS")
            .ok()
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(defaults.shutdown_retry_attempts);
        let shutdown_retry_delay = env::var("TELEMETRY_SHUTDOWN_RETRY_DELAY_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.shutdown_retry_delay);

        let config = Self {
            enabled,
            batch_size,
            capacity_multiplier,
            flush_interval,
            shutdown_retry_attempts,
            shutdown_retry_delay,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "batch size must be greater than 0".to_string(),
            ));
        }

        if self.capacity_multiplier == 0 {
            return Err(ConfigError::InvalidConfig(
                "capacity multiplier must be greater than 0".to_string(),
            ));
        }

        if self.flush_interval.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "flush interval must be greater than 0".to_string(),
            ));
        }

        if self.shutdown_retry_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "shutdown retry attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Hard per-pipeline queue capacity derived from the sizing policy.
    pub fn queue_capacity(&self) -> usize {
        (self.capacity_multiplier * self.batch_size).max(MIN_QUEUE_CAPACITY)
    }
}
