// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! ClickHouse sink for the telemetry relay.
//!
//! Writes batches through the ClickHouse HTTP interface using
//! `INSERT ... FORMAT JSONEachRow`, and probes reachability via `/ping`.
//! The request timeout is baked into the HTTP client, so a hung server
//! can never stall a flush beyond the configured bound.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use async_trait::async_trait;
use std::env;
use std::time::Duration;
use telemetry_relay::{ConfigError, EventSink, SinkError};
use tracing::{debug, error};

/// Connection settings for the ClickHouse HTTP interface.
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    /// Base URL of the HTTP interface, e.g. `http://localhost:8123`.
    pub url: String,
    /// Database the telemetry tables live in.
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout covering connect, write, and response.
    pub timeout: Duration,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: "default".to_string(),
            user: None,
            password: None,
            timeout: Duration::from_millis(5_000),
        }
    }
}

impl ClickHouseConfig {
    /// Create configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            url: env::var("TELEMETRY_CLICKHOUSE_URL").unwrap_or(defaults.url),
            database: env::var("TELEMETRY_CLICKHOUSE_DATABASE").unwrap_or(defaults.database),
            user: env::var("TELEMETRY_CLICKHOUSE_USER").ok(),
            password: env::var("TELEMETRY_CLICKHOUSE_PASSWORD").ok(),
            timeout: env::var("TELEMETRY_CLICKHOUSE_TIMEOUT_MS")
                .ok()
                .and_then(|val| val.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "ClickHouse URL cannot be empty".to_string(),
            ));
        }

        if self.database.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "ClickHouse database cannot be empty".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "ClickHouse timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// [`EventSink`] implementation backed by the ClickHouse HTTP interface.
pub struct ClickHouseSink {
    client: reqwest::Client,
    config: ClickHouseConfig,
}

impl ClickHouseSink {
    pub fn new(config: ClickHouseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ConfigError::InvalidConfig(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl EventSink for ClickHouseSink {
    async fn insert(&self, table: &str, rows: Vec<serde_json::Value>) -> Result<(), SinkError> {
        let mut body = String::new();
        for row in &rows {
            body.push_str(&row.to_string());
            body.push('\n');
        }
        let query = format!(
            "INSERT INTO {}.{} FORMAT JSONEachRow",
            self.config.database, table
        );

        let mut request = self
            .client
            .post(&self.config.url)
            .query(&[("query", query.as_str())])
            .body(body);
        if let Some(user) = &self.config.user {
            request = request.header("X-ClickHouse-User", user);
        }
        if let Some(password) = &self.config.password {
            request = request.header("X-ClickHouse-Key", password);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("clickhouse rejected insert into {table}: {status}: {detail}");
            return Err(SinkError::Status(status.as_u16()));
        }

        debug!("inserted {} rows into {table}", rows.len());
        Ok(())
    }

    async fn ping(&self) -> Result<(), SinkError> {
        let url = format!("{}/ping", self.config.url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SinkError::Unavailable(format!(
                "ping returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
