// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-process telemetry event batching and flush engine.
//!
//! Producers emit HTTP request records, user-activity events, and error
//! logs through [`TelemetryRelay`]; the relay coalesces them into batches
//! and writes them to an injected [`EventSink`] without ever blocking or
//! failing the emitting request path. Bursts are absorbed by bounded
//! per-pipeline queues; destination outages cost at most the queued
//! events, and every loss is counted and logged.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod queue;
mod relay;
mod scheduler;
pub mod sink;

#[cfg(test)]
mod test_support;

pub use config::RelayConfig;
pub use error::{ConfigError, SinkError};
pub use event::{
    ErrorLogEvent, ErrorSeverity, HttpRequestEvent, TelemetryEvent, UserActivityEvent,
};
pub use metrics::MetricsSnapshot;
pub use pipeline::Pipeline;
pub use relay::{HealthStatus, RelayState, TelemetryRelay};
pub use sink::EventSink;
