// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors reported by an [`EventSink`](crate::sink::EventSink).
///
/// The engine treats every variant uniformly as "flush failed"; the
/// distinction only matters for logging and for sink implementations.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink request failed: {0}")]
    Transport(String),

    #[error("sink rejected batch with status {0}")]
    Status(u16),

    #[error("sink unreachable: {0}")]
    Unavailable(String),
}

/// Errors raised while building a [`RelayConfig`](crate::config::RelayConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
