// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Telemetry event records, one per pipeline kind.
//!
//! Events are flat, immutable records. Once appended to a queue they are
//! owned exclusively by that queue until extracted into a flush batch.

use serde::Serialize;

/// A record destined for one of the relay's pipelines.
///
/// Binds the concrete event type to the destination table its batches are
/// written to. Implemented by the three built-in event kinds; tests provide
/// their own implementations.
pub trait TelemetryEvent: Serialize + Send + 'static {
    /// Name of the destination table in the analytics store.
    const TABLE: &'static str;
}

/// One handled HTTP request, captured at response time.
#[derive(Debug, Clone, Serialize)]
pub struct HttpRequestEvent {
    pub request_id: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    /// Total handling time in milliseconds.
    pub response_time_ms: u64,
    pub user_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub request_size_bytes: Option<u64>,
    pub response_size_bytes: Option<u64>,
    pub cache_hit: bool,
    pub error_message: Option<String>,
}

impl TelemetryEvent for HttpRequestEvent {
    const TABLE: &'static str = "http_requests";
}

/// A user-initiated action (login, resource access, mutation, ...).
#[derive(Debug, Clone, Serialize)]
pub struct UserActivityEvent {
    pub user_id: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub activity_type: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    /// Opaque, caller-defined metadata. Stored as-is.
    pub metadata: Option<String>,
}

impl TelemetryEvent for UserActivityEvent {
    const TABLE: &'static str = "user_activities";
}

/// Severity attached to an error log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// An application error, with optional request context.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorLogEvent {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub error_type: String,
    pub error_message: String,
    pub stack_trace: Option<String>,
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    pub endpoint: Option<String>,
    pub severity: ErrorSeverity,
}

impl TelemetryEvent for ErrorLogEvent {
    const TABLE: &'static str = "error_logs";
}
