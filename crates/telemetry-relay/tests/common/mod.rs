// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock sink implementations for relay integration tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use telemetry_relay::{EventSink, SinkError};
use tokio::sync::Mutex;

/// Scriptable in-memory sink recording every insert attempt.
#[derive(Default)]
pub struct MockSink {
    calls: Mutex<Vec<(String, Vec<serde_json::Value>)>>,
    failing: AtomicBool,
    ping_failing: AtomicBool,
    pings: AtomicU32,
    accepted: AtomicUsize,
    closed: AtomicBool,
}

impl MockSink {
    pub async fn calls(&self) -> Vec<(String, Vec<serde_json::Value>)> {
        self.calls.lock().await.clone()
    }

    /// Total rows across all successful insert calls, counted per call so
    /// toggling the failure switch mid-test cannot rewrite history.
    pub fn rows_accepted(&self) -> usize {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn set_ping_failing(&self, failing: bool) {
        self.ping_failing.store(failing, Ordering::Relaxed);
    }

    pub fn ping_count(&self) -> u32 {
        self.pings.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventSink for MockSink {
    async fn insert(&self, table: &str, rows: Vec<serde_json::Value>) -> Result<(), SinkError> {
        let row_count = rows.len();
        self.calls.lock().await.push((table.to_string(), rows));
        if self.failing.load(Ordering::Relaxed) {
            return Err(SinkError::Status(503));
        }
        self.accepted.fetch_add(row_count, Ordering::Relaxed);
        Ok(())
    }

    async fn ping(&self) -> Result<(), SinkError> {
        self.pings.fetch_add(1, Ordering::Relaxed);
        if self.ping_failing.load(Ordering::Relaxed) {
            return Err(SinkError::Unavailable("scripted ping failure".to_string()));
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}
