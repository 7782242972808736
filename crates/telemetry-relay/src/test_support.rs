// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Scripted sink and event doubles shared by the unit tests.

use crate::error::SinkError;
use crate::event::TelemetryEvent;
use crate::sink::EventSink;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize)]
pub struct TestEvent {
    pub id: u32,
}

impl TelemetryEvent for TestEvent {
    const TABLE: &'static str = "test_events";
}

/// In-memory sink recording every insert attempt. Can be scripted to fail,
/// to delay (simulating a slow destination), or to refuse pings.
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<(String, Vec<serde_json::Value>)>>,
    failing: AtomicBool,
    ping_failing: AtomicBool,
    delay_ms: AtomicU64,
    pings: AtomicU32,
    closed: AtomicBool,
}

impl RecordingSink {
    pub async fn calls(&self) -> Vec<(String, Vec<serde_json::Value>)> {
        self.calls.lock().await.clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn set_ping_failing(&self, failing: bool) {
        self.ping_failing.store(failing, Ordering::Relaxed);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn ping_count(&self) -> u32 {
        self.pings.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn insert(&self, table: &str, rows: Vec<serde_json::Value>) -> Result<(), SinkError> {
        let delay_ms = self.delay_ms.load(Ordering::Relaxed);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        self.calls.lock().await.push((table.to_string(), rows));
        if self.failing.load(Ordering::Relaxed) {
            return Err(SinkError::Status(503));
        }
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
