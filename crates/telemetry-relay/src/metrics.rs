// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-pipeline flush counters.
//!
//! Counters are plain atomics so health checks can read them concurrently
//! with enqueue and flush activity without taking the pipeline mutex. They
//! are never reset for the lifetime of the process.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default)]
pub struct PipelineMetrics {
    success_count: AtomicU64,
    failure_count: AtomicU64,
    total_flushed: AtomicU64,
    /// Unix milliseconds of the last successful flush; 0 means never.
    last_flush_unix_ms: AtomicU64,
}

impl PipelineMetrics {
    /// One rejected admission or one failed flush attempt. Incremented once
    /// per event dropped at admission and once per failed flush, not once
    /// per event lost in a failed batch.
    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush_success(&self, batch_len: usize) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.total_flushed
            .fetch_add(batch_len as u64, Ordering::Relaxed);
        self.last_flush_unix_ms.store(now_unix_ms(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let last = self.last_flush_unix_ms.load(Ordering::Relaxed);
        MetricsSnapshot {
            success_count: self.success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            total_flushed: self.total_flushed.load(Ordering::Relaxed),
            last_flush_unix_ms: (last != 0).then_some(last),
        }
    }
}

/// Point-in-time copy of a pipeline's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub success_count: u64,
    pub failure_count: u64,
    pub total_flushed: u64,
    pub last_flush_unix_ms: Option<u64>,
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
