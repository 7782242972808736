// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Generic event pipeline: bounded admission, capacity-triggered flushing,
//! and failed-flush recovery.
//!
//! One `Pipeline` is instantiated per event kind. All queue access is
//! serialized through a `tokio::sync::Mutex`; the sink write happens outside
//! the mutex so admission is never blocked on destination I/O. A separate
//! `flush_in_progress` flag guards against overlapping sink calls for the
//! same pipeline. The two layers protect different things: the mutex the
//! buffer's integrity, the flag the sink write for a single logical batch.

use crate::error::SinkError;
use crate::event::{ErrorLogEvent, HttpRequestEvent, TelemetryEvent, UserActivityEvent};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::queue::BatchQueue;
use crate::sink::EventSink;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

pub struct Pipeline<E> {
    table: &'static str,
    batch_size: usize,
    queue: Arc<Mutex<BatchQueue<E>>>,
    /// Mirror of the queue length, updated under the mutex, so health
    /// checks never contend with enqueue or flush.
    depth: Arc<AtomicUsize>,
    flush_in_progress: Arc<AtomicBool>,
    /// Cleared for the process lifetime when the startup ping fails.
    delivery_enabled: Arc<AtomicBool>,
    metrics: Arc<PipelineMetrics>,
    sink: Arc<dyn EventSink>,
}

impl<E> Clone for Pipeline<E> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            batch_size: self.batch_size,
            queue: Arc::clone(&self.queue),
            depth: Arc::clone(&self.depth),
            flush_in_progress: Arc::clone(&self.flush_in_progress),
            delivery_enabled: Arc::clone(&self.delivery_enabled),
            metrics: Arc::clone(&self.metrics),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<E: TelemetryEvent> Pipeline<E> {
    pub fn new(batch_size: usize, capacity: usize, sink: Arc<dyn EventSink>) -> Self {
        Self {
            table: E::TABLE,
            batch_size,
            queue: Arc::new(Mutex::new(BatchQueue::new(capacity))),
            depth: Arc::new(AtomicUsize::new(0)),
            flush_in_progress: Arc::new(AtomicBool::new(false)),
            delivery_enabled: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(PipelineMetrics::default()),
            sink,
        }
    }

    /// Share the relay-wide delivery flag so a failed startup ping turns
    /// every pipeline's flush into a no-op.
    pub(crate) fn with_delivery_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.delivery_enabled = flag;
        self
    }

    /// Admit one event. Never fails to the caller: a full queue drops the
    /// event, counts a failure and logs a warning. Reaching the soft batch
    /// threshold schedules a detached flush; the caller never waits on or
    /// observes its outcome.
    pub async fn enqueue(&self, event: E) {
        let len = {
            let mut queue = self.queue.lock().await;
            if !queue.try_append(event) {
                drop(queue);
                self.metrics.record_failure();
                warn!(
                    "{} queue at capacity, dropping event (capacity exceeded)",
                    self.table
                );
                return;
            }
            let len = queue.len();
            self.depth.store(len, Ordering::Relaxed);
            len
        };

        if len >= self.batch_size {
            let pipeline = self.clone();
            // Fire-and-forget; a panic inside the flush is contained by the
            // task boundary and cannot reach the producer.
            tokio::spawn(async move {
                pipeline.flush().await;
            });
        }
    }

    /// Extract the current queue contents and write them to the sink.
    ///
    /// A no-op when a flush for this pipeline is already in flight or when
    /// delivery is disabled. On failure the batch is returned to the front
    /// of the queue if it still fits in its entirety; otherwise it is
    /// dropped whole and the loss is logged.
    pub async fn flush(&self) {
        if self.flush_in_progress.swap(true, Ordering::AcqRel) {
            return;
        }
        // Unmarks on every exit path, including panics in the sink call.
        let _guard = FlushGuard {
            flag: &self.flush_in_progress,
        };

        if !self.delivery_enabled.load(Ordering::Relaxed) {
            return;
        }

        let batch = {
            let mut queue = self.queue.lock().await;
            let batch = queue.drain_all();
            self.depth.store(0, Ordering::Relaxed);
            batch
        };
        if batch.is_empty() {
            return;
        }

        let batch_len = batch.len();
        debug!("flushing {batch_len} events to {}", self.table);

        let outcome = match encode_rows(&batch) {
            Ok(rows) => self.sink.insert(self.table, rows).await,
            Err(e) => Err(SinkError::Transport(format!("failed to encode rows: {e}"))),
        };

        match outcome {
            Ok(()) => {
                self.metrics.record_flush_success(batch_len);
                debug!("successfully flushed {batch_len} events to {}", self.table);
            }
            Err(err) => {
                self.metrics.record_failure();
                let mut queue = self.queue.lock().await;
                let requeued = queue.requeue_front(batch);
                self.depth.store(queue.len(), Ordering::Relaxed);
                drop(queue);
                if requeued {
                    error!(
                        "failed to flush {batch_len} events to {}, requeued for retry: {err}",
                        self.table
                    );
                } else {
                    error!(
                        "failed to flush to {} and queue lacks capacity, dropped {batch_len} events: {err}",
                        self.table
                    );
                }
            }
        }
    }

    /// Count a producer call rejected before admission (post-shutdown).
    pub(crate) fn record_rejected(&self) {
        self.metrics.record_failure();
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Current queue length. Lock-free; safe to call from anywhere.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

struct FlushGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn encode_rows<E: Serialize>(batch: &[E]) -> Result<Vec<serde_json::Value>, serde_json::Error> {
    batch.iter().map(serde_json::to_value).collect()
}

/// The three pipelines the relay runs, flushed together but otherwise
/// fully independent.
pub(crate) struct Pipelines {
    pub requests: Pipeline<HttpRequestEvent>,
    pub activities: Pipeline<UserActivityEvent>,
    pub errors: Pipeline<ErrorLogEvent>,
}

impl Clone for Pipelines {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
            activities: self.activities.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl Pipelines {
    /// Flush every pipeline concurrently. One pipeline's failure never
    /// prevents the others from flushing; failures are absorbed and
    /// counted inside each pipeline.
    pub async fn flush_all(&self) {
        tokio::join!(
            self.requests.flush(),
            self.activities.flush(),
            self.errors.flush(),
        );
    }

    /// Combined queue length across all three pipelines.
    pub fn total_depth(&self) -> usize {
        self.requests.depth() + self.activities.depth() + self.errors.depth()
    }

    /// Repeatedly flush until all queues are empty or the retry budget is
    /// exhausted. Returns the number of events still queued afterwards.
    pub async fn drain_with_retry(&self, attempts: u32, delay: Duration) -> usize {
        for attempt in 1..=attempts {
            self.flush_all().await;
            let remaining = self.total_depth();
            if remaining == 0 {
                return 0;
            }
            debug!("drain attempt {attempt}/{attempts}: {remaining} events still queued");
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }
        self.total_depth()
    }
}
