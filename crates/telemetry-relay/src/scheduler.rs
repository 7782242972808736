// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic all-pipelines flush.

use crate::pipeline::Pipelines;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Drives a repeating timer that flushes every pipeline.
///
/// A sweep already in flight suppresses the next tick entirely; this is a
/// throughput guard at the sweep level, distinct from the per-pipeline
/// flush-in-progress flags which prevent double-writing a single batch.
/// Collapsing the two would let a slow pipeline block capacity-triggered
/// flushes on unrelated pipelines.
pub(crate) struct FlushScheduler {
    pipelines: Pipelines,
    period: Duration,
    cancel_token: CancellationToken,
    sweep_in_progress: Arc<AtomicBool>,
}

impl FlushScheduler {
    pub fn new(pipelines: Pipelines, period: Duration, cancel_token: CancellationToken) -> Self {
        Self {
            pipelines,
            period,
            cancel_token,
            sweep_in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run until the token is cancelled. Consumed by `tokio::spawn`.
    pub async fn run(self) {
        let mut ticker = interval(self.period);
        ticker.tick().await; // discard first tick, which is instantaneous

        debug!("flush scheduler started (period {:?})", self.period);

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    debug!("flush scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if self.sweep_in_progress.swap(true, Ordering::AcqRel) {
                        debug!("flush sweep still in flight, skipping tick");
                        continue;
                    }
                    let pipelines = self.pipelines.clone();
                    let guard = SweepGuard {
                        flag: Arc::clone(&self.sweep_in_progress),
                    };
                    tokio::spawn(async move {
                        let _guard = guard;
                        pipelines.flush_all().await;
                    });
                }
            }
        }
    }
}

/// Clears the sweep flag on every exit path, so a panicking flush cannot
/// suppress all future sweeps.
struct SweepGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
