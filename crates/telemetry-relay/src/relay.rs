// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The relay: producer-facing API, lifecycle, and shutdown sequencing.

use crate::config::RelayConfig;
use crate::error::ConfigError;
use crate::event::{ErrorLogEvent, HttpRequestEvent, TelemetryEvent, UserActivityEvent};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{Pipeline, Pipelines};
use crate::scheduler::FlushScheduler;
use crate::sink::EventSink;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of the relay. Moves forward only: `Running` to
/// `ShuttingDown` exactly once, then `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Running,
    ShuttingDown,
    Closed,
}

impl RelayState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RelayState::Running,
            1 => RelayState::ShuttingDown,
            _ => RelayState::Closed,
        }
    }
}

/// Read-only view returned by [`TelemetryRelay::health_check`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Sum of all three pipeline queue lengths.
    pub queue_size: usize,
    pub requests: MetricsSnapshot,
    pub activities: MetricsSnapshot,
    pub errors: MetricsSnapshot,
}

/// In-process telemetry ingestion engine.
///
/// Three independent pipelines (HTTP requests, user activities, error
/// logs) share one injected sink. Producers hand events over through the
/// `track_*` methods and never observe back-pressure, latency, or
/// failure; all delivery trouble is absorbed, counted, and logged.
pub struct TelemetryRelay {
    config: RelayConfig,
    pipelines: Pipelines,
    sink: Arc<dyn EventSink>,
    state: Arc<AtomicU8>,
    delivery_enabled: Arc<AtomicBool>,
    cancel_token: CancellationToken,
}

impl TelemetryRelay {
    /// Validate the configuration, probe the sink, and start the flush
    /// scheduler.
    ///
    /// A failed startup ping does not fail construction: the relay comes
    /// up with delivery disabled for the process lifetime, still accepting
    /// events up to queue capacity.
    pub async fn start(
        config: RelayConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let delivery_enabled = Arc::new(AtomicBool::new(true));
        let capacity = config.queue_capacity();
        let pipelines = Pipelines {
            requests: Pipeline::<HttpRequestEvent>::new(
                config.batch_size,
                capacity,
                Arc::clone(&sink),
            )
            .with_delivery_flag(Arc::clone(&delivery_enabled)),
            activities: Pipeline::<UserActivityEvent>::new(
                config.batch_size,
                capacity,
                Arc::clone(&sink),
            )
            .with_delivery_flag(Arc::clone(&delivery_enabled)),
            errors: Pipeline::<ErrorLogEvent>::new(config.batch_size, capacity, Arc::clone(&sink))
                .with_delivery_flag(Arc::clone(&delivery_enabled)),
        };

        let relay = Self {
            config,
            pipelines,
            sink,
            state: Arc::new(AtomicU8::new(0)),
            delivery_enabled,
            cancel_token: CancellationToken::new(),
        };

        if !relay.config.enabled {
            info!("telemetry relay disabled by configuration");
            relay.delivery_enabled.store(false, Ordering::Relaxed);
            return Ok(relay);
        }

        match relay.sink.ping().await {
            Ok(()) => debug!("telemetry sink reachable"),
            Err(e) => {
                error!("telemetry sink unreachable at startup, delivery disabled: {e}");
                relay.delivery_enabled.store(false, Ordering::Relaxed);
            }
        }

        if relay.delivery_enabled.load(Ordering::Relaxed) {
            let scheduler = FlushScheduler::new(
                relay.pipelines.clone(),
                relay.config.flush_interval,
                relay.cancel_token.clone(),
            );
            tokio::spawn(scheduler.run());
        }

        Ok(relay)
    }

    /// Record one handled HTTP request. Synchronous, non-throwing,
    /// fire-and-forget.
    pub fn track_http_request(&self, event: HttpRequestEvent) {
        self.track(event, &self.pipelines.requests);
    }

    /// Record one user activity. Synchronous, non-throwing,
    /// fire-and-forget.
    pub fn track_user_activity(&self, event: UserActivityEvent) {
        self.track(event, &self.pipelines.activities);
    }

    /// Record one application error. Synchronous, non-throwing,
    /// fire-and-forget.
    pub fn log_error(&self, event: ErrorLogEvent) {
        self.track(event, &self.pipelines.errors);
    }

    fn track<E: TelemetryEvent>(&self, event: E, pipeline: &Pipeline<E>) {
        if !self.config.enabled {
            return;
        }
        if self.state() != RelayState::Running {
            pipeline.record_rejected();
            debug!(
                "relay is shutting down, rejecting event for {}",
                pipeline.table()
            );
            return;
        }
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline.enqueue(event).await;
        });
    }

    pub fn state(&self) -> RelayState {
        RelayState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Point-in-time health view. Lock-free; safe to call concurrently
    /// with everything else.
    pub fn health_check(&self) -> HealthStatus {
        HealthStatus {
            healthy: self.config.enabled
                && self.delivery_enabled.load(Ordering::Relaxed)
                && self.state() == RelayState::Running,
            queue_size: self.pipelines.total_depth(),
            requests: self.pipelines.requests.metrics(),
            activities: self.pipelines.activities.metrics(),
            errors: self.pipelines.errors.metrics(),
        }
    }

    /// Drain and close the relay.
    ///
    /// Sequence: health snapshot for post-mortem logging, scheduler
    /// cancellation, bounded-retry drain, final metrics report, sink
    /// close. Only the first caller performs the sequence; the relay ends
    /// up `Closed` regardless of whether the drain fully succeeded.
    pub async fn shutdown(&self) {
        if self
            .state
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if !self.config.enabled {
            self.sink.close().await;
            self.state.store(2, Ordering::Release);
            return;
        }

        let snapshot = self.health_check();
        match self.sink.ping().await {
            Ok(()) => info!(
                "shutting down: sink reachable, {} events queued",
                snapshot.queue_size
            ),
            Err(e) => warn!(
                "shutting down: failed to capture sink health ({} events queued): {e}",
                snapshot.queue_size
            ),
        }

        self.cancel_token.cancel();

        let remaining = self
            .pipelines
            .drain_with_retry(
                self.config.shutdown_retry_attempts,
                self.config.shutdown_retry_delay,
            )
            .await;
        if remaining > 0 {
            error!(
                "shutdown drain exhausted after {} attempts, {remaining} events permanently lost",
                self.config.shutdown_retry_attempts
            );
        } else {
            info!("all telemetry queues drained");
        }

        // Read fresh counters here, not the pre-drain snapshot: the drain
        // itself flushes and fails
        for (table, metrics) in [
            (
                self.pipelines.requests.table(),
                self.pipelines.requests.metrics(),
            ),
            (
                self.pipelines.activities.table(),
                self.pipelines.activities.metrics(),
            ),
            (
                self.pipelines.errors.table(),
                self.pipelines.errors.metrics(),
            ),
        ] {
            info!(
                "final metrics for {table}: success={} failure={} flushed={}",
                metrics.success_count, metrics.failure_count, metrics.total_flushed
            );
        }

        self.sink.close().await;
        self.state.store(2, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;
    use tokio::time::{sleep, Duration};

    fn activity(id: &str) -> UserActivityEvent {
        UserActivityEvent {
            user_id: id.to_string(),
            timestamp: 0,
            activity_type: "login".to_string(),
            resource_type: None,
            resource_id: None,
            metadata: None,
        }
    }

    fn test_config() -> RelayConfig {
        RelayConfig {
            batch_size: 100,
            flush_interval: Duration::from_millis(10_000),
            shutdown_retry_attempts: 2,
            shutdown_retry_delay: Duration::from_millis(10),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_pings_sink() {
        let sink = Arc::new(RecordingSink::default());
        let relay = TelemetryRelay::start(test_config(), Arc::clone(&sink) as Arc<dyn EventSink>)
            .await
            .unwrap();

        assert_eq!(sink.ping_count(), 1);
        assert_eq!(relay.state(), RelayState::Running);
        assert!(relay.health_check().healthy);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let config = RelayConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(TelemetryRelay::start(config, sink).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_ping_disables_delivery() {
        let sink = Arc::new(RecordingSink::default());
        sink.set_ping_failing(true);
        let relay = TelemetryRelay::start(test_config(), Arc::clone(&sink) as Arc<dyn EventSink>)
            .await
            .unwrap();

        assert!(!relay.health_check().healthy);

        relay.track_user_activity(activity("u1"));
        sleep(Duration::from_millis(50)).await;

        // Still admitted, never delivered
        assert_eq!(relay.health_check().queue_size, 1);
        assert!(sink.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_relay_discards_events() {
        let sink = Arc::new(RecordingSink::default());
        let config = RelayConfig {
            enabled: false,
            ..test_config()
        };
        let relay = TelemetryRelay::start(config, Arc::clone(&sink) as Arc<dyn EventSink>)
            .await
            .unwrap();

        assert_eq!(sink.ping_count(), 0);
        relay.track_user_activity(activity("u1"));
        sleep(Duration::from_millis(50)).await;

        let health = relay.health_check();
        assert!(!health.healthy);
        assert_eq!(health.queue_size, 0);
        assert_eq!(health.activities.failure_count, 0);

        relay.shutdown().await;
        assert_eq!(relay.state(), RelayState::Closed);
        assert!(sink.is_closed());
    }

    #[tokio::test]
    async fn test_tracking_after_shutdown_is_rejected_and_counted() {
        let sink = Arc::new(RecordingSink::default());
        let relay = TelemetryRelay::start(test_config(), Arc::clone(&sink) as Arc<dyn EventSink>)
            .await
            .unwrap();

        relay.shutdown().await;
        assert_eq!(relay.state(), RelayState::Closed);

        relay.track_user_activity(activity("u1"));
        let health = relay.health_check();
        assert_eq!(health.queue_size, 0);
        assert_eq!(health.activities.failure_count, 1);
    }

    #[tokio::test]
    async fn test_shutdown_is_performed_once() {
        let sink = Arc::new(RecordingSink::default());
        let relay = TelemetryRelay::start(test_config(), Arc::clone(&sink) as Arc<dyn EventSink>)
            .await
            .unwrap();

        relay.track_user_activity(activity("u1"));
        sleep(Duration::from_millis(50)).await;

        tokio::join!(relay.shutdown(), relay.shutdown());

        assert_eq!(relay.state(), RelayState::Closed);
        assert!(sink.is_closed());
        // One delivery of the queued event, not two
        assert_eq!(sink.calls().await.len(), 1);
    }
}
