// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::SinkError;
use async_trait::async_trait;

/// Destination store accepting batched writes.
///
/// Injected into the relay at construction; the engine never constructs a
/// sink itself. Implementations are expected to carry their own request
/// timeout so a hung destination cannot stall a flush forever.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Write one batch of rows to `table`. Any error outcome is treated
    /// uniformly by the engine as a failed flush; no distinction is made
    /// between partial and total failure.
    async fn insert(&self, table: &str, rows: Vec<serde_json::Value>) -> Result<(), SinkError>;

    /// Reachability probe, used at startup and in the shutdown snapshot.
    async fn ping(&self) -> Result<(), SinkError>;

    /// Release any held connections. Called once, at the end of shutdown.
    async fn close(&self) {}
}
