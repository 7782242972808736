// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded FIFO buffer underlying each pipeline.
//!
//! The queue owns no concurrency logic; the pipeline serializes all access
//! through its mutex. Capacity is fixed at construction and is never
//! exceeded, even transiently: admission is rejected, not queued-then-trimmed.

use std::collections::VecDeque;

/// Append-only event buffer with a hard capacity.
#[derive(Debug)]
pub struct BatchQueue<E> {
    buffer: VecDeque<E>,
    capacity: usize,
}

impl<E> BatchQueue<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::new(),
            capacity,
        }
    }

    /// Append `event` unless the queue is at capacity. Returns whether the
    /// event was admitted; a rejected event is dropped by the caller.
    pub fn try_append(&mut self, event: E) -> bool {
        if self.buffer.len() >= self.capacity {
            return false;
        }
        self.buffer.push_back(event);
        true
    }

    /// Remove and return the entire current contents in FIFO order.
    ///
    /// This is an atomic snapshot-and-clear: events enqueued after the call
    /// land in a fresh buffer and are untouched by the in-flight flush.
    pub fn drain_all(&mut self) -> Vec<E> {
        self.buffer.drain(..).collect()
    }

    /// Return a failed batch to the front of the queue so recovered events
    /// are replayed before anything enqueued after the failure.
    ///
    /// All-or-nothing: if the batch no longer fits, none of it is restored
    /// and the caller reports the loss. Partial requeue is intentionally not
    /// attempted.
    pub fn requeue_front(&mut self, events: Vec<E>) -> bool {
        if self.buffer.len() + events.len() >= self.capacity {
            return false;
        }
        for event in events.into_iter().rev() {
            self.buffer.push_front(event);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
