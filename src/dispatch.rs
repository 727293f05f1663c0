//! Single-owner dispatch for multi-producer ingestion.
//!
//! The engine is not thread-safe by itself: every state change goes through
//! `&mut self`. When several feeds produce events concurrently, an
//! [`EngineWorker`] moves the engine onto a dedicated thread and serializes
//! all input through one bounded channel.
//!
//! ```text
//!  feed ─┐
//!  feed ─┼──▶ [bounded channel] ──▶ worker thread ──▶ engine ──▶ emitters
//!  feed ─┘
//! ```

use crate::core::engine::WindowedAggregationEngine;
use crate::core::event::Event;
use crate::error::DispatchError;
use crate::metrics::{MetricsSnapshot, SharedEngineMetrics};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Default queue depth between feeds and the worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

enum Command {
    Event(Event),
    Flush,
    Shutdown,
}

/// A cloneable handle for pushing events into a running worker.
#[derive(Clone)]
pub struct EventFeed {
    sender: Sender<Command>,
}

impl EventFeed {
    /// Queue an event, blocking while the queue is full.
    pub fn send(&self, event: Event) -> Result<(), DispatchError> {
        self.sender
            .send(Command::Event(event))
            .map_err(|_| DispatchError::Closed)
    }

    /// Ask the worker to flush every open window once queued events are done.
    pub fn flush(&self) -> Result<(), DispatchError> {
        self.sender
            .send(Command::Flush)
            .map_err(|_| DispatchError::Closed)
    }
}

/// Owns an engine on a background thread.
pub struct EngineWorker {
    feed: EventFeed,
    metrics: SharedEngineMetrics,
    handle: Option<JoinHandle<WindowedAggregationEngine>>,
}

impl EngineWorker {
    /// Start a worker with the default queue depth.
    pub fn spawn(engine: WindowedAggregationEngine) -> Result<Self, DispatchError> {
        Self::with_capacity(engine, DEFAULT_QUEUE_CAPACITY)
    }

    /// Start a worker with a specific queue depth.
    pub fn with_capacity(
        engine: WindowedAggregationEngine,
        capacity: usize,
    ) -> Result<Self, DispatchError> {
        // Use a bounded channel to prevent unbounded memory growth
        let (sender, receiver) = bounded(capacity.max(1));
        let metrics = engine.metrics();

        let handle = thread::Builder::new()
            .name(format!("window-engine-{}", engine.id()))
            .spawn(move || run_worker(engine, receiver))?;

        Ok(Self {
            feed: EventFeed { sender },
            metrics,
            handle: Some(handle),
        })
    }

    /// Get a new producer handle.
    pub fn feed(&self) -> EventFeed {
        self.feed.clone()
    }

    /// Live counters of the engine running on the worker.
    pub fn metrics(&self) -> &SharedEngineMetrics {
        &self.metrics
    }

    /// Drain queued events, flush, stop the worker and return the final counters.
    ///
    /// Events queued behind the shutdown request are discarded; once the
    /// worker has stopped, sends fail with [`DispatchError::Closed`].
    pub fn shutdown(mut self) -> Result<MetricsSnapshot, DispatchError> {
        self.stop()?;
        Ok(self.metrics.stats())
    }

    fn stop(&mut self) -> Result<(), DispatchError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // The worker may already be gone if it panicked; join reports that.
        let _ = self.feed.sender.send(Command::Shutdown);
        let engine = handle.join().map_err(|_| DispatchError::WorkerPanicked)?;
        drop(engine);
        Ok(())
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn run_worker(
    mut engine: WindowedAggregationEngine,
    receiver: Receiver<Command>,
) -> WindowedAggregationEngine {
    debug!(engine = %engine.id(), "engine worker started");

    for command in receiver.iter() {
        match command {
            Command::Event(event) => {
                // Rejections are already counted and logged by the engine.
                let _ = engine.process(event);
            }
            Command::Flush => {
                engine.flush();
            }
            Command::Shutdown => break,
        }
    }

    // Channel closed or shutdown requested: nothing else will arrive.
    engine.flush();
    debug!(engine = %engine.id(), "engine worker stopped");
    engine
}
