//! Channel-backed sinks for consumers running on other threads.

use crate::core::accumulator::Stats;
use crate::core::event::Event;
use crate::core::windowing::Window;
use crate::emitter::types::{Emitter, LateEmitter, LateRecord, WindowResult};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};

/// Forwards results over a crossbeam channel.
///
/// A bounded channel never blocks the engine: when the consumer falls behind
/// the result is dropped and a warning is logged.
pub struct ChannelEmitter {
    sender: Sender<WindowResult>,
}

impl ChannelEmitter {
    /// Create an emitter with an unbounded buffer.
    pub fn unbounded() -> (Self, Receiver<WindowResult>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    /// Create an emitter with a fixed-size buffer.
    pub fn bounded(capacity: usize) -> (Self, Receiver<WindowResult>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl Emitter for ChannelEmitter {
    fn emit(&mut self, key: &str, window: &Window, stats: &Stats) {
        match self.sender.try_send(WindowResult::new(key, window, stats)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(key, %window, "result channel full, dropping window result");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!(key, %window, "result receiver gone");
            }
        }
    }
}

/// Forwards late events over a crossbeam channel.
pub struct LateChannel {
    sender: Sender<LateRecord>,
}

impl LateChannel {
    pub fn unbounded() -> (Self, Receiver<LateRecord>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl LateEmitter for LateChannel {
    fn emit_late(&mut self, event: &Event, window: &Window) {
        if self.sender.send(LateRecord::new(event, window)).is_err() {
            tracing::debug!(key = event.key(), "late-data receiver gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accumulator::Accumulator;
    use crate::core::windowing::WindowAssigner;
    use std::time::Duration;

    #[test]
    fn test_bounded_channel_drops_when_full() {
        let window = WindowAssigner::new(Duration::from_secs(60))
            .unwrap()
            .assign(0.0)
            .unwrap();
        let stats = Accumulator::from_values([1.0]).finalize();

        let (mut emitter, receiver) = ChannelEmitter::bounded(1);
        emitter.emit("a", &window, &stats);
        emitter.emit("b", &window, &stats);

        assert_eq!(receiver.try_recv().unwrap().key, "a");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_late_channel() {
        let window = WindowAssigner::new(Duration::from_secs(60))
            .unwrap()
            .assign(0.0)
            .unwrap();
        let (mut late, receiver) = LateChannel::unbounded();
        late.emit_late(&Event::new("a", 1.0, 5.0), &window);

        let record = receiver.try_recv().unwrap();
        assert_eq!(record.event.key(), "a");
        assert_eq!(record.window_start, window.start());
    }
}
