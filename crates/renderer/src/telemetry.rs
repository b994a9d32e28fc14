use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Events the engine reports to its host while running.
#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
    /// Simulation time after the tick's clock step, emitted every tick.
    Time(f32),
    /// Renders counted over the last second.
    Fps(u32),
    /// Wall-clock duration of the first draw after a program change.
    CompileTime { pass: String, duration: Duration },
    CompileFailed { pass: String, message: String },
    AssetReady { id: String, slot: usize },
    AssetFailed { id: String, message: String },
}

const CHANNEL_CAPACITY: usize = 1024;

/// Non-blocking publisher; a lagging host loses events instead of stalling the tick.
#[derive(Debug, Clone)]
pub(crate) struct TelemetrySink {
    sender: Sender<Telemetry>,
}

impl TelemetrySink {
    pub(crate) fn channel() -> (Self, Receiver<Telemetry>) {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        (Self { sender }, receiver)
    }

    pub(crate) fn emit(&self, event: Telemetry) {
        if let Err(TrySendError::Full(event)) = self.sender.try_send(event) {
            tracing::trace!(?event, "telemetry channel full; dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (sink, receiver) = TelemetrySink::channel();
        for _ in 0..CHANNEL_CAPACITY + 10 {
            sink.emit(Telemetry::Fps(1));
        }
        assert_eq!(receiver.try_iter().count(), CHANNEL_CAPACITY);
    }

    #[test]
    fn disconnected_host_is_ignored() {
        let (sink, receiver) = TelemetrySink::channel();
        drop(receiver);
        sink.emit(Telemetry::Time(1.0));
    }
}
