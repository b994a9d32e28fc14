use std::time::{Duration, Instant};

const FPS_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Clock bookkeeping for the tick loop: wall-clock deltas, the render
/// throttle, and the rolling one-second render counter.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    state: SchedulerState,
    last_tick: Instant,
    last_render: Instant,
    fps_window_start: Instant,
    renders_in_window: u32,
}

impl FrameScheduler {
    pub fn new(now: Instant) -> Self {
        Self {
            state: SchedulerState::Idle,
            last_tick: now,
            last_render: now,
            fps_window_start: now,
            renders_in_window: 0,
        }
    }

    /// Enters `Running`; the first delta and throttle window start at `now`.
    pub fn start(&mut self, now: Instant) {
        *self = Self {
            state: SchedulerState::Running,
            ..Self::new(now)
        };
    }

    pub fn stop(&mut self) {
        self.state = SchedulerState::Idle;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Wall-clock time since the previous tick, or `None` while idle.
    pub fn begin_tick(&mut self, now: Instant) -> Option<Duration> {
        if !self.is_running() {
            return None;
        }
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        Some(delta)
    }

    /// Throttle decision. On success the last-render mark moves to the most
    /// recent interval boundary, keeping the remainder so no drift builds up.
    pub fn should_render(&mut self, now: Instant, interval: Duration) -> bool {
        let elapsed = now.saturating_duration_since(self.last_render);
        if elapsed < interval {
            return false;
        }
        let interval_nanos = interval.as_nanos().max(1);
        let remainder = elapsed.as_nanos() % interval_nanos;
        let remainder = Duration::from_nanos(remainder as u64);
        self.last_render = now.checked_sub(remainder).unwrap_or(now);
        true
    }

    /// Counts one render; yields an FPS sample once a second has elapsed.
    pub fn record_render(&mut self, now: Instant) -> Option<u32> {
        self.renders_in_window += 1;
        if now.saturating_duration_since(self.fps_window_start) < FPS_WINDOW {
            return None;
        }
        let sample = self.renders_in_window;
        self.renders_in_window = 0;
        self.fps_window_start = now;
        Some(sample)
    }
}
