use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use chrono::{Datelike, Local, Timelike};

use crate::types::{PlaybackParams, SurfaceSize};

/// std140 image of the `PassParams` uniform block declared by every pass.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassUniforms {
    pub i_resolution: [f32; 3],
    pub i_time: f32,
    pub i_time_delta: f32,
    pub i_frame: i32,
    pub target_flip: f32,
    pub padding0: f32,
    pub i_mouse: [f32; 4],
    pub i_date: [f32; 4],
}

unsafe impl Zeroable for PassUniforms {}
unsafe impl Pod for PassUniforms {}

/// Per-tick values broadcast to every pass.
///
/// Time and frame advance only while playing; the delta is always the raw
/// wall-clock gap since the previous tick.
#[derive(Debug, Clone)]
pub struct UniformFrame {
    time: f64,
    delta: f32,
    frame_index: u32,
    date: [f32; 4],
    mouse: [f32; 4],
    resolution: SurfaceSize,
}

impl UniformFrame {
    pub fn new(resolution: SurfaceSize) -> Self {
        let mut frame = Self {
            time: 0.0,
            delta: 0.0,
            frame_index: 0,
            date: [0.0; 4],
            mouse: [0.0; 4],
            resolution,
        };
        frame.refresh_date();
        frame
    }

    pub fn advance(&mut self, delta: Duration, playback: &PlaybackParams) {
        self.delta = delta.as_secs_f32();
        if playback.is_playing {
            self.time += delta.as_secs_f64() * f64::from(playback.time_scale);
            self.frame_index = self.frame_index.saturating_add(1);
        }
    }

    /// Zeroes time, delta, and frame counter.
    pub fn reset_clock(&mut self) {
        self.time = 0.0;
        self.delta = 0.0;
        self.frame_index = 0;
    }

    pub fn set_resolution(&mut self, resolution: SurfaceSize) {
        self.resolution = resolution;
    }

    pub fn set_mouse(&mut self, mouse: [f32; 4]) {
        self.mouse = mouse;
    }

    pub fn refresh_date(&mut self) {
        let local_now = Local::now();
        let seconds_since_midnight = local_now.num_seconds_from_midnight() as f32
            + local_now.nanosecond() as f32 / 1_000_000_000.0;
        self.date = [
            local_now.year() as f32,
            local_now.month() as f32,
            local_now.day() as f32,
            seconds_since_midnight,
        ];
    }

    pub fn time(&self) -> f32 {
        self.time as f32
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn date(&self) -> [f32; 4] {
        self.date
    }

    pub fn mouse(&self) -> [f32; 4] {
        self.mouse
    }

    pub fn resolution(&self) -> SurfaceSize {
        self.resolution
    }

    /// Uniform block contents for one draw. Offscreen targets are written
    /// upside down so that texel row 0 holds `fragCoord.y == 0.5`.
    pub fn pass_uniforms(&self, offscreen: bool) -> PassUniforms {
        PassUniforms {
            i_resolution: self.resolution.as_resolution(),
            i_time: self.time(),
            i_time_delta: self.delta,
            i_frame: self.frame_index.min(i32::MAX as u32) as i32,
            target_flip: if offscreen { 1.0 } else { 0.0 },
            padding0: 0.0,
            i_mouse: self.mouse,
            i_date: self.date,
        }
    }
}
