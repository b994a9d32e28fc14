use std::time::Duration;

pub use project::{FINAL_PASS_ID, MAX_BUFFERS, MAX_TEXTURES};

/// Every pass exposes four cross-pass samplers (`iChannel0-3`).
pub const CHANNEL_COUNT: usize = 4;

/// Pixel dimensions of the display surface and of every buffer target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    /// Builds a size, clamping each dimension to at least one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// `iResolution` value: width, height, pixel aspect of 1.
    pub fn as_resolution(&self) -> [f32; 3] {
        [self.width as f32, self.height as f32, 1.0]
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Host-controlled playback settings, applied on the next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    pub is_playing: bool,
    pub target_fps: u32,
    pub time_scale: f32,
}

impl PlaybackParams {
    pub const MIN_FPS: u32 = 1;
    pub const MAX_FPS: u32 = 60;
    pub const MAX_TIME_SCALE: f32 = 4.0;

    /// Clamps `target_fps` to 1..=60 and `time_scale` to 0.0..=4.0.
    pub fn normalized(self) -> Self {
        let time_scale = if self.time_scale.is_finite() {
            self.time_scale.clamp(0.0, Self::MAX_TIME_SCALE)
        } else {
            1.0
        };
        Self {
            is_playing: self.is_playing,
            target_fps: self.target_fps.clamp(Self::MIN_FPS, Self::MAX_FPS),
            time_scale,
        }
    }

    /// Minimum spacing between two rendered ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.target_fps.max(Self::MIN_FPS)))
    }
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            is_playing: true,
            target_fps: Self::MAX_FPS,
            time_scale: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_never_collapses_to_zero() {
        assert_eq!(SurfaceSize::new(0, 0), SurfaceSize { width: 1, height: 1 });
        assert_eq!(SurfaceSize::new(640, 0).as_resolution(), [640.0, 1.0, 1.0]);
    }

    #[test]
    fn playback_params_are_clamped() {
        let params = PlaybackParams {
            is_playing: false,
            target_fps: 240,
            time_scale: 9.0,
        }
        .normalized();
        assert_eq!(params.target_fps, 60);
        assert_eq!(params.time_scale, 4.0);
        assert!(!params.is_playing);

        let params = PlaybackParams {
            is_playing: true,
            target_fps: 0,
            time_scale: f32::NAN,
        }
        .normalized();
        assert_eq!(params.target_fps, 1);
        assert_eq!(params.time_scale, 1.0);
    }

    #[test]
    fn frame_interval_follows_target_fps() {
        let params = PlaybackParams {
            target_fps: 10,
            ..PlaybackParams::default()
        };
        assert_eq!(params.frame_interval(), Duration::from_millis(100));
    }
}
