use crate::types::SurfaceSize;

/// Detects display-surface size changes, clamping to at least 1x1.
#[derive(Debug, Clone, Copy)]
pub struct ResizeCoordinator {
    current: SurfaceSize,
}

impl ResizeCoordinator {
    pub fn new(initial: SurfaceSize) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> SurfaceSize {
        self.current
    }

    /// Returns the clamped size when it differs from the committed one.
    pub fn propose(&self, width: u32, height: u32) -> Option<SurfaceSize> {
        let next = SurfaceSize::new(width, height);
        (next != self.current).then_some(next)
    }

    /// Records `size` once every target has been resized to it.
    pub fn commit(&mut self, size: SurfaceSize) {
        self.current = size;
    }
}
