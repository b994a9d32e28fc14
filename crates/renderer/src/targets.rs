use crate::types::SurfaceSize;

/// Two equally sized offscreen surfaces owned by one buffer pass.
///
/// The pair is an index-flipped arena: `back` is written this tick and, after
/// [`swap`](Self::swap), becomes the `front` every consumer samples. Until the
/// first swap there is no front.
#[derive(Debug)]
pub struct RenderTargetPair<T> {
    surfaces: [T; 2],
    back: usize,
    rendered: bool,
    size: SurfaceSize,
}

impl<T> RenderTargetPair<T> {
    pub fn new(surfaces: [T; 2], size: SurfaceSize) -> Self {
        Self {
            surfaces,
            back: 0,
            rendered: false,
            size,
        }
    }

    pub fn back_index(&self) -> usize {
        self.back
    }

    /// Arena index of the latest output, if the pass has rendered.
    pub fn front_index(&self) -> Option<usize> {
        self.rendered.then_some(self.back ^ 1)
    }

    pub fn back(&self) -> &T {
        &self.surfaces[self.back]
    }

    pub fn front(&self) -> Option<&T> {
        self.front_index().map(|index| &self.surfaces[index])
    }

    pub fn surface(&self, index: usize) -> &T {
        &self.surfaces[index & 1]
    }

    pub fn surfaces(&self) -> &[T; 2] {
        &self.surfaces
    }

    /// Publishes `back` as the new front.
    pub fn swap(&mut self) {
        self.back ^= 1;
        self.rendered = true;
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Resizes both surfaces in place; front/back designation is kept.
    pub fn resize_with<E>(
        &mut self,
        size: SurfaceSize,
        mut resize: impl FnMut(&mut T, SurfaceSize) -> Result<(), E>,
    ) -> Result<(), E> {
        for surface in &mut self.surfaces {
            resize(surface, size)?;
        }
        self.size = size;
        Ok(())
    }

    pub fn into_surfaces(self) -> [T; 2] {
        self.surfaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_is_absent_until_first_swap() {
        let pair = RenderTargetPair::new(["a", "b"], SurfaceSize::new(2, 2));
        assert_eq!(pair.front(), None);
        assert_eq!(*pair.back(), "a");
    }

    #[test]
    fn swap_alternates_surfaces() {
        let mut pair = RenderTargetPair::new(["a", "b"], SurfaceSize::new(2, 2));
        pair.swap();
        assert_eq!(pair.front(), Some(&"a"));
        assert_eq!(*pair.back(), "b");
        pair.swap();
        assert_eq!(pair.front(), Some(&"b"));
        assert_eq!(pair.front_index(), Some(1));
        assert_eq!(pair.back_index(), 0);
    }

    #[test]
    fn resize_touches_both_surfaces() {
        let mut pair = RenderTargetPair::new(
            [SurfaceSize::new(800, 600), SurfaceSize::new(800, 600)],
            SurfaceSize::new(800, 600),
        );
        pair.swap();
        let target = SurfaceSize::new(400, 300);
        pair.resize_with::<()>(target, |surface, size| {
            *surface = size;
            Ok(())
        })
        .unwrap();
        assert_eq!(pair.surfaces(), &[target, target]);
        assert_eq!(pair.size(), target);
        assert_eq!(pair.front_index(), Some(0));
    }
}
