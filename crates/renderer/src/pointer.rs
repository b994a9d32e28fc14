/// Pointer state in the `iMouse` convention.
///
/// `x`/`y` follow the cursor at all times, measured from the bottom-left of
/// the surface. `z`/`w` hold the last press position and turn negative once
/// the button is released.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerTracker {
    position: [f32; 2],
    press: [f32; 2],
    pressed: bool,
    surface_height: f32,
}

impl PointerTracker {
    pub fn new(surface_height: u32) -> Self {
        Self {
            surface_height: surface_height as f32,
            ..Self::default()
        }
    }

    pub fn set_surface_height(&mut self, surface_height: u32) {
        self.surface_height = surface_height as f32;
    }

    /// `x`/`y` are surface-local with a top-left origin, as windowing systems report them.
    pub fn handle_cursor_moved(&mut self, x: f64, y: f64) {
        self.position = [x as f32, self.surface_height - y as f32];
    }

    pub fn handle_press(&mut self) {
        self.pressed = true;
        self.press = self.position;
    }

    pub fn handle_release(&mut self) {
        self.pressed = false;
        self.press = [-self.press[0].abs(), -self.press[1].abs()];
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn as_uniform(&self) -> [f32; 4] {
        [
            self.position[0],
            self.position[1],
            self.press[0],
            self.press[1],
        ]
    }
}
