//! The seam between the engine and a graphics API.
//!
//! The engine decides what is drawn, in which order, with which bindings; a
//! [`RenderBackend`] owns the API objects and turns each [`DrawCall`] into a
//! full-screen draw.

use anyhow::Result;

use crate::assets::DecodedImage;
use crate::types::{SurfaceSize, CHANNEL_COUNT, MAX_TEXTURES};
use crate::uniforms::PassUniforms;

/// Where a compiled program writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Floating-point buffer-pass target.
    Offscreen,
    /// The presentable display surface.
    Surface,
}

#[derive(Debug)]
pub enum DrawTarget<'a, T> {
    Offscreen(&'a T),
    Surface,
}

/// One full-screen draw of one pass.
#[derive(Debug)]
pub struct DrawCall<'a, T, P> {
    pub label: &'a str,
    pub program: &'a P,
    pub target: DrawTarget<'a, T>,
    pub uniforms: &'a PassUniforms,
    pub channels: [&'a T; CHANNEL_COUNT],
    pub textures: [&'a T; MAX_TEXTURES],
}

pub trait RenderBackend {
    type Texture;
    type Program;
    type Frame;

    /// 1x1 opaque white texture bound to every unassigned slot.
    fn create_placeholder(&mut self) -> Result<Self::Texture>;

    fn create_target(&mut self, label: &str, size: SurfaceSize) -> Result<Self::Texture>;

    /// Reallocates `target` at `size`; previous contents are discarded.
    fn resize_target(&mut self, target: &mut Self::Texture, size: SurfaceSize) -> Result<()>;

    fn upload_image(&mut self, label: &str, image: &DecodedImage) -> Result<Self::Texture>;

    /// Frees the GPU memory behind `texture` immediately.
    fn release_texture(&mut self, texture: Self::Texture);

    fn compile(&mut self, label: &str, assembled: &str, output: OutputKind)
        -> Result<Self::Program>;

    fn resize_surface(&mut self, size: SurfaceSize);

    /// `Ok(None)` when the surface cannot be drawn this tick (lost, outdated).
    fn begin_frame(&mut self) -> Result<Option<Self::Frame>>;

    fn draw(
        &mut self,
        frame: &mut Self::Frame,
        call: DrawCall<'_, Self::Texture, Self::Program>,
    ) -> Result<()>;

    /// Submits the frame's work and presents the surface.
    fn end_frame(&mut self, frame: Self::Frame) -> Result<()>;
}
