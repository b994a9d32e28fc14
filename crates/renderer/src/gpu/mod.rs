//! wgpu implementation of [`RenderBackend`](crate::RenderBackend).
//!
//! - `context` owns the instance, device and surface and reconfigures the
//!   swapchain on resize or loss.
//! - `textures` creates the placeholder, float render targets and uploaded
//!   asset textures with their samplers.
//! - `pipeline` holds the three shared bind group layouts and turns assembled
//!   GLSL into render pipelines.
//! - `backend` records one command encoder per frame and presents it.

mod backend;
mod context;
mod pipeline;
mod textures;

pub use backend::{GpuFrame, WgpuBackend};
pub use pipeline::GpuProgram;
pub use textures::GpuTexture;
