//! Multi-pass shader engine for the multipass sandbox.
//!
//! A project holds up to 26 buffer passes and a final pass, each a
//! ShaderToy-style `mainImage` body. Every rendered tick runs the buffers in
//! order into ping-pong render targets, then draws the final pass to the
//! window:
//!
//! ```text
//!   Project ──▶ Engine::new ──▶ PassProgram (assemble + validate)
//!                  │
//!   tick(now) ─────┼─▶ FrameScheduler ── throttled? ──▶ Time telemetry only
//!                  │
//!                  ├─▶ ChannelBinder ─▶ bufferA ─▶ swap ─▶ bufferB ─▶ swap ─▶ ...
//!                  │         ▲ own feedback + earlier buffers        │
//!                  │         └───────────────────────────────────────┘
//!                  └─▶ finalPass (iChannel0..3 = buffers 0..3) ─▶ surface
//! ```
//!
//! Graphics API work sits behind [`RenderBackend`]; [`gpu::WgpuBackend`] is
//! the wgpu implementation and the engine itself never touches wgpu. Texture
//! assets decode on worker threads and land in the [`TextureSlotTable`] as
//! they finish. Compile failures and frame statistics flow to the host as
//! [`Telemetry`] over a bounded channel.

mod assets;
mod backend;
mod binder;
mod compile;
mod engine;
mod error;
pub mod gpu;
mod pointer;
mod program;
mod resize;
mod scheduler;
mod slots;
mod targets;
mod telemetry;
mod types;
mod uniforms;
mod window;

pub use assets::{decode_asset, AssetLoadError, DecodedImage};
pub use backend::{DrawCall, DrawTarget, OutputKind, RenderBackend};
pub use binder::{ChannelBinder, ChannelSet, TextureRef, UNBOUND_CHANNELS};
pub use compile::{assemble_fragment, validate_fragment, ShaderError};
pub use engine::{Engine, TickOutcome};
pub use error::EngineError;
pub use pointer::PointerTracker;
pub use program::PassProgram;
pub use resize::ResizeCoordinator;
pub use scheduler::{FrameScheduler, SchedulerState};
pub use slots::{SlotUpdate, TextureSlotTable};
pub use targets::RenderTargetPair;
pub use telemetry::Telemetry;
pub use types::{PlaybackParams, SurfaceSize, CHANNEL_COUNT, FINAL_PASS_ID, MAX_BUFFERS, MAX_TEXTURES};
pub use uniforms::{PassUniforms, UniformFrame};
pub use window::{apply_project, run_sandbox, SandboxCommand, SandboxConfig};

pub use winit::event_loop::EventLoopProxy;
