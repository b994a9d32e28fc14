//! The multi-pass tick loop.
//!
//! Each rendered tick draws every buffer pass in order into the back surface
//! of its target pair and swaps the pair, then draws the final pass to the
//! display surface. Bindings come from [`ChannelBinder`], so a pass sees its
//! own previous output on channel 0 and the current output of earlier buffers
//! on channels 1-3.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use project::{Project, TextureAsset};
use tracing::{debug, info, warn};

use crate::assets::{AssetLoader, LoadedAsset};
use crate::backend::{DrawCall, DrawTarget, OutputKind, RenderBackend};
use crate::binder::{ChannelBinder, ChannelSet, TextureRef, UNBOUND_CHANNELS};
use crate::error::EngineError;
use crate::pointer::PointerTracker;
use crate::program::PassProgram;
use crate::resize::ResizeCoordinator;
use crate::scheduler::{FrameScheduler, SchedulerState};
use crate::slots::TextureSlotTable;
use crate::targets::RenderTargetPair;
use crate::telemetry::{Telemetry, TelemetrySink};
use crate::types::{PlaybackParams, SurfaceSize, FINAL_PASS_ID, MAX_TEXTURES};
use crate::uniforms::UniformFrame;

/// Result of one [`Engine::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The engine is not running.
    Idle,
    /// Clocks advanced; drawing was skipped by the frame-rate cap.
    Throttled,
    Rendered,
    /// Clocks advanced but the display surface could not be acquired.
    SurfaceUnavailable,
    /// The backend reported an unrecoverable surface error.
    SurfaceFailed,
}

struct PassState<P> {
    program: PassProgram,
    compiled: Option<P>,
    channels: ChannelSet,
    textures: [TextureRef; MAX_TEXTURES],
}

impl<P> PassState<P> {
    fn new(program: PassProgram) -> Self {
        Self {
            program,
            compiled: None,
            channels: UNBOUND_CHANNELS,
            textures: [TextureRef::Placeholder; MAX_TEXTURES],
        }
    }
}

struct BufferPass<T, P> {
    state: PassState<P>,
    targets: RenderTargetPair<T>,
}

struct PassResources<T, P> {
    buffers: Vec<BufferPass<T, P>>,
    final_pass: PassState<P>,
    slots: TextureSlotTable<T>,
}

impl<T, P> PassResources<T, P> {
    fn outputs(&self) -> Vec<Option<usize>> {
        self.buffers
            .iter()
            .map(|pass| pass.targets.front_index())
            .collect()
    }

    fn pass_state(&self, id: &str) -> Option<&PassState<P>> {
        if id == FINAL_PASS_ID {
            return Some(&self.final_pass);
        }
        self.buffers
            .iter()
            .find(|pass| pass.state.program.id() == id)
            .map(|pass| &pass.state)
    }

    fn pass_state_mut(&mut self, id: &str) -> Option<&mut PassState<P>> {
        if id == FINAL_PASS_ID {
            return Some(&mut self.final_pass);
        }
        self.buffers
            .iter_mut()
            .find(|pass| pass.state.program.id() == id)
            .map(|pass| &mut pass.state)
    }
}

type Resources<B> = PassResources<<B as RenderBackend>::Texture, <B as RenderBackend>::Program>;

/// Multi-pass shader engine driving a [`RenderBackend`].
pub struct Engine<B: RenderBackend> {
    backend: B,
    resources: Option<Resources<B>>,
    project: Project,
    playback: PlaybackParams,
    uniforms: UniformFrame,
    pointer: PointerTracker,
    resize: ResizeCoordinator,
    scheduler: FrameScheduler,
    loader: AssetLoader,
    telemetry: TelemetrySink,
    telemetry_rx: Receiver<Telemetry>,
}

impl<B: RenderBackend> Engine<B> {
    /// Validates `project` and allocates every pass. The engine stays idle
    /// until [`start`](Self::start).
    pub fn new(
        backend: B,
        project: Project,
        playback: PlaybackParams,
        size: SurfaceSize,
    ) -> Result<Self, EngineError> {
        project.validate()?;
        let size = SurfaceSize::new(size.width, size.height);
        let (telemetry, telemetry_rx) = TelemetrySink::channel();
        let mut engine = Self {
            backend,
            resources: None,
            project,
            playback: playback.normalized(),
            uniforms: UniformFrame::new(size),
            pointer: PointerTracker::new(size.height),
            resize: ResizeCoordinator::new(size),
            scheduler: FrameScheduler::new(Instant::now()),
            loader: AssetLoader::new(),
            telemetry,
            telemetry_rx,
        };
        engine.backend.resize_surface(size);
        engine.build_resources()?;
        Ok(engine)
    }

    pub fn start(&mut self, now: Instant) {
        if self.resources.is_none() {
            warn!("engine has no passes; call reconfigure before start");
            return;
        }
        self.uniforms.refresh_date();
        self.scheduler.start(now);
        info!(
            buffers = self.project.buffers.len(),
            textures = self.project.textures.len(),
            target_fps = self.playback.target_fps,
            "engine running"
        );
    }

    /// Runs one iteration of the loop. Never fails: per-pass faults are
    /// logged and reported through telemetry.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let Some(delta) = self.scheduler.begin_tick(now) else {
            return TickOutcome::Idle;
        };
        let loaded = self.loader.drain();
        self.publish_assets(loaded);

        self.uniforms.advance(delta, &self.playback);
        self.telemetry.emit(Telemetry::Time(self.uniforms.time()));

        if !self
            .scheduler
            .should_render(now, self.playback.frame_interval())
        {
            return TickOutcome::Throttled;
        }
        if let Some(fps) = self.scheduler.record_render(now) {
            debug!(fps, time = self.uniforms.time(), "render stats");
            self.telemetry.emit(Telemetry::Fps(fps));
        }

        self.uniforms.refresh_date();
        self.uniforms.set_mouse(self.pointer.as_uniform());
        self.render()
    }

    fn render(&mut self) -> TickOutcome {
        let Some(resources) = self.resources.as_mut() else {
            return TickOutcome::Idle;
        };
        let mut frame = match self.backend.begin_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return TickOutcome::SurfaceUnavailable,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to begin frame");
                return TickOutcome::SurfaceFailed;
            }
        };

        let offscreen = self.uniforms.pass_uniforms(true);
        let onscreen = self.uniforms.pass_uniforms(false);
        let textures = resources.slots.bindings();

        for index in 0..resources.buffers.len() {
            let channels = ChannelBinder::buffer_channels(index, &resources.outputs());
            let started = Instant::now();
            let compiled_now = refresh_program(
                &mut self.backend,
                &self.telemetry,
                &mut resources.buffers[index].state,
                OutputKind::Offscreen,
            );

            let view = &*resources;
            let pass = &view.buffers[index];
            let Some(program) = pass.state.compiled.as_ref() else {
                continue;
            };
            let call = DrawCall {
                label: pass.state.program.id(),
                program,
                target: DrawTarget::Offscreen(pass.targets.back()),
                uniforms: &offscreen,
                channels: channels.map(|reference| resolve(reference, view)),
                textures: textures.map(|reference| resolve(reference, view)),
            };
            if let Err(err) = self.backend.draw(&mut frame, call) {
                warn!(pass = pass.state.program.id(), error = %format!("{err:#}"), "draw failed");
                continue;
            }
            if compiled_now {
                report_compile_time(&self.telemetry, pass.state.program.id(), started);
            }

            let pass = &mut resources.buffers[index];
            pass.state.channels = channels;
            pass.state.textures = textures;
            pass.targets.swap();
        }

        let channels = ChannelBinder::final_channels(&resources.outputs());
        let started = Instant::now();
        let compiled_now = refresh_program(
            &mut self.backend,
            &self.telemetry,
            &mut resources.final_pass,
            OutputKind::Surface,
        );
        let view = &*resources;
        if let Some(program) = view.final_pass.compiled.as_ref() {
            let call = DrawCall {
                label: FINAL_PASS_ID,
                program,
                target: DrawTarget::Surface,
                uniforms: &onscreen,
                channels: channels.map(|reference| resolve(reference, view)),
                textures: textures.map(|reference| resolve(reference, view)),
            };
            match self.backend.draw(&mut frame, call) {
                Ok(()) => {
                    if compiled_now {
                        report_compile_time(&self.telemetry, FINAL_PASS_ID, started);
                    }
                    resources.final_pass.channels = channels;
                    resources.final_pass.textures = textures;
                }
                Err(err) => {
                    warn!(pass = FINAL_PASS_ID, error = %format!("{err:#}"), "draw failed")
                }
            }
        }

        if let Err(err) = self.backend.end_frame(frame) {
            warn!(error = %format!("{err:#}"), "failed to submit frame");
        }
        TickOutcome::Rendered
    }

    /// Applies every non-empty source whose id names a pass. Other keys
    /// (notes, stale buffers) are ignored. Returns how many passes changed.
    pub fn set_sources(&mut self, sources: &BTreeMap<String, String>) -> usize {
        let mut changed = 0;
        for (id, source) in sources {
            if source.is_empty() {
                continue;
            }
            if let Ok(true) = self.set_source(id, source) {
                changed += 1;
            }
        }
        changed
    }

    /// Applies `sources` like [`set_sources`](Self::set_sources), then keeps
    /// the whole map as the project's source record so keys dropped from it
    /// are forgotten.
    pub fn replace_sources(&mut self, sources: BTreeMap<String, String>) -> usize {
        let changed = self.set_sources(&sources);
        self.project.shader_codes = sources;
        changed
    }

    /// Hot-swaps one pass's source. Simulation time and targets are kept.
    pub fn set_source(&mut self, id: &str, source: &str) -> Result<bool, EngineError> {
        let resources = self
            .resources
            .as_mut()
            .ok_or_else(|| EngineError::Configuration("engine has been shut down".into()))?;
        let state = resources
            .pass_state_mut(id)
            .ok_or_else(|| EngineError::Configuration(format!("unknown pass `{id}`")))?;
        let changed = state.program.set_source(source);
        self.project.set_source(id, source);
        if changed {
            debug!(pass = id, "pass source changed; recompiling on next render");
        }
        Ok(changed)
    }

    pub fn set_playback(&mut self, playback: PlaybackParams) {
        let playback = playback.normalized();
        if playback != self.playback {
            debug!(
                playing = playback.is_playing,
                target_fps = playback.target_fps,
                time_scale = playback.time_scale,
                "playback updated"
            );
        }
        self.playback = playback;
    }

    /// Replaces the shared texture list. Unchanged ids keep their textures;
    /// removed ones are released now; new ones decode in the background.
    pub fn set_textures(&mut self, assets: &[TextureAsset]) -> Result<(), EngineError> {
        let resources = self
            .resources
            .as_mut()
            .ok_or_else(|| EngineError::Configuration("engine has been shut down".into()))?;
        let update = resources.slots.replace(assets)?;
        for texture in update.released {
            self.backend.release_texture(texture);
        }
        for asset in update.pending {
            debug!(id = %asset.id, name = %asset.name, "decoding texture asset");
            self.loader.request(asset);
        }
        self.project.textures = assets.to_vec();
        Ok(())
    }

    /// Blocks until outstanding decodes finish (or `timeout`), publishing
    /// their textures. Returns the per-asset failures.
    pub fn await_assets(&mut self, timeout: Duration) -> Vec<EngineError> {
        let loaded = self.loader.wait(timeout);
        self.publish_assets(loaded)
    }

    fn publish_assets(&mut self, loaded: Vec<LoadedAsset>) -> Vec<EngineError> {
        let mut failures = Vec::new();
        let Some(resources) = self.resources.as_mut() else {
            return failures;
        };
        for LoadedAsset {
            id,
            data_url,
            result,
        } in loaded
        {
            if !resources.slots.is_pending(&id, &data_url) {
                debug!(%id, "discarding decoded texture that is no longer listed");
                continue;
            }
            let image = match result {
                Ok(image) => image,
                Err(source) => {
                    resources.slots.mark_failed(&id, &data_url);
                    warn!(%id, error = %source, "texture asset failed to load; slot keeps the placeholder");
                    self.telemetry.emit(Telemetry::AssetFailed {
                        id: id.clone(),
                        message: source.to_string(),
                    });
                    failures.push(EngineError::AssetLoad { id, source });
                    continue;
                }
            };
            match self.backend.upload_image(&id, &image) {
                Ok(texture) => match resources.slots.publish(&id, &data_url, texture) {
                    Ok(slot) => {
                        debug!(%id, slot, width = image.width, height = image.height, "texture asset ready");
                        self.telemetry.emit(Telemetry::AssetReady { id, slot });
                    }
                    Err(texture) => self.backend.release_texture(texture),
                },
                Err(err) => {
                    resources.slots.mark_failed(&id, &data_url);
                    warn!(%id, error = %format!("{err:#}"), "texture upload failed");
                    self.telemetry.emit(Telemetry::AssetFailed {
                        id,
                        message: format!("{err:#}"),
                    });
                    failures.push(EngineError::Backend(err));
                }
            }
        }
        failures
    }

    /// Reacts to a display-surface size; both surfaces of every target pair
    /// and `iResolution` follow before the next render.
    ///
    /// The new size is only committed once every target pair accepted it, so
    /// after an error the same size can be retried.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        let Some(size) = self.resize.propose(width, height) else {
            return Ok(());
        };
        if let Some(resources) = self.resources.as_mut() {
            let backend = &mut self.backend;
            for pass in &mut resources.buffers {
                pass.targets
                    .resize_with(size, |surface, size| backend.resize_target(surface, size))?;
            }
        }
        self.resize.commit(size);
        self.backend.resize_surface(size);
        self.uniforms.set_resolution(size);
        self.pointer.set_surface_height(size.height);
        debug!(width = size.width, height = size.height, "surface resized");
        Ok(())
    }

    pub fn handle_cursor_moved(&mut self, x: f64, y: f64) {
        self.pointer.handle_cursor_moved(x, y);
    }

    pub fn handle_button(&mut self, pressed: bool) {
        if pressed {
            self.pointer.handle_press();
        } else {
            self.pointer.handle_release();
        }
    }

    /// Rebuilds every pass for `project`, resetting the clock.
    ///
    /// An invalid project is rejected before anything changes. Otherwise the
    /// old resources are released before the new ones are allocated; if that
    /// allocation fails the engine is left stopped with no passes and
    /// everything it allocated is released again.
    pub fn reconfigure(&mut self, project: Project, now: Instant) -> Result<(), EngineError> {
        project.validate()?;
        self.teardown();
        self.project = project;
        self.uniforms.reset_clock();
        self.build_resources()?;
        self.start(now);
        Ok(())
    }

    /// Restarts the current project from time zero with fresh targets.
    pub fn restart(&mut self, now: Instant) -> Result<(), EngineError> {
        let project = self.project.clone();
        self.reconfigure(project, now)
    }

    /// Stops the loop and releases every texture the engine owns.
    pub fn shutdown(&mut self) {
        if self.resources.is_some() {
            self.teardown();
            info!("engine shut down");
        }
    }

    fn teardown(&mut self) {
        self.scheduler.stop();
        let stale = self.loader.drain();
        if !stale.is_empty() {
            debug!(count = stale.len(), "dropping decoded textures from previous configuration");
        }
        if let Some(resources) = self.resources.take() {
            self.release(resources);
        }
    }

    fn build_resources(&mut self) -> Result<(), EngineError> {
        let placeholder = self.backend.create_placeholder()?;
        let mut resources = PassResources {
            buffers: Vec::with_capacity(self.project.buffers.len()),
            final_pass: PassState::new(PassProgram::new(
                FINAL_PASS_ID,
                self.project.source(FINAL_PASS_ID),
            )),
            slots: TextureSlotTable::new(placeholder),
        };

        let size = self.resize.current();
        let ids = self.project.buffers.clone();
        for id in ids {
            match create_target_pair(&mut self.backend, &id, size) {
                Ok(targets) => resources.buffers.push(BufferPass {
                    state: PassState::new(PassProgram::new(id.as_str(), self.project.source(&id))),
                    targets,
                }),
                Err(err) => {
                    self.release(resources);
                    return Err(err.into());
                }
            }
        }

        let update = match resources.slots.replace(&self.project.textures) {
            Ok(update) => update,
            Err(err) => {
                self.release(resources);
                return Err(err);
            }
        };
        for asset in update.pending {
            self.loader.request(asset);
        }
        debug!(
            buffers = resources.buffers.len(),
            width = size.width,
            height = size.height,
            "allocated pass resources"
        );
        self.resources = Some(resources);
        Ok(())
    }

    fn release(&mut self, resources: Resources<B>) {
        let PassResources { buffers, slots, .. } = resources;
        for pass in buffers {
            for surface in pass.targets.into_surfaces() {
                self.backend.release_texture(surface);
            }
        }
        for texture in slots.into_textures() {
            self.backend.release_texture(texture);
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn telemetry(&self) -> Receiver<Telemetry> {
        self.telemetry_rx.clone()
    }

    pub fn uniforms(&self) -> &UniformFrame {
        &self.uniforms
    }

    pub fn playback(&self) -> PlaybackParams {
        self.playback
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn surface_size(&self) -> SurfaceSize {
        self.resize.current()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Channel bindings used by the last draw of pass `id`.
    pub fn bound_channels(&self, id: &str) -> Option<ChannelSet> {
        self.resources
            .as_ref()?
            .pass_state(id)
            .map(|state| state.channels)
    }

    /// Asset bindings used by the last draw of pass `id`.
    pub fn bound_textures(&self, id: &str) -> Option<[TextureRef; MAX_TEXTURES]> {
        self.resources
            .as_ref()?
            .pass_state(id)
            .map(|state| state.textures)
    }

    pub fn target_pair(&self, id: &str) -> Option<&RenderTargetPair<B::Texture>> {
        self.resources
            .as_ref()?
            .buffers
            .iter()
            .find(|pass| pass.state.program.id() == id)
            .map(|pass| &pass.targets)
    }

    pub fn needs_compile(&self, id: &str) -> Option<bool> {
        self.resources
            .as_ref()?
            .pass_state(id)
            .map(|state| state.program.needs_compile())
    }
}

impl<B: RenderBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Compiles the pass if its source changed since the last render. Returns
/// true when a new program was installed.
fn refresh_program<B: RenderBackend>(
    backend: &mut B,
    telemetry: &TelemetrySink,
    state: &mut PassState<B::Program>,
    output: OutputKind,
) -> bool {
    if !state.program.consume_compile_flag() {
        return false;
    }
    let id = state.program.id().to_string();
    let compiled = state
        .program
        .validate()
        .map_err(anyhow::Error::from)
        .and_then(|()| backend.compile(&id, state.program.assembled(), output));
    match compiled {
        Ok(program) => {
            state.compiled = Some(program);
            true
        }
        Err(err) => {
            let message = format!("{err:#}");
            if state.compiled.is_some() {
                warn!(pass = %id, error = %message, "shader compilation failed; keeping previous program");
            } else {
                warn!(pass = %id, error = %message, "shader compilation failed; pass is skipped");
            }
            telemetry.emit(Telemetry::CompileFailed { pass: id, message });
            false
        }
    }
}

fn report_compile_time(telemetry: &TelemetrySink, pass: &str, started: Instant) {
    let duration = started.elapsed();
    debug!(pass, ?duration, "first draw after compile");
    telemetry.emit(Telemetry::CompileTime {
        pass: pass.to_string(),
        duration,
    });
}

fn resolve<'a, T, P>(reference: TextureRef, resources: &'a PassResources<T, P>) -> &'a T {
    match reference {
        TextureRef::Placeholder => resources.slots.placeholder(),
        TextureRef::Target { pass, surface } => resources
            .buffers
            .get(pass)
            .map(|pass| pass.targets.surface(surface))
            .unwrap_or_else(|| resources.slots.placeholder()),
        TextureRef::Asset { slot } => resources.slots.resolve(slot),
    }
}

fn create_target_pair<B: RenderBackend>(
    backend: &mut B,
    id: &str,
    size: SurfaceSize,
) -> anyhow::Result<RenderTargetPair<B::Texture>> {
    let first = backend.create_target(&format!("{id} target 0"), size)?;
    let second = match backend.create_target(&format!("{id} target 1"), size) {
        Ok(texture) => texture,
        Err(err) => {
            backend.release_texture(first);
            return Err(err);
        }
    };
    Ok(RenderTargetPair::new([first, second], size))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use project::{Project, TextureAsset};

    use super::*;
    use crate::assets::fixtures::striped_png;
    use crate::backend::recording::{DrawRecord, RecordingBackend};

    const BROKEN_SOURCE: &str = "void mainImage(out vec4 c, in vec2 p) { c = ; }";

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn engine_for(project: Project) -> (Engine<RecordingBackend>, Instant) {
        let mut engine = Engine::new(
            RecordingBackend::default(),
            project,
            PlaybackParams::default(),
            SurfaceSize::new(800, 600),
        )
        .unwrap();
        let start = Instant::now();
        engine.start(start);
        (engine, start)
    }

    fn single_buffer_project() -> Project {
        let mut project = Project::default();
        project.remove_last_buffer().unwrap();
        project
    }

    fn draws<'a>(frame: &'a [DrawRecord], label: &str) -> &'a DrawRecord {
        frame
            .iter()
            .find(|record| record.label == label)
            .unwrap_or_else(|| panic!("no draw for {label}"))
    }

    fn drain(engine: &Engine<RecordingBackend>) -> Vec<Telemetry> {
        engine.telemetry().try_iter().collect()
    }

    #[test]
    fn first_tick_is_throttled_and_everything_starts_unbound() {
        let (mut engine, start) = engine_for(Project::default());
        assert_eq!(engine.state(), SchedulerState::Running);
        assert_eq!(engine.bound_channels("bufferA"), Some(UNBOUND_CHANNELS));
        assert_eq!(engine.bound_channels(FINAL_PASS_ID), Some(UNBOUND_CHANNELS));

        assert_eq!(engine.tick(start), TickOutcome::Throttled);
        assert!(engine.backend().frames.is_empty());
        assert_eq!(engine.tick(start + ms(20)), TickOutcome::Rendered);
        assert_eq!(engine.backend().frames.len(), 1);
    }

    #[test]
    fn buffers_read_their_own_previous_output() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(20));
        engine.tick(start + ms(40));
        engine.tick(start + ms(60));

        let placeholder = engine.backend().placeholder.unwrap();
        let a: Vec<&DrawRecord> = engine.backend().draws_of("bufferA").collect();
        assert_eq!(a.len(), 3);
        assert_eq!(a[0].channels[0], placeholder);
        assert_eq!(a[1].channels[0], a[0].target.unwrap());
        assert_eq!(a[2].channels[0], a[1].target.unwrap());
        assert_ne!(a[0].target, a[1].target);
        assert_eq!(a[0].target, a[2].target);
    }

    #[test]
    fn later_buffers_and_final_pass_see_this_ticks_output() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(20));

        let frame = engine.backend().last_frame();
        let labels: Vec<&str> = frame.iter().map(|record| record.label.as_str()).collect();
        assert_eq!(labels, vec!["bufferA", "bufferB", FINAL_PASS_ID]);

        let placeholder = engine.backend().placeholder.unwrap();
        let a = draws(frame, "bufferA");
        let b = draws(frame, "bufferB");
        let last = draws(frame, FINAL_PASS_ID);
        assert_eq!(b.channels[1], a.target.unwrap());
        assert_eq!(b.channels[2], placeholder);
        assert_eq!(last.channels[0], a.target.unwrap());
        assert_eq!(last.channels[1], b.target.unwrap());
        assert_eq!(last.channels[2], placeholder);
        assert_eq!(last.target, None);

        assert_eq!(
            engine.bound_channels("bufferB").unwrap()[1],
            TextureRef::Target { pass: 0, surface: 0 }
        );
    }

    #[test]
    fn single_buffer_leaves_final_channel_one_unbound() {
        let (mut engine, start) = engine_for(single_buffer_project());
        engine.tick(start + ms(20));

        let placeholder = engine.backend().placeholder.unwrap();
        let frame = engine.backend().last_frame();
        let a = draws(frame, "bufferA");
        let last = draws(frame, FINAL_PASS_ID);
        assert_eq!(last.channels[0], a.target.unwrap());
        assert_eq!(&last.channels[1..], &[placeholder; 3]);
    }

    #[test]
    fn offscreen_draws_are_flipped_and_surface_draw_is_not() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(20));
        let frame = engine.backend().last_frame();
        assert_eq!(draws(frame, "bufferA").uniforms.target_flip, 1.0);
        assert_eq!(draws(frame, FINAL_PASS_ID).uniforms.target_flip, 0.0);
    }

    #[test]
    fn time_and_frame_follow_playback() {
        let (mut engine, start) = engine_for(Project::default());
        engine.set_playback(PlaybackParams {
            time_scale: 2.0,
            ..PlaybackParams::default()
        });
        engine.tick(start + ms(20));
        engine.tick(start + ms(25));
        assert!((engine.uniforms().time() - 0.05).abs() < 1e-4);
        assert_eq!(engine.uniforms().frame_index(), 2);
        assert_eq!(engine.backend().frames.len(), 1);

        engine.set_playback(PlaybackParams {
            is_playing: false,
            ..engine.playback()
        });
        let paused_time = engine.uniforms().time();
        engine.tick(start + ms(60));
        assert_eq!(engine.uniforms().time(), paused_time);
        assert_eq!(engine.uniforms().frame_index(), 2);
        assert!((engine.uniforms().delta() - 0.035).abs() < 1e-4);
        assert_eq!(engine.backend().frames.len(), 2, "paused engine still renders");
    }

    #[test]
    fn renders_stay_within_the_target_rate() {
        let (mut engine, start) = engine_for(Project::default());
        engine.set_playback(PlaybackParams {
            target_fps: 24,
            ..PlaybackParams::default()
        });
        for step in 1..=1000 {
            engine.tick(start + ms(step));
        }
        let renders = engine.backend().frames.len();
        assert!(renders <= 24, "rendered {renders} frames in one second");
        assert!(renders >= 23);
        assert!(drain(&engine).contains(&Telemetry::Fps(renders as u32)));
    }

    #[test]
    fn time_is_reported_every_tick() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(1));
        engine.tick(start + ms(2));
        engine.tick(start + ms(20));
        let times = drain(&engine)
            .into_iter()
            .filter(|event| matches!(event, Telemetry::Time(_)))
            .count();
        assert_eq!(times, 3);
    }

    #[test]
    fn unchanged_source_does_not_recompile() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(20));
        let compiles = |events: Vec<Telemetry>| -> Vec<String> {
            events
                .into_iter()
                .filter_map(|event| match event {
                    Telemetry::CompileTime { pass, .. } => Some(pass),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(
            compiles(drain(&engine)),
            vec!["bufferA", "bufferB", FINAL_PASS_ID]
        );

        let same = engine.project().source("bufferA").to_string();
        assert!(!engine.set_source("bufferA", &same).unwrap());
        engine.tick(start + ms(40));
        assert!(compiles(drain(&engine)).is_empty());

        let edited = format!("{same}\n// tweak");
        assert!(engine.set_source("bufferA", &edited).unwrap());
        engine.tick(start + ms(60));
        assert_eq!(compiles(drain(&engine)), vec!["bufferA"]);
        assert_eq!(engine.project().source("bufferA"), edited);
        assert_eq!(engine.backend().compiled.len(), 4);
    }

    #[test]
    fn set_sources_skips_empty_and_unknown_entries() {
        let (mut engine, _) = engine_for(Project::default());
        let mut sources = BTreeMap::new();
        sources.insert("bufferA".to_string(), String::new());
        sources.insert("help".to_string(), "notes".to_string());
        sources.insert(
            "bufferB".to_string(),
            "void mainImage(out vec4 c, in vec2 p) { c = vec4(0.5); }".to_string(),
        );
        assert_eq!(engine.set_sources(&sources), 1);
        assert!(!engine.project().source("bufferA").is_empty());
        assert!(engine.set_source("bufferQ", "void mainImage(out vec4 c, in vec2 p) {}").is_err());
    }

    #[test]
    fn broken_edit_keeps_previous_program() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(20));
        let good_program = draws(engine.backend().last_frame(), "bufferA").program;
        drain(&engine);

        engine.set_source("bufferA", BROKEN_SOURCE).unwrap();
        assert_eq!(engine.tick(start + ms(40)), TickOutcome::Rendered);
        assert_eq!(
            draws(engine.backend().last_frame(), "bufferA").program,
            good_program
        );
        assert!(drain(&engine).iter().any(|event| matches!(
            event,
            Telemetry::CompileFailed { pass, .. } if pass == "bufferA"
        )));

        assert_eq!(engine.tick(start + ms(60)), TickOutcome::Rendered);
        assert_eq!(engine.needs_compile("bufferA"), Some(false));
    }

    #[test]
    fn never_compiled_pass_is_skipped() {
        let mut project = Project::default();
        project.set_source("bufferB", BROKEN_SOURCE);
        let (mut engine, start) = engine_for(project);
        engine.tick(start + ms(20));

        let placeholder = engine.backend().placeholder.unwrap();
        let frame = engine.backend().last_frame();
        let labels: Vec<&str> = frame.iter().map(|record| record.label.as_str()).collect();
        assert_eq!(labels, vec!["bufferA", FINAL_PASS_ID]);
        assert_eq!(draws(frame, FINAL_PASS_ID).channels[1], placeholder);
    }

    #[test]
    fn backend_rejection_is_reported_like_a_compile_error() {
        let mut project = Project::default();
        project.set_source(
            FINAL_PASS_ID,
            "// REJECT\nvoid mainImage(out vec4 c, in vec2 p) { c = vec4(1.0); }",
        );
        let (mut engine, start) = engine_for(project);
        engine.backend_mut().reject_marker = Some("// REJECT".to_string());
        assert_eq!(engine.tick(start + ms(20)), TickOutcome::Rendered);

        assert_eq!(engine.backend().last_frame().len(), 2);
        assert!(drain(&engine).iter().any(|event| matches!(
            event,
            Telemetry::CompileFailed { pass, message } if pass == FINAL_PASS_ID && message.contains("rejected")
        )));
    }

    #[test]
    fn ninth_texture_is_rejected_without_side_effects() {
        let (mut engine, _) = engine_for(Project::default());
        let assets: Vec<TextureAsset> = (0..9)
            .map(|n| TextureAsset::new(format!("t{n}"), format!("t{n}.png"), "data:image/png;base64,AA=="))
            .collect();
        let live = engine.backend().live.clone();

        let err = engine.set_textures(&assets).unwrap_err();
        assert!(matches!(err, EngineError::Capacity { what: "texture", max: 8 }));
        assert!(engine.project().textures.is_empty());
        assert_eq!(engine.backend().live, live);
    }

    #[test]
    fn decoded_assets_are_bound_and_failures_reported() {
        let (mut engine, start) = engine_for(Project::default());
        let broken = TextureAsset::new("broken", "broken.png", "data:image/png;base64,AAAA");
        let stripes = striped_png("stripes.png");
        engine.set_textures(&[stripes.clone(), broken]).unwrap();

        let failures = engine.await_assets(Duration::from_secs(5));
        assert_eq!(failures.len(), 1);
        assert!(matches!(&failures[0], EngineError::AssetLoad { id, .. } if id == "broken"));

        engine.tick(start + ms(20));
        let placeholder = engine.backend().placeholder.unwrap();
        let textures = draws(engine.backend().last_frame(), "bufferA").textures;
        assert_ne!(textures[0], placeholder);
        assert_eq!(&textures[1..], &[placeholder; 7]);
        assert_eq!(
            engine.bound_textures(FINAL_PASS_ID).unwrap()[0],
            TextureRef::Asset { slot: 0 }
        );

        let events = drain(&engine);
        assert!(events.contains(&Telemetry::AssetReady {
            id: stripes.id.clone(),
            slot: 0
        }));
        assert!(events
            .iter()
            .any(|event| matches!(event, Telemetry::AssetFailed { id, .. } if id == "broken")));

        let uploaded = textures[0];
        engine.set_textures(&[]).unwrap();
        assert!(!engine.backend().live.contains(&uploaded));
    }

    #[test]
    fn resize_reaches_targets_and_uniforms() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(20));
        engine.resize(400, 300).unwrap();

        let expected = SurfaceSize::new(400, 300);
        assert_eq!(engine.surface_size(), expected);
        assert_eq!(engine.backend().surface_size, Some(expected));
        for id in ["bufferA", "bufferB"] {
            let pair = engine.target_pair(id).unwrap();
            assert_eq!(pair.size(), expected);
            assert!(pair.surfaces().iter().all(|surface| surface.size == expected));
        }

        engine.tick(start + ms(40));
        for record in engine.backend().last_frame() {
            assert_eq!(record.uniforms.i_resolution, [400.0, 300.0, 1.0]);
        }
    }

    #[test]
    fn failed_resize_commits_nothing_and_can_be_retried() {
        let (mut engine, start) = engine_for(Project::default());
        engine.backend_mut().fail_targets = Some("bufferB".to_string());
        assert!(matches!(engine.resize(400, 300), Err(EngineError::Backend(_))));

        let original = SurfaceSize::new(800, 600);
        assert_eq!(engine.surface_size(), original);
        assert_eq!(engine.uniforms().resolution(), original);
        assert_eq!(engine.backend().surface_size, Some(original));

        engine.backend_mut().fail_targets = None;
        engine.resize(400, 300).unwrap();
        let expected = SurfaceSize::new(400, 300);
        for id in ["bufferA", "bufferB"] {
            let pair = engine.target_pair(id).unwrap();
            assert_eq!(pair.size(), expected);
            assert!(pair.surfaces().iter().all(|surface| surface.size == expected));
        }
        engine.tick(start + ms(20));
        for record in engine.backend().last_frame() {
            assert_eq!(record.uniforms.i_resolution, [400.0, 300.0, 1.0]);
        }
    }

    #[test]
    fn pointer_is_sampled_into_the_next_render() {
        let (mut engine, start) = engine_for(Project::default());
        engine.handle_cursor_moved(100.0, 50.0);
        engine.handle_button(true);
        engine.tick(start + ms(20));
        let mouse = draws(engine.backend().last_frame(), "bufferA").uniforms.i_mouse;
        assert_eq!(mouse, [100.0, 550.0, 100.0, 550.0]);

        engine.handle_button(false);
        engine.tick(start + ms(40));
        let mouse = draws(engine.backend().last_frame(), "bufferA").uniforms.i_mouse;
        assert_eq!(mouse, [100.0, 550.0, -100.0, -550.0]);
    }

    #[test]
    fn lost_surface_skips_the_frame_without_consuming_compiles() {
        let (mut engine, start) = engine_for(Project::default());
        engine.backend_mut().surface_lost = true;
        assert_eq!(engine.tick(start + ms(20)), TickOutcome::SurfaceUnavailable);
        assert_eq!(engine.needs_compile("bufferA"), Some(true));
        assert!(engine.backend().compiled.is_empty());

        engine.backend_mut().surface_lost = false;
        assert_eq!(engine.tick(start + ms(40)), TickOutcome::Rendered);
        assert_eq!(engine.backend().compiled.len(), 3);
    }

    #[test]
    fn reconfigure_releases_old_resources_and_resets_time() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(20));
        let old: Vec<u32> = engine.backend().live.iter().copied().collect();

        engine
            .reconfigure(single_buffer_project(), start + ms(30))
            .unwrap();
        assert_eq!(engine.uniforms().time(), 0.0);
        assert_eq!(engine.uniforms().frame_index(), 0);
        assert!(old.iter().all(|id| !engine.backend().live.contains(id)));
        assert_eq!(engine.backend().live.len(), 3);
        assert_eq!(engine.bound_channels("bufferB"), None);

        engine.tick(start + ms(60));
        let labels: Vec<&str> = engine
            .backend()
            .last_frame()
            .iter()
            .map(|record| record.label.as_str())
            .collect();
        assert_eq!(labels, vec!["bufferA", FINAL_PASS_ID]);
    }

    #[test]
    fn invalid_reconfigure_keeps_running_configuration() {
        let (mut engine, start) = engine_for(Project::default());
        let mut project = Project::default();
        project.buffers.push("bufferA".to_string());
        assert!(engine.reconfigure(project, start).is_err());
        assert_eq!(engine.project().buffers, vec!["bufferA", "bufferB"]);
        assert_eq!(engine.tick(start + ms(20)), TickOutcome::Rendered);
    }

    #[test]
    fn failed_rebuild_leaves_the_engine_stopped_without_leaks() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(20));

        let mut project = Project::default();
        project.add_buffer().unwrap();
        engine.backend_mut().fail_targets = Some("bufferC".to_string());
        assert!(matches!(
            engine.reconfigure(project, start + ms(30)),
            Err(EngineError::Backend(_))
        ));
        assert!(engine.backend().live.is_empty());
        assert_eq!(engine.state(), SchedulerState::Idle);
        assert_eq!(engine.tick(start + ms(60)), TickOutcome::Idle);

        engine.backend_mut().fail_targets = None;
        engine.restart(start + ms(70)).unwrap();
        assert!(engine.target_pair("bufferC").is_some());
    }

    #[test]
    fn shutdown_releases_everything_and_stops_ticking() {
        let (mut engine, start) = engine_for(Project::default());
        engine.set_textures(&[striped_png("stripes.png")]).unwrap();
        engine.await_assets(Duration::from_secs(5));
        engine.tick(start + ms(20));
        assert!(!engine.backend().live.is_empty());

        engine.shutdown();
        assert!(engine.backend().live.is_empty());
        assert_eq!(engine.state(), SchedulerState::Idle);
        assert_eq!(engine.tick(start + ms(40)), TickOutcome::Idle);
        assert!(engine.set_source("bufferA", "void mainImage(out vec4 c, in vec2 p) {}").is_err());
    }

    #[test]
    fn restart_rebuilds_from_time_zero() {
        let (mut engine, start) = engine_for(Project::default());
        engine.tick(start + ms(20));
        engine.tick(start + ms(40));
        engine.restart(start + ms(50)).unwrap();
        assert_eq!(engine.uniforms().frame_index(), 0);
        engine.tick(start + ms(70));
        let placeholder = engine.backend().placeholder.unwrap();
        assert_eq!(
            draws(engine.backend().last_frame(), "bufferA").channels[0],
            placeholder
        );
    }
}
