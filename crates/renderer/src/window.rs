use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::Receiver;
use project::Project;
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::backend::RenderBackend;
use crate::engine::{Engine, TickOutcome};
use crate::gpu::WgpuBackend;
use crate::telemetry::Telemetry;
use crate::types::{PlaybackParams, SurfaceSize};

const FALLBACK_REFRESH: Duration = Duration::from_micros(16_667);

/// Everything needed to open the sandbox window.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub project: Project,
    pub playback: PlaybackParams,
    pub size: SurfaceSize,
    pub title: String,
}

/// Requests delivered to a running window from other threads.
#[derive(Debug, Clone)]
pub enum SandboxCommand {
    /// The project file changed on disk.
    UpdateProject(Project),
    Shutdown,
}

/// Opens the window and runs the tick loop on the calling thread until the
/// window closes. `on_proxy` receives a handle for sending
/// [`SandboxCommand`]s before the loop starts.
pub fn run_sandbox(
    config: SandboxConfig,
    on_proxy: impl FnOnce(EventLoopProxy<SandboxCommand>),
) -> Result<()> {
    let event_loop = EventLoopBuilder::<SandboxCommand>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    on_proxy(event_loop.create_proxy());

    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(config.size.width, config.size.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create sandbox window: {err}"))?;
    let window = Arc::new(window);
    let inner = window.inner_size();
    let size = SurfaceSize::new(inner.width, inner.height);

    let backend = WgpuBackend::new(window.clone(), size)?;
    let mut engine = Engine::new(backend, config.project, config.playback, size)?;
    let telemetry = engine.telemetry();
    let mut status = TitleStatus::new(config.title);
    let refresh = refresh_interval(&window);
    debug!(?refresh, "redraw cadence follows the monitor refresh rate");

    engine.start(Instant::now());
    let mut next_redraw = Instant::now();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(SandboxCommand::UpdateProject(project)) => {
            if let Err(err) = apply_project(&mut engine, project, Instant::now()) {
                error!("failed to apply project update: {err}");
            }
        }
        Event::UserEvent(SandboxCommand::Shutdown) => elwt.exit(),
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                match key_action(&event) {
                    Some(KeyAction::TogglePlayback) => {
                        let playback = engine.playback();
                        engine.set_playback(PlaybackParams {
                            is_playing: !playback.is_playing,
                            ..playback
                        });
                        status.paused = playback.is_playing;
                        window.set_title(&status.render());
                    }
                    Some(KeyAction::Restart) => {
                        if let Err(err) = restart_playing(&mut engine, Instant::now()) {
                            error!("failed to restart: {err}");
                        }
                        status.paused = false;
                        window.set_title(&status.render());
                    }
                    Some(KeyAction::Exit) => elwt.exit(),
                    None => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                engine.handle_cursor_moved(position.x, position.y);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => engine.handle_button(state == ElementState::Pressed),
            WindowEvent::Resized(new_size) => {
                if let Err(err) = engine.resize(new_size.width, new_size.height) {
                    error!("failed to resize render targets: {err}");
                }
            }
            WindowEvent::RedrawRequested => {
                match engine.tick(Instant::now()) {
                    TickOutcome::SurfaceUnavailable => {
                        tracing::trace!("surface unavailable; frame skipped")
                    }
                    TickOutcome::SurfaceFailed => {
                        error!("display surface failed; closing sandbox");
                        elwt.exit();
                    }
                    _ => {}
                }
                if status.absorb(&telemetry) {
                    window.set_title(&status.render());
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if now >= next_redraw {
                window.request_redraw();
                next_redraw = now + refresh;
            }
            elwt.set_control_flow(ControlFlow::WaitUntil(next_redraw));
        }
        Event::LoopExiting => engine.shutdown(),
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Applies an edited project to a running engine. Source and texture edits
/// are hot-swapped; a changed buffer list rebuilds every pass.
pub fn apply_project<B: RenderBackend>(
    engine: &mut Engine<B>,
    project: Project,
    now: Instant,
) -> Result<(), crate::EngineError> {
    project.validate()?;
    if project.buffers != engine.project().buffers {
        info!(
            buffers = project.buffers.len(),
            "buffer list changed; rebuilding passes"
        );
        return engine.reconfigure(project, now);
    }
    if project.textures != engine.project().textures {
        engine.set_textures(&project.textures)?;
    }
    let changed = engine.replace_sources(project.shader_codes);
    if changed > 0 {
        info!(changed, "reloaded pass sources");
    }
    Ok(())
}

/// Restarts from time zero and resumes playback if it was paused.
fn restart_playing<B: RenderBackend>(
    engine: &mut Engine<B>,
    now: Instant,
) -> Result<(), crate::EngineError> {
    engine.restart(now)?;
    let playback = engine.playback();
    engine.set_playback(PlaybackParams {
        is_playing: true,
        ..playback
    });
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    TogglePlayback,
    Restart,
    Exit,
}

fn key_action(event: &KeyEvent) -> Option<KeyAction> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    match &event.logical_key {
        Key::Named(NamedKey::Space) => Some(KeyAction::TogglePlayback),
        Key::Named(NamedKey::Escape) => Some(KeyAction::Exit),
        Key::Character(value) if value.eq_ignore_ascii_case("r") => Some(KeyAction::Restart),
        Key::Character(value) if value.as_str() == " " => Some(KeyAction::TogglePlayback),
        _ => None,
    }
}

fn refresh_interval(window: &Window) -> Duration {
    window
        .current_monitor()
        .and_then(|monitor| monitor.refresh_rate_millihertz())
        .filter(|millihertz| *millihertz > 0)
        .map(|millihertz| Duration::from_secs_f64(1000.0 / f64::from(millihertz)))
        .unwrap_or(FALLBACK_REFRESH)
}

/// Window title built from the latest telemetry.
#[derive(Debug, Clone, PartialEq)]
struct TitleStatus {
    base: String,
    fps: Option<u32>,
    time: f32,
    paused: bool,
    failing: Option<String>,
}

impl TitleStatus {
    fn new(base: String) -> Self {
        Self {
            base,
            fps: None,
            time: 0.0,
            paused: false,
            failing: None,
        }
    }

    /// Drains pending events; true when the visible title changed.
    fn absorb(&mut self, telemetry: &Receiver<Telemetry>) -> bool {
        let before = self.render();
        for event in telemetry.try_iter() {
            match event {
                Telemetry::Time(time) => self.time = time,
                Telemetry::Fps(fps) => self.fps = Some(fps),
                Telemetry::CompileTime { pass, duration } => {
                    info!(%pass, ?duration, "pass compiled");
                    if self.failing.as_deref() == Some(pass.as_str()) {
                        self.failing = None;
                    }
                }
                Telemetry::CompileFailed { pass, .. } => self.failing = Some(pass),
                Telemetry::AssetReady { id, slot } => info!(%id, slot, "texture ready"),
                Telemetry::AssetFailed { id, message } => {
                    warn!(%id, %message, "texture unavailable")
                }
            }
        }
        self.render() != before
    }

    fn render(&self) -> String {
        let mut title = self.base.clone();
        if let Some(fps) = self.fps {
            title.push_str(&format!(" | {fps} fps"));
        }
        title.push_str(&format!(" | {:.1}s", self.time));
        if self.paused {
            title.push_str(" | paused");
        }
        if let Some(pass) = &self.failing {
            title.push_str(&format!(" | {pass} failed to compile"));
        }
        title
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::unbounded;

    use super::*;
    use crate::assets::fixtures::{checker_png, striped_png};
    use crate::backend::recording::RecordingBackend;

    fn running_engine() -> (Engine<RecordingBackend>, Instant) {
        let mut engine = Engine::new(
            RecordingBackend::default(),
            Project::default(),
            PlaybackParams::default(),
            SurfaceSize::new(320, 200),
        )
        .unwrap();
        let start = Instant::now();
        engine.start(start);
        (engine, start)
    }

    #[test]
    fn source_edits_are_hot_swapped() {
        let (mut engine, start) = running_engine();
        engine.tick(start + Duration::from_millis(20));
        let live = engine.backend().live.clone();

        let mut edited = engine.project().clone();
        edited.set_source("bufferA", "void mainImage(out vec4 c, in vec2 p) { c = vec4(0.2); }");
        apply_project(&mut engine, edited, start + Duration::from_millis(30)).unwrap();

        assert_eq!(engine.backend().live, live);
        assert_eq!(engine.needs_compile("bufferA"), Some(true));
        assert_eq!(engine.needs_compile("bufferB"), Some(false));
        assert!(engine.uniforms().time() > 0.0);
    }

    #[test]
    fn buffer_list_changes_rebuild_passes() {
        let (mut engine, start) = running_engine();
        engine.tick(start + Duration::from_millis(20));

        let mut edited = engine.project().clone();
        edited.add_buffer().unwrap();
        apply_project(&mut engine, edited, start + Duration::from_millis(30)).unwrap();

        assert!(engine.target_pair("bufferC").is_some());
        assert_eq!(engine.uniforms().time(), 0.0);
    }

    #[test]
    fn hot_reload_mirrors_the_file_source_map() {
        let (mut engine, start) = running_engine();
        let mut edited = engine.project().clone();
        edited.shader_codes.remove("help");
        edited.set_source("notes", "");
        apply_project(&mut engine, edited.clone(), start).unwrap();

        assert_eq!(engine.project().shader_codes, edited.shader_codes);
        assert!(!engine.project().shader_codes.contains_key("help"));
    }

    #[test]
    fn redrawn_texture_under_the_same_id_replaces_the_upload() {
        let (mut engine, start) = running_engine();
        let first = striped_png("tex.png");
        let mut edited = engine.project().clone();
        edited.textures = vec![first.clone()];
        apply_project(&mut engine, edited.clone(), start).unwrap();
        engine.await_assets(Duration::from_secs(5));
        engine.tick(start + Duration::from_millis(20));
        let old_upload = engine.backend().last_frame()[0].textures[0];

        let mut redrawn = checker_png("tex.png", 16);
        redrawn.id = first.id.clone();
        edited.textures = vec![redrawn];
        apply_project(&mut engine, edited.clone(), start + Duration::from_millis(30)).unwrap();
        assert!(!engine.backend().live.contains(&old_upload));
        assert!(engine.await_assets(Duration::from_secs(5)).is_empty());

        engine.tick(start + Duration::from_millis(40));
        let placeholder = engine.backend().placeholder.unwrap();
        let bound = engine.backend().last_frame()[0].textures[0];
        assert_ne!(bound, old_upload);
        assert_ne!(bound, placeholder);
        assert!(engine.backend().live.contains(&bound));
        assert_eq!(engine.project().textures, edited.textures);
    }

    #[test]
    fn restart_resumes_paused_playback() {
        let (mut engine, start) = running_engine();
        engine.set_playback(PlaybackParams {
            is_playing: false,
            ..engine.playback()
        });
        engine.tick(start + Duration::from_millis(20));

        restart_playing(&mut engine, start + Duration::from_millis(30)).unwrap();
        assert!(engine.playback().is_playing);
        assert_eq!(engine.uniforms().frame_index(), 0);
        engine.tick(start + Duration::from_millis(60));
        assert_eq!(engine.uniforms().frame_index(), 1);
    }

    #[test]
    fn title_tracks_fps_and_compile_failures() {
        let (sender, receiver) = unbounded();
        let mut status = TitleStatus::new("multipass".to_string());
        sender.send(Telemetry::Fps(58)).unwrap();
        sender.send(Telemetry::Time(3.3)).unwrap();
        sender
            .send(Telemetry::CompileFailed {
                pass: "bufferB".to_string(),
                message: "syntax error".to_string(),
            })
            .unwrap();
        assert!(status.absorb(&receiver));
        assert_eq!(
            status.render(),
            "multipass | 58 fps | 3.3s | bufferB failed to compile"
        );

        sender
            .send(Telemetry::CompileTime {
                pass: "bufferB".to_string(),
                duration: Duration::from_millis(4),
            })
            .unwrap();
        assert!(status.absorb(&receiver));
        assert_eq!(status.render(), "multipass | 58 fps | 3.3s");
        assert!(!status.absorb(&receiver));
    }
}
