use std::path::Path;

use anyhow::{Context, Result};
use project::Project;
use renderer::{run_sandbox, SandboxConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::settings::Settings;
use crate::watch::ProjectWatcher;

pub fn run(args: RunArgs) -> Result<()> {
    let settings = Settings::load(args.config.as_deref())?;
    let resolved = settings.resolve(&args);
    let project = load_project(args.project.as_deref())?;

    info!(
        buffers = project.buffers.len(),
        textures = project.textures.len(),
        width = resolved.size.width,
        height = resolved.size.height,
        target_fps = resolved.playback.target_fps,
        "launching sandbox"
    );

    let config = SandboxConfig {
        project,
        playback: resolved.playback,
        size: resolved.size,
        title: resolved.title,
    };

    let watch_path = match (&args.project, args.watch) {
        (Some(path), true) => Some(path.clone()),
        (None, true) => {
            warn!("--watch needs a project file; continuing without hot reload");
            None
        }
        _ => None,
    };

    let mut watcher = None;
    run_sandbox(config, |proxy| {
        if let Some(path) = &watch_path {
            match ProjectWatcher::spawn(path, proxy) {
                Ok(handle) => watcher = Some(handle),
                Err(err) => warn!("hot reload disabled: {err:#}"),
            }
        }
    })?;
    drop(watcher);
    Ok(())
}

fn load_project(path: Option<&Path>) -> Result<Project> {
    match path {
        Some(path) => Project::load(path).with_context(|| {
            format!(
                "failed to load project {} (create one with `multipass init`)",
                path.display()
            )
        }),
        None => {
            info!("no project given; opening the built-in demo");
            Ok(Project::default())
        }
    }
}

pub fn initialise_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
