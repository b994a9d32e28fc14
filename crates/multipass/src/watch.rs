use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use project::Project;
use renderer::{EventLoopProxy, SandboxCommand};
use tracing::{debug, info, warn};

/// Re-reads the project file on change and forwards it to the window.
///
/// The parent directory is watched rather than the file itself so editors
/// that save by renaming a temporary file are still noticed.
pub struct ProjectWatcher {
    _watcher: RecommendedWatcher,
}

impl ProjectWatcher {
    pub fn spawn(path: &Path, proxy: EventLoopProxy<SandboxCommand>) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve project path {}", path.display()))?;
        let directory = path
            .parent()
            .ok_or_else(|| anyhow!("project path has no parent: {}", path.display()))?
            .to_path_buf();
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("project path has no file name: {}", path.display()))?
            .to_os_string();

        let handler_path = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) if touches_project(&event, &file_name) => {
                    reload(&handler_path, &proxy);
                }
                Ok(_) => {}
                Err(err) => warn!("project watch error: {err}"),
            },
            Config::default(),
        )
        .context("failed to create file watcher")?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", directory.display()))?;
        info!(path = %path.display(), "watching project for changes");

        Ok(Self { _watcher: watcher })
    }
}

fn touches_project(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name.as_os_str()))
}

fn reload(path: &PathBuf, proxy: &EventLoopProxy<SandboxCommand>) {
    match Project::load(path) {
        Ok(project) => {
            debug!(path = %path.display(), "project changed on disk");
            if proxy
                .send_event(SandboxCommand::UpdateProject(project))
                .is_err()
            {
                debug!("sandbox window already closed; dropping project update");
            }
        }
        // Half-written files are common mid-save; the next event retries.
        Err(err) => warn!(path = %path.display(), "ignoring unreadable project: {err}"),
    }
}
