use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories_next::ProjectDirs;
use renderer::{PlaybackParams, SurfaceSize};
use serde::Deserialize;
use tracing::debug;

use crate::cli::RunArgs;

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Multipass";
const APPLICATION: &str = "multipass";
const SETTINGS_FILE: &str = "settings.toml";
const DEFAULT_TITLE: &str = "multipass";

/// Optional user settings; every field falls back to a built-in default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub window: WindowSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackSettings {
    pub fps: Option<u32>,
    pub time_scale: Option<f32>,
    pub paused: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub title: Option<String>,
}

/// Launch parameters after merging settings and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub playback: PlaybackParams,
    pub size: SurfaceSize,
    pub title: String,
}

impl Settings {
    /// Reads `explicit` if given (it must exist), otherwise the per-user
    /// settings file when present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_settings_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("no settings file found; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file at {}", path.display()))?;
        let settings: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse settings file at {}", path.display()))?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Command-line flags win over the file; playback is normalised.
    pub fn resolve(&self, args: &RunArgs) -> Resolved {
        let defaults = PlaybackParams::default();
        let playback = PlaybackParams {
            is_playing: !(args.paused || self.playback.paused.unwrap_or(false)),
            target_fps: args
                .fps
                .or(self.playback.fps)
                .unwrap_or(defaults.target_fps),
            time_scale: args
                .time_scale
                .or(self.playback.time_scale)
                .unwrap_or(defaults.time_scale),
        }
        .normalized();

        let fallback = SurfaceSize::default();
        let (width, height) = args.size.unwrap_or((
            self.window.width.unwrap_or(fallback.width),
            self.window.height.unwrap_or(fallback.height),
        ));
        let title = self
            .window
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Resolved {
            playback,
            size: SurfaceSize::new(width, height),
            title,
        }
    }
}

fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}
