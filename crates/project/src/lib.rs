//! Persisted project records for the multipass shader sandbox.
//!
//! A project is the configuration shape the renderer consumes: a map of pass
//! ids to GLSL sources, the ordered list of buffer passes, and the texture
//! assets shared by every pass. Records are stored as pretty-printed JSON with
//! image data embedded as base64 data URLs so a single file carries everything.
//!
//! Types:
//!
//! - `Project` owns the three record fields and enforces the capacity rules
//!   (26 buffer passes, 8 texture assets).
//! - `TextureAsset` is one embedded image (`id`, `name`, `dataUrl`).
//! - `ProjectError` classifies malformed records, capacity violations, and I/O.
//! - `AssetError` covers failures while acquiring image bytes (data URL, file,
//!   or network).
//!
//! Functions:
//!
//! - `Project::from_json` / `Project::load` fail fast when a field is absent.
//! - `Project::add_buffer` / `Project::remove_last_buffer` keep the buffer
//!   order append-only.
//! - `TextureFetcher::fetch` downloads an image URL into a `TextureAsset`.

mod asset;
mod defaults;
mod fetch;
mod record;

use std::path::PathBuf;

use thiserror::Error;

pub use asset::{AssetError, TextureAsset};
pub use defaults::{new_buffer_source, DEFAULT_FINAL_SOURCE, HELP_TEXT};
pub use fetch::TextureFetcher;
pub use record::Project;

/// Reserved pass id rendered to the visible surface.
pub const FINAL_PASS_ID: &str = "finalPass";

/// Source-map key that carries notes for the user; never compiled.
pub const HELP_ID: &str = "help";

/// Maximum number of shared texture assets (`iTexChannel0..7`).
pub const MAX_TEXTURES: usize = 8;

/// Maximum number of buffer passes (`bufferA..bufferZ`).
pub const MAX_BUFFERS: usize = 26;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project record is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid project: {0}")]
    Invalid(String),

    #[error("{what} limit reached (maximum {max})")]
    Capacity { what: &'static str, max: usize },

    #[error("failed to parse project JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to access project file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProjectError {
    /// True for the errors that describe a malformed or incomplete record.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::Invalid(_) | Self::Parse(_)
        )
    }
}
