use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("texture data is not a base64 data URL")]
    NotDataUrl,

    #[error("data URL payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("content type `{0}` is not an image")]
    NotImage(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// One image shared by every pass through `iTexChannelN`, where N is its
/// position in the project's texture list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureAsset {
    pub id: String,
    pub name: String,
    pub data_url: String,
}

impl TextureAsset {
    pub fn new(id: impl Into<String>, name: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_url: data_url.into(),
        }
    }

    /// Embeds raw image bytes, assigning a `name-<unix millis>` id.
    pub fn from_bytes(name: impl Into<String>, mime: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        if !mime.starts_with("image/") {
            return Err(AssetError::NotImage(mime.to_string()));
        }
        let name = name.into();
        Ok(Self {
            id: timestamped_id(&name),
            data_url: encode_data_url(mime, bytes),
            name,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, AssetError> {
        let mime = mime_for_path(path).ok_or_else(|| {
            AssetError::NotImage(
                path.extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "unknown".to_string()),
            )
        })?;
        let bytes = fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "texture".to_string());
        Self::from_bytes(name, mime, &bytes)
    }

    /// MIME type declared by the data URL, if it is well formed.
    pub fn mime_type(&self) -> Option<&str> {
        split_data_url(&self.data_url).ok().map(|(mime, _)| mime)
    }

    /// Decodes the embedded payload back into the original file bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, AssetError> {
        let (_, payload) = split_data_url(&self.data_url)?;
        Ok(STANDARD.decode(payload.trim())?)
    }

    /// Equal name and image data; ids are allowed to differ.
    pub fn same_content(&self, other: &TextureAsset) -> bool {
        self.name == other.name && self.data_url == other.data_url
    }
}

pub(crate) fn timestamped_id(name: &str) -> String {
    format!("{name}-{}", Utc::now().timestamp_millis())
}

pub(crate) fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn split_data_url(url: &str) -> Result<(&str, &str), AssetError> {
    let rest = url.strip_prefix("data:").ok_or(AssetError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(AssetError::NotDataUrl)?;
    let mime = meta.strip_suffix(";base64").ok_or(AssetError::NotDataUrl)?;
    Ok((mime, payload))
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}
