use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use tracing::debug;

use crate::asset::{AssetError, TextureAsset};

const FALLBACK_NAME: &str = "texture-from-url";

/// Downloads remote images and embeds them as texture assets.
#[derive(Debug, Clone)]
pub struct TextureFetcher {
    http: Client,
}

impl TextureFetcher {
    pub fn new() -> Result<Self, AssetError> {
        let http = Client::builder()
            .build()
            .map_err(|source| AssetError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { http })
    }

    /// Fetches `url`, requiring a success status and an `image/*` content type.
    pub fn fetch(&self, url: &str) -> Result<TextureAsset, AssetError> {
        let http_error = |source| AssetError::Http {
            url: url.to_string(),
            source,
        };
        let response = self
            .http
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(http_error)?;

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !mime.starts_with("image/") {
            let reported = if mime.is_empty() {
                "missing".to_string()
            } else {
                mime
            };
            return Err(AssetError::NotImage(reported));
        }

        let bytes = response.bytes().map_err(http_error)?;
        let name = asset_name_from_url(url);
        debug!(%url, %mime, bytes = bytes.len(), %name, "fetched remote texture");
        TextureAsset::from_bytes(name, &mime, &bytes)
    }
}

/// Last non-empty path segment of `url`, or a fixed fallback name.
pub(crate) fn asset_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed.path_segments().and_then(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .last()
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}
