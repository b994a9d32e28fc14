use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use image::imageops::flip_vertical_in_place;
use project::{AssetError, TextureAsset};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error(transparent)]
    Source(#[from] AssetError),

    #[error("image data could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

/// RGBA8 pixels with row 0 at the bottom of the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn decode_asset(asset: &TextureAsset) -> Result<DecodedImage, AssetLoadError> {
    let bytes = asset.bytes()?;
    let image = image::load_from_memory(&bytes)?;
    let mut rgba = image.to_rgba8();
    flip_vertical_in_place(&mut rgba);
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

#[derive(Debug)]
pub(crate) struct LoadedAsset {
    pub id: String,
    /// Content the result was decoded from; a slot only accepts a match.
    pub data_url: String,
    pub result: Result<DecodedImage, AssetLoadError>,
}

/// Decodes assets on worker threads and hands results back through a channel
/// that the tick drains at its start.
#[derive(Debug)]
pub(crate) struct AssetLoader {
    sender: Sender<LoadedAsset>,
    receiver: Receiver<LoadedAsset>,
    in_flight: usize,
}

impl AssetLoader {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub(crate) fn request(&mut self, asset: TextureAsset) {
        let sender = self.sender.clone();
        let job = asset.clone();
        let spawned = thread::Builder::new()
            .name("asset-decode".into())
            .spawn(move || {
                let result = decode_asset(&job);
                let _ = sender.send(LoadedAsset {
                    id: job.id,
                    data_url: job.data_url,
                    result,
                });
            });
        if let Err(err) = spawned {
            tracing::warn!(id = %asset.id, error = %err, "failed to spawn decode thread; decoding inline");
            let result = decode_asset(&asset);
            let _ = self.sender.send(LoadedAsset {
                id: asset.id,
                data_url: asset.data_url,
                result,
            });
        }
        self.in_flight += 1;
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Results that arrived since the last call, without blocking.
    pub(crate) fn drain(&mut self) -> Vec<LoadedAsset> {
        let loaded: Vec<_> = self.receiver.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(loaded.len());
        loaded
    }

    /// Blocks until every requested decode has reported or `timeout` passes.
    pub(crate) fn wait(&mut self, timeout: Duration) -> Vec<LoadedAsset> {
        let deadline = Instant::now() + timeout;
        let mut loaded = Vec::new();
        while self.in_flight > 0 {
            match self.receiver.recv_deadline(deadline) {
                Ok(asset) => {
                    self.in_flight -= 1;
                    loaded.push(asset);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        loaded
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::striped_png;
    use super::*;

    #[test]
    fn decode_flips_rows_to_bottom_origin() {
        let decoded = decode_asset(&striped_png("stripes.png")).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 2));
        assert_eq!(&decoded.rgba[0..4], &[0, 0, 255, 255]);
        assert_eq!(&decoded.rgba[8..12], &[255, 0, 0, 255]);
    }

    #[test]
    fn undecodable_bytes_are_reported() {
        let asset = TextureAsset::from_bytes("fake.png", "image/png", b"not a png").unwrap();
        assert!(matches!(decode_asset(&asset), Err(AssetLoadError::Decode(_))));

        let asset = TextureAsset::new("x", "x", "nonsense");
        assert!(matches!(decode_asset(&asset), Err(AssetLoadError::Source(_))));
    }

    #[test]
    fn loader_hands_back_every_request() {
        let mut loader = AssetLoader::new();
        let good = striped_png("good.png");
        let bad = TextureAsset::new("bad", "bad.png", "data:image/png;base64,AAAA");
        loader.request(good.clone());
        loader.request(bad);
        assert_eq!(loader.in_flight(), 2);

        let mut loaded = loader.wait(Duration::from_secs(10));
        loaded.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loader.in_flight(), 0);
        assert!(loaded[0].result.is_err());
        assert_eq!(loaded[1].id, good.id);
        assert_eq!(loaded[1].data_url, good.data_url);
        assert!(loaded[1].result.is_ok());
    }
}
