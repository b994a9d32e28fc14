use std::collections::{HashMap, HashSet};

use project::TextureAsset;

use crate::binder::{ChannelBinder, TextureRef};
use crate::error::EngineError;
use crate::types::MAX_TEXTURES;

#[derive(Debug)]
struct AssetSlot<T> {
    id: String,
    data_url: String,
    texture: Option<T>,
    failed: bool,
}

/// What the caller must do after the asset list changed.
#[derive(Debug)]
pub struct SlotUpdate<T> {
    /// GPU textures of assets that left the list or whose image data
    /// changed; release them now.
    pub released: Vec<T>,
    /// Newly listed assets that still need decoding.
    pub pending: Vec<TextureAsset>,
}

/// The shared asset textures (`iTexChannel0..7`) and the neutral placeholder.
#[derive(Debug)]
pub struct TextureSlotTable<T> {
    placeholder: T,
    slots: Vec<AssetSlot<T>>,
}

impl<T> TextureSlotTable<T> {
    pub fn new(placeholder: T) -> Self {
        Self {
            placeholder,
            slots: Vec::new(),
        }
    }

    pub fn placeholder(&self) -> &T {
        &self.placeholder
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Adopts a new asset list. Textures are kept for assets listed again
    /// with the same id and data; the rest are handed back for release and
    /// re-listed entries are decoded again. Nothing changes on error.
    pub fn replace(&mut self, assets: &[TextureAsset]) -> Result<SlotUpdate<T>, EngineError> {
        if assets.len() > MAX_TEXTURES {
            return Err(EngineError::Capacity {
                what: "texture",
                max: MAX_TEXTURES,
            });
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = assets.iter().find(|asset| !seen.insert(asset.id.as_str())) {
            return Err(EngineError::Configuration(format!(
                "texture id `{}` is listed twice",
                duplicate.id
            )));
        }

        let mut previous: HashMap<String, AssetSlot<T>> = self
            .slots
            .drain(..)
            .map(|slot| (slot.id.clone(), slot))
            .collect();
        let mut pending = Vec::new();
        let mut released = Vec::new();
        for asset in assets {
            match previous.remove(&asset.id) {
                Some(slot) if slot.data_url == asset.data_url => self.slots.push(slot),
                stale => {
                    released.extend(stale.and_then(|slot| slot.texture));
                    self.slots.push(AssetSlot {
                        id: asset.id.clone(),
                        data_url: asset.data_url.clone(),
                        texture: None,
                        failed: false,
                    });
                    pending.push(asset.clone());
                }
            }
        }
        released.extend(previous.into_values().filter_map(|slot| slot.texture));
        Ok(SlotUpdate { released, pending })
    }

    fn awaiting(&self, id: &str, data_url: &str) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.id == id && slot.data_url == data_url && slot.texture.is_none()
        })
    }

    /// True while `id` is listed with this data and waiting for its texture.
    pub fn is_pending(&self, id: &str, data_url: &str) -> bool {
        self.awaiting(id, data_url)
            .is_some_and(|index| !self.slots[index].failed)
    }

    /// Installs a decoded texture. Hands the texture back when no slot is
    /// waiting for `id` with this data.
    pub fn publish(&mut self, id: &str, data_url: &str, texture: T) -> Result<usize, T> {
        match self.awaiting(id, data_url) {
            Some(index) => {
                self.slots[index].texture = Some(texture);
                self.slots[index].failed = false;
                Ok(index)
            }
            None => Err(texture),
        }
    }

    /// Marks a listed asset as undecodable; its slot keeps the placeholder.
    pub fn mark_failed(&mut self, id: &str, data_url: &str) -> Option<usize> {
        let index = self.awaiting(id, data_url)?;
        self.slots[index].failed = true;
        Some(index)
    }

    pub fn bindings(&self) -> [TextureRef; MAX_TEXTURES] {
        let ready: Vec<bool> = self.slots.iter().map(|slot| slot.texture.is_some()).collect();
        ChannelBinder::asset_slots(&ready)
    }

    /// Texture bound to `slot`, or the placeholder.
    pub fn resolve(&self, slot: usize) -> &T {
        self.slots
            .get(slot)
            .and_then(|slot| slot.texture.as_ref())
            .unwrap_or(&self.placeholder)
    }

    /// Every texture the table owns, placeholder included.
    pub fn into_textures(self) -> Vec<T> {
        let mut textures: Vec<T> = self
            .slots
            .into_iter()
            .filter_map(|slot| slot.texture)
            .collect();
        textures.push(self.placeholder);
        textures
    }
}
