use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::asset::{timestamped_id, TextureAsset};
use crate::defaults::{
    new_buffer_source, DEFAULT_BUFFER_A_SOURCE, DEFAULT_BUFFER_B_SOURCE, DEFAULT_FINAL_SOURCE,
    HELP_TEXT,
};
use crate::{ProjectError, FINAL_PASS_ID, HELP_ID, MAX_BUFFERS, MAX_TEXTURES};

/// Everything needed to rebuild a sandbox session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub shader_codes: BTreeMap<String, String>,
    pub buffers: Vec<String>,
    pub textures: Vec<TextureAsset>,
}

/// Wire shape used while importing so absent fields can be named precisely.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    shader_codes: Option<BTreeMap<String, String>>,
    buffers: Option<Vec<String>>,
    textures: Option<Vec<TextureAsset>>,
}

impl Default for Project {
    fn default() -> Self {
        let mut shader_codes = BTreeMap::new();
        shader_codes.insert(HELP_ID.to_string(), HELP_TEXT.to_string());
        shader_codes.insert(FINAL_PASS_ID.to_string(), DEFAULT_FINAL_SOURCE.to_string());
        shader_codes.insert("bufferA".to_string(), DEFAULT_BUFFER_A_SOURCE.to_string());
        shader_codes.insert("bufferB".to_string(), DEFAULT_BUFFER_B_SOURCE.to_string());
        Self {
            shader_codes,
            buffers: vec!["bufferA".to_string(), "bufferB".to_string()],
            textures: Vec::new(),
        }
    }
}

impl Project {
    pub fn from_json(text: &str) -> Result<Self, ProjectError> {
        let record: ProjectRecord = serde_json::from_str(text)?;
        let project = Self {
            shader_codes: record
                .shader_codes
                .ok_or(ProjectError::MissingField("shaderCodes"))?,
            buffers: record.buffers.ok_or(ProjectError::MissingField("buffers"))?,
            textures: record
                .textures
                .ok_or(ProjectError::MissingField("textures"))?,
        };
        project.validate()?;
        Ok(project)
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let text = fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        let text = self.to_json()?;
        fs::write(path, text).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks the structural rules every consumer relies on.
    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.buffers.len() > MAX_BUFFERS {
            return Err(ProjectError::Capacity {
                what: "buffer pass",
                max: MAX_BUFFERS,
            });
        }
        if self.textures.len() > MAX_TEXTURES {
            return Err(ProjectError::Capacity {
                what: "texture",
                max: MAX_TEXTURES,
            });
        }
        if !self.shader_codes.contains_key(FINAL_PASS_ID) {
            return Err(ProjectError::Invalid(format!(
                "shaderCodes has no `{FINAL_PASS_ID}` entry"
            )));
        }

        let mut seen = HashSet::new();
        for id in &self.buffers {
            if id.trim().is_empty() {
                return Err(ProjectError::Invalid("buffer ids must not be empty".into()));
            }
            if id == FINAL_PASS_ID || id == HELP_ID {
                return Err(ProjectError::Invalid(format!(
                    "`{id}` is reserved and cannot name a buffer pass"
                )));
            }
            if !seen.insert(id.as_str()) {
                return Err(ProjectError::Invalid(format!("buffer `{id}` is listed twice")));
            }
        }

        let mut texture_ids = HashSet::new();
        for asset in &self.textures {
            if !texture_ids.insert(asset.id.as_str()) {
                return Err(ProjectError::Invalid(format!(
                    "texture `{}` is listed twice",
                    asset.id
                )));
            }
        }
        Ok(())
    }

    /// Source for `id`; buffers without an entry compile as an empty body.
    pub fn source(&self, id: &str) -> &str {
        self.shader_codes.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn set_source(&mut self, id: impl Into<String>, source: impl Into<String>) {
        self.shader_codes.insert(id.into(), source.into());
    }

    /// Appends the next lettered buffer with a starter shader and returns its id.
    pub fn add_buffer(&mut self) -> Result<String, ProjectError> {
        if self.buffers.len() >= MAX_BUFFERS {
            return Err(ProjectError::Capacity {
                what: "buffer pass",
                max: MAX_BUFFERS,
            });
        }
        let id = (self.buffers.len()..MAX_BUFFERS)
            .map(buffer_id)
            .find(|candidate| !self.buffers.contains(candidate))
            .ok_or(ProjectError::Capacity {
                what: "buffer pass",
                max: MAX_BUFFERS,
            })?;
        self.shader_codes
            .insert(id.clone(), new_buffer_source(&id));
        self.buffers.push(id.clone());
        Ok(id)
    }

    /// Removes the last buffer and its source. The first buffer always stays.
    pub fn remove_last_buffer(&mut self) -> Result<String, ProjectError> {
        if self.buffers.len() <= 1 {
            return Err(ProjectError::Invalid(
                "a project keeps at least one buffer pass".into(),
            ));
        }
        let id = self
            .buffers
            .pop()
            .ok_or_else(|| ProjectError::Invalid("no buffer passes to remove".into()))?;
        self.shader_codes.remove(&id);
        Ok(id)
    }

    /// Appends a texture, rejecting the ninth without touching the list.
    pub fn push_texture(&mut self, mut asset: TextureAsset) -> Result<usize, ProjectError> {
        if self.textures.len() >= MAX_TEXTURES {
            return Err(ProjectError::Capacity {
                what: "texture",
                max: MAX_TEXTURES,
            });
        }
        if self.textures.iter().any(|existing| existing.id == asset.id) {
            asset.id = format!("{}-{}", timestamped_id(&asset.name), self.textures.len());
        }
        self.textures.push(asset);
        Ok(self.textures.len() - 1)
    }

    pub fn remove_texture(&mut self, id: &str) -> Option<TextureAsset> {
        let index = self.textures.iter().position(|asset| asset.id == id)?;
        Some(self.textures.remove(index))
    }

    /// Same sources, buffer order, and texture contents; texture ids may differ.
    pub fn same_content(&self, other: &Project) -> bool {
        self.shader_codes == other.shader_codes
            && self.buffers == other.buffers
            && self.textures.len() == other.textures.len()
            && self
                .textures
                .iter()
                .zip(&other.textures)
                .all(|(a, b)| a.same_content(b))
    }
}

fn buffer_id(index: usize) -> String {
    let letter = char::from(b'A' + index as u8);
    format!("buffer{letter}")
}
