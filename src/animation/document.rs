//! Human-readable JSON form of an animation.
//!
//! Written next to the binary file for inspection. Entries are stored as
//! `[index, b, g, r]` arrays, matching the channel order LED firmware
//! tooling expects.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::delta::{Animation, ChangeEntry};
use crate::error::{Error, Result};

/// Channel order tag written into the metadata.
pub const DOCUMENT_FORMAT: &str = "bgr";

/// Encoding tag written into the metadata.
pub const DOCUMENT_TYPE: &str = "diff";

/// File extension of the JSON form.
pub const DOCUMENT_EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub total_pixels: u32,
    pub frame_count: u32,
    pub format: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// `[index, b, g, r]`
pub type DocumentEntry = (u32, u8, u8, u8);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationDocument {
    pub metadata: DocumentMetadata,
    pub frames: Vec<Vec<DocumentEntry>>,
}

impl AnimationDocument {
    pub fn from_animation(animation: &Animation) -> Self {
        let frames = animation
            .frames
            .iter()
            .map(|changes| {
                changes
                    .iter()
                    .map(|e| (e.index, e.pixel.b, e.pixel.g, e.pixel.r))
                    .collect()
            })
            .collect();

        Self {
            metadata: DocumentMetadata {
                name: animation.label.clone(),
                width: animation.width,
                height: animation.height,
                total_pixels: animation.pixel_count() as u32,
                frame_count: animation.frame_count() as u32,
                format: DOCUMENT_FORMAT.to_string(),
                kind: DOCUMENT_TYPE.to_string(),
            },
            frames,
        }
    }

    /// Check metadata consistency and index ranges.
    pub fn validate(&self) -> Result<()> {
        let meta = &self.metadata;
        if meta.format != DOCUMENT_FORMAT {
            return Err(Error::Document(format!(
                "unsupported channel order {:?}",
                meta.format
            )));
        }
        if meta.kind != DOCUMENT_TYPE {
            return Err(Error::Document(format!(
                "unsupported encoding {:?}",
                meta.kind
            )));
        }
        let pixels = meta.width as u32 * meta.height as u32;
        if meta.total_pixels != pixels {
            return Err(Error::Document(format!(
                "total_pixels {} does not match {}x{}",
                meta.total_pixels, meta.width, meta.height
            )));
        }
        if meta.frame_count as usize != self.frames.len() {
            return Err(Error::Document(format!(
                "frame_count {} but {} frames present",
                meta.frame_count,
                self.frames.len()
            )));
        }
        for (i, frame) in self.frames.iter().enumerate() {
            if let Some(&(index, ..)) = frame.iter().find(|(index, ..)| *index >= pixels) {
                return Err(Error::Document(format!(
                    "frame {} references pixel {} of {}",
                    i, index, pixels
                )));
            }
        }
        Ok(())
    }

    pub fn into_animation(self) -> Result<Animation> {
        self.validate()?;
        let mut animation = Animation::new(
            self.metadata.name,
            self.metadata.width,
            self.metadata.height,
        );
        animation.frames = self
            .frames
            .into_iter()
            .map(|frame| {
                frame
                    .into_iter()
                    .map(|(index, b, g, r)| ChangeEntry::new(index, r, g, b))
                    .collect()
            })
            .collect();
        Ok(animation)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

pub fn save_document<P: AsRef<Path>>(path: P, animation: &Animation) -> Result<()> {
    let json = AnimationDocument::from_animation(animation).to_json()?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Animation> {
    let json = fs::read_to_string(path)?;
    AnimationDocument::from_json(&json)?.into_animation()
}
