// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board texture rendering seam
//!
//! Copper and solder-mask images are drawn by a host-supplied renderer. A
//! renderer failure never aborts a conversion; the surface keeps its flat
//! color.

use crate::types::BoxTextures;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pcb_scene_core::{CircuitEntities, Point};
use pcb_scene_geometry::Color;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Texture rendering failed: {0}")]
pub struct TextureError(pub String);

/// What to draw: one surface, in circuit coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TextureTarget {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    /// Pixels along the longer side
    pub resolution: u32,
    pub board_color: Color,
    pub copper_color: Color,
}

/// An encoded PNG image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl TextureImage {
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedTextures {
    pub top: Option<TextureImage>,
    pub bottom: Option<TextureImage>,
}

impl RenderedTextures {
    pub fn into_box_textures(self) -> BoxTextures {
        BoxTextures {
            top: self.top.as_ref().map(TextureImage::to_data_url),
            bottom: self.bottom.as_ref().map(TextureImage::to_data_url),
        }
    }
}

#[async_trait]
pub trait BoardTextureRenderer: Send + Sync {
    async fn render(
        &self,
        entities: &CircuitEntities,
        target: &TextureTarget,
    ) -> std::result::Result<RenderedTextures, TextureError>;
}
