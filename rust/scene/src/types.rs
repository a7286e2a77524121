// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene output types
//!
//! All positions and sizes are in canonical Y-up scene space, millimetres.

use pcb_scene_geometry::{Color, Mesh};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Top and bottom surface images as data URLs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxTextures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<String>,
}

impl BoxTextures {
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.bottom.is_none()
    }
}

/// One placed primitive: a box, optionally carrying a mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Box3D {
    pub center: [f64; 3],
    pub size: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<Arc<Mesh>>,
    /// Flat color, only when there is no mesh or for surfaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textures: Option<BoxTextures>,
    /// Euler angles in radians
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub is_translucent: bool,
}

impl Box3D {
    /// Plain colored box
    pub fn new(center: [f64; 3], size: [f64; 3]) -> Self {
        Self {
            center,
            size,
            mesh: None,
            color: None,
            textures: None,
            rotation: None,
            label: None,
            is_translucent: false,
        }
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Horizontal extent `(min_x, min_z, max_x, max_z)`
    pub(crate) fn footprint(&self) -> (f64, f64, f64, f64) {
        let [cx, _, cz] = self.center;
        let [w, _, d] = self.size;
        (cx - w / 2.0, cz - d / 2.0, cx + w / 2.0, cz + d / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub position: [f64; 3],
    pub look_at: [f64; 3],
    pub up: [f64; 3],
    /// Vertical field of view in degrees
    pub fov: f64,
    pub near: f64,
    pub far: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f64,
    },
    Directional {
        color: Color,
        intensity: f64,
        /// Direction the light travels, normalized
        direction: [f64; 3],
    },
}

/// A complete scene ready for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene3D {
    pub boxes: Vec<Box3D>,
    pub camera: Camera,
    pub lights: Vec<Light>,
}

impl Scene3D {
    pub fn meshes(&self) -> impl Iterator<Item = &Arc<Mesh>> {
        self.boxes.iter().filter_map(|b| b.mesh.as_ref())
    }

    pub fn labeled(&self, label: &str) -> Option<&Box3D> {
        self.boxes.iter().find(|b| b.label.as_deref() == Some(label))
    }
}
