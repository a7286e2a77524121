// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion options
//!
//! Every option is optional on the wire; missing fields take the defaults
//! below. Two options can also come from the environment:
//!
//! | Variable | Option |
//! |---|---|
//! | `PCB_SCENE_PROJECT_BASE_URL` | `projectBaseUrl` |
//! | `PCB_SCENE_BOARD_THICKNESS` | `boardThickness` |

use pcb_scene_geometry::{Color, CoordinateTransformConfig};
use pcb_scene_loaders::AuthHeaders;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BOARD_THICKNESS: f64 = 1.4;
pub const DEFAULT_COMPONENT_HEIGHT: f64 = 2.0;

pub const DEFAULT_BOARD_COLOR: Color = Color::rgb(0.0, 0.42, 0.2);
pub const DEFAULT_COMPONENT_COLOR: Color = Color::rgb(0.5, 0.5, 0.5);
pub const DEFAULT_COPPER_COLOR: Color = Color::rgb(0.85, 0.55, 0.22);

const ENV_PROJECT_BASE_URL: &str = "PCB_SCENE_PROJECT_BASE_URL";
const ENV_BOARD_THICKNESS: &str = "PCB_SCENE_BOARD_THICKNESS";

/// Options for one circuit-to-scene conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    /// Flat color of the board or panel
    pub board_color: Color,
    /// Color of bounding boxes and of components whose model did not load
    pub component_color: Color,
    /// Copper color handed to the texture renderer
    pub copper_color: Color,
    /// Used only when the first board declares no thickness
    pub board_thickness: f64,
    /// Synthesize a board when the circuit has neither board nor panel
    pub draw_faux_board: bool,
    pub default_component_height: f64,
    pub render_board_textures: bool,
    /// Texture size in pixels; 0 disables textures
    pub texture_resolution: u32,
    /// Replaces every format's default transform
    pub coordinate_transform: Option<CoordinateTransformConfig>,
    pub show_bounding_boxes: bool,
    /// Base for relative and package model references
    pub project_base_url: Option<String>,
    /// Forwarded verbatim to every fetch that carries auth
    pub auth_headers: AuthHeaders,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            board_color: DEFAULT_BOARD_COLOR,
            component_color: DEFAULT_COMPONENT_COLOR,
            copper_color: DEFAULT_COPPER_COLOR,
            board_thickness: DEFAULT_BOARD_THICKNESS,
            draw_faux_board: false,
            default_component_height: DEFAULT_COMPONENT_HEIGHT,
            render_board_textures: false,
            texture_resolution: 0,
            coordinate_transform: None,
            show_bounding_boxes: true,
            project_base_url: None,
            auth_headers: AuthHeaders::new(),
        }
    }
}

impl ConversionOptions {
    /// Defaults overlaid with the environment
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlay environment variables onto these options
    pub fn with_env(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Overlay variables from `lookup`; unset, empty or unparsable values are ignored
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup(ENV_PROJECT_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.project_base_url = Some(base.trim().to_string());
        }

        if let Some(raw) = lookup(ENV_BOARD_THICKNESS) {
            match raw.trim().parse::<f64>() {
                Ok(t) if t.is_finite() && t > 0.0 => self.board_thickness = t,
                _ => tracing::warn!(variable = ENV_BOARD_THICKNESS, value = %raw, "Ignoring invalid board thickness"),
            }
        }

        self
    }

    /// Parse options from JSON, filling gaps with defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub(crate) fn textures_enabled(&self) -> bool {
        self.render_board_textures && self.texture_resolution > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_scene_geometry::TransformPreset;

    #[test]
    fn test_defaults() {
        let options = ConversionOptions::default();
        assert_eq!(options.board_thickness, 1.4);
        assert_eq!(options.default_component_height, 2.0);
        assert!(options.show_bounding_boxes);
        assert!(!options.draw_faux_board);
        assert!(!options.textures_enabled());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = ConversionOptions::from_json(
            r#"{
                "drawFauxBoard": true,
                "textureResolution": 512,
                "renderBoardTextures": true,
                "authHeaders": {"Authorization": "Bearer t"},
                "coordinateTransform": {"flipX": true}
            }"#,
        )
        .unwrap();

        assert!(options.draw_faux_board);
        assert!(options.textures_enabled());
        assert_eq!(options.board_thickness, DEFAULT_BOARD_THICKNESS);
        assert_eq!(options.auth_headers["Authorization"], "Bearer t");
        assert!(options.coordinate_transform.unwrap().flip_x);
    }

    #[test]
    fn test_preset_as_transform_override() {
        let options = ConversionOptions {
            coordinate_transform: Some(TransformPreset::ZUpToYUpUsbFix.config()),
            ..Default::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(ConversionOptions::from_json(&json).unwrap(), options);
    }

    #[test]
    fn test_env_overlay() {
        let vars = |name: &str| match name {
            "PCB_SCENE_PROJECT_BASE_URL" => Some("https://api.example.com ".to_string()),
            "PCB_SCENE_BOARD_THICKNESS" => Some("1.6".to_string()),
            _ => None,
        };
        let options = ConversionOptions::default().with_vars(vars);
        assert_eq!(options.project_base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(options.board_thickness, 1.6);
    }

    #[test]
    fn test_invalid_env_thickness_is_ignored() {
        let options = ConversionOptions::default().with_vars(|name| {
            (name == "PCB_SCENE_BOARD_THICKNESS").then(|| "thick".to_string())
        });
        assert_eq!(options.board_thickness, DEFAULT_BOARD_THICKNESS);
        assert!(options.project_base_url.is_none());
    }
}
