// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Circuit record types
//!
//! A circuit description is a flat, unordered list of `type`-tagged records.
//! Records cross-reference each other through string ids
//! (`pcb_board_id`, `source_component_id`, ...). All lengths are millimetres.

use serde::{Deserialize, Serialize};

/// 2D point in the board plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 3D vector in circuit space (Z points out of the board top)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vec3 {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Copper layer a component is mounted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[default]
    Top,
    Bottom,
}

/// One record of the circuit description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CircuitRecord {
    PcbBoard(PcbBoard),
    PcbPanel(PcbPanel),
    PcbHole(PcbHole),
    PcbPlatedHole(PcbPlatedHole),
    PcbCutout(PcbCutout),
    PcbComponent(PcbComponent),
    SourceComponent(SourceComponent),
    CadComponent(CadComponent),
    /// Any record kind this engine does not consume (traces, silkscreen, ...)
    #[serde(other)]
    Unknown,
}

impl CircuitRecord {
    /// Parse a JSON array of records
    pub fn parse_list(json: &str) -> crate::Result<Vec<CircuitRecord>> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbBoard {
    pub pcb_board_id: String,
    #[serde(default)]
    pub center: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub thickness: Option<f64>,
    /// Polygonal outline in absolute board coordinates; overrides the rectangle
    #[serde(default)]
    pub outline: Option<Vec<Point>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbPanel {
    pub pcb_panel_id: String,
    #[serde(default)]
    pub center: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub outline: Option<Vec<Point>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleShape {
    #[default]
    Circle,
    Oval,
    Pill,
    Rect,
    Square,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbHole {
    #[serde(default)]
    pub pcb_hole_id: String,
    #[serde(default)]
    pub hole_shape: HoleShape,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub hole_diameter: Option<f64>,
    #[serde(default)]
    pub hole_width: Option<f64>,
    #[serde(default)]
    pub hole_height: Option<f64>,
    #[serde(default)]
    pub pcb_board_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatedHoleShape {
    #[default]
    Circle,
    Oval,
    Pill,
    CircularHoleWithRectPad,
    PillHoleWithRectPad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbPlatedHole {
    #[serde(default)]
    pub pcb_plated_hole_id: String,
    #[serde(default)]
    pub shape: PlatedHoleShape,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub hole_diameter: Option<f64>,
    #[serde(default)]
    pub outer_diameter: Option<f64>,
    #[serde(default)]
    pub hole_width: Option<f64>,
    #[serde(default)]
    pub hole_height: Option<f64>,
    #[serde(default)]
    pub pcb_board_id: Option<String>,
}

/// Shape of a removed region of board or panel material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CutoutShape {
    Rect {
        center: Point,
        width: f64,
        height: f64,
        /// Degrees, counter-clockwise
        #[serde(default)]
        rotation: Option<f64>,
    },
    Circle {
        center: Point,
        radius: f64,
    },
    Polygon {
        points: Vec<Point>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbCutout {
    #[serde(default)]
    pub pcb_cutout_id: String,
    /// `None` marks a panel-level cutout
    #[serde(default)]
    pub pcb_board_id: Option<String>,
    #[serde(flatten)]
    pub shape: CutoutShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbComponent {
    pub pcb_component_id: String,
    #[serde(default)]
    pub source_component_id: Option<String>,
    #[serde(default)]
    pub center: Point,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub layer: Layer,
    /// Degrees, counter-clockwise around the board normal
    #[serde(default)]
    pub rotation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceComponent {
    pub source_component_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CadComponent {
    #[serde(default)]
    pub cad_component_id: String,
    pub pcb_component_id: String,
    #[serde(default)]
    pub source_component_id: Option<String>,
    /// Explicit center in circuit space
    #[serde(default)]
    pub position: Option<Vec3>,
    /// Explicit rotation in degrees (circuit axes)
    #[serde(default)]
    pub rotation: Option<Vec3>,
    /// Explicit size in model units
    #[serde(default)]
    pub size: Option<Vec3>,
    #[serde(default)]
    pub layer: Option<Layer>,
    #[serde(default)]
    pub model_stl_url: Option<String>,
    #[serde(default)]
    pub model_obj_url: Option<String>,
    #[serde(default)]
    pub model_glb_url: Option<String>,
    #[serde(default)]
    pub model_gltf_url: Option<String>,
    #[serde(default)]
    pub model_step_url: Option<String>,
    #[serde(default)]
    pub footprinter_string: Option<String>,
    #[serde(default)]
    pub model_unit_to_mm_scale_factor: Option<f64>,
    #[serde(default)]
    pub show_as_translucent_model: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_records() {
        let json = r#"[
            {"type": "pcb_board", "pcb_board_id": "b1", "center": {"x": 0, "y": 0}, "width": 40, "height": 30},
            {"type": "pcb_trace", "pcb_trace_id": "t1", "route": []},
            {"type": "pcb_cutout", "pcb_cutout_id": "c1", "shape": "circle", "center": {"x": 1, "y": 2}, "radius": 3},
            {"type": "pcb_component", "pcb_component_id": "p1", "center": {"x": 5, "y": 5}, "width": 2, "height": 1, "layer": "bottom"}
        ]"#;

        let records = CircuitRecord::parse_list(json).unwrap();
        assert_eq!(records.len(), 4);
        assert!(matches!(records[1], CircuitRecord::Unknown));

        match &records[2] {
            CircuitRecord::PcbCutout(cutout) => {
                assert!(cutout.pcb_board_id.is_none());
                assert_eq!(
                    cutout.shape,
                    CutoutShape::Circle {
                        center: Point::new(1.0, 2.0),
                        radius: 3.0
                    }
                );
            }
            other => panic!("Expected cutout, got {:?}", other),
        }

        match &records[3] {
            CircuitRecord::PcbComponent(component) => assert_eq!(component.layer, Layer::Bottom),
            other => panic!("Expected component, got {:?}", other),
        }
    }

    #[test]
    fn test_rect_cutout_with_board_scope() {
        let json = r#"{"type": "pcb_cutout", "pcb_board_id": "b1", "shape": "rect",
                       "center": {"x": 0, "y": 0}, "width": 4, "height": 2}"#;
        let record: CircuitRecord = serde_json::from_str(json).unwrap();
        let CircuitRecord::PcbCutout(cutout) = record else {
            panic!("Expected cutout");
        };
        assert_eq!(cutout.pcb_board_id.as_deref(), Some("b1"));
        assert!(matches!(cutout.shape, CutoutShape::Rect { width, .. } if width == 4.0));
    }
}
