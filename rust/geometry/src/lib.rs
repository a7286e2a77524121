// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PCB-Scene Geometry
//!
//! Board and panel solids built with earcutr triangulation and csgrs
//! booleans, the coordinate transforms every mesh producer is normalized
//! through, and frustum-exact camera fitting.

pub mod board;
pub mod camera;
pub mod csg;
pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};

pub use board::{build_board_solid, build_panel_solid, build_solid, Outline, Subtraction, SurfaceSolid};
pub use camera::{fit_camera, required_distance, CameraFit, CameraFitOptions, FitTarget};
pub use csg::{BooleanProcessor, DEFAULT_BATCH_SIZE};
pub use error::{Error, Result};
pub use extrusion::extrude_polygon;
pub use mesh::{BoundingBox, Color, Material, Mesh, Triangle};
pub use transform::{AxisMapping, CoordinateTransformConfig, RotationDegrees, SignedAxis, TransformPreset};
pub use triangulation::triangulate_polygon;
