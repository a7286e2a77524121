// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinate transforms into the canonical scene space
//!
//! The scene is right-handed and Y-up. Circuit space is Z-up with the board
//! in the XY plane, and a circuit point `(x, y, z)` lands at scene
//! `(x, z, y)`. Mesh producers disagree on their axes, so every loader maps
//! its source convention through a [`CoordinateTransformConfig`].
//!
//! A config is applied in this order: axis mapping, flips, rotation
//! (X then Y then Z, degrees), uniform scale.

use crate::mesh::Mesh;
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// A source axis, optionally negated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignedAxis {
    #[serde(rename = "x")]
    X,
    #[serde(rename = "y")]
    Y,
    #[serde(rename = "z")]
    Z,
    #[serde(rename = "-x")]
    NegX,
    #[serde(rename = "-y")]
    NegY,
    #[serde(rename = "-z")]
    NegZ,
}

impl SignedAxis {
    /// Row of the mapping matrix that reads this axis
    fn row(self) -> Vector3<f64> {
        match self {
            SignedAxis::X => Vector3::x(),
            SignedAxis::Y => Vector3::y(),
            SignedAxis::Z => Vector3::z(),
            SignedAxis::NegX => -Vector3::x(),
            SignedAxis::NegY => -Vector3::y(),
            SignedAxis::NegZ => -Vector3::z(),
        }
    }
}

/// Which source axis feeds each output axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisMapping {
    pub x: SignedAxis,
    pub y: SignedAxis,
    pub z: SignedAxis,
}

impl AxisMapping {
    pub const IDENTITY: AxisMapping = AxisMapping {
        x: SignedAxis::X,
        y: SignedAxis::Y,
        z: SignedAxis::Z,
    };

    fn matrix(&self) -> Matrix3<f64> {
        Matrix3::from_rows(&[
            self.x.row().transpose(),
            self.y.row().transpose(),
            self.z.row().transpose(),
        ])
    }
}

/// Euler rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotationDegrees {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// Mapping from a source axis convention into canonical scene space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateTransformConfig {
    #[serde(default)]
    pub axis_mapping: Option<AxisMapping>,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
    #[serde(default)]
    pub flip_z: bool,
    #[serde(default)]
    pub rotation: Option<RotationDegrees>,
    #[serde(default)]
    pub scale: Option<f64>,
}

impl CoordinateTransformConfig {
    /// The combined linear map
    pub fn matrix(&self) -> Matrix3<f64> {
        let mapping = self
            .axis_mapping
            .unwrap_or(AxisMapping::IDENTITY)
            .matrix();

        let flips = Matrix3::from_diagonal(&Vector3::new(
            if self.flip_x { -1.0 } else { 1.0 },
            if self.flip_y { -1.0 } else { 1.0 },
            if self.flip_z { -1.0 } else { 1.0 },
        ));

        let rotation = self
            .rotation
            .map(|r| {
                let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), r.x.to_radians());
                let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), r.y.to_radians());
                let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), r.z.to_radians());
                (rz * ry * rx).into_inner()
            })
            .unwrap_or_else(Matrix3::identity);

        let scale = self.scale.filter(|s| s.is_finite() && *s != 0.0).unwrap_or(1.0);

        rotation * flips * mapping * scale
    }

    /// Map a single point
    pub fn apply_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.matrix() * p.coords)
    }

    /// Map a whole mesh
    pub fn apply(&self, mesh: &Mesh) -> Mesh {
        mesh.transformed(&self.matrix())
    }

    /// Stable text form used in cache keys
    pub fn cache_signature(&self) -> String {
        format!("{:?}", self)
    }
}

/// Named transform presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformPreset {
    /// Generic Z-up model: `(x, y, z)` → `(x, z, y)`
    ZUpToYUp,
    /// Z-up model from producers that export with X mirrored
    ZUpToYUpUsbFix,
    /// Z-up OBJ export, which also faces the opposite way along Y
    ObjZUpToYUp,
    /// Geometry from the parametric footprint generator
    Footprinter,
}

impl TransformPreset {
    pub const ALL: [TransformPreset; 4] = [
        TransformPreset::ZUpToYUp,
        TransformPreset::ZUpToYUpUsbFix,
        TransformPreset::ObjZUpToYUp,
        TransformPreset::Footprinter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TransformPreset::ZUpToYUp => "Z_UP_TO_Y_UP",
            TransformPreset::ZUpToYUpUsbFix => "Z_UP_TO_Y_UP_USB_FIX",
            TransformPreset::ObjZUpToYUp => "OBJ_Z_UP_TO_Y_UP",
            TransformPreset::Footprinter => "FOOTPRINTER",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub fn config(self) -> CoordinateTransformConfig {
        let z_up = AxisMapping {
            x: SignedAxis::X,
            y: SignedAxis::Z,
            z: SignedAxis::Y,
        };
        match self {
            TransformPreset::ZUpToYUp => CoordinateTransformConfig {
                axis_mapping: Some(z_up),
                ..Default::default()
            },
            TransformPreset::ZUpToYUpUsbFix => CoordinateTransformConfig {
                axis_mapping: Some(z_up),
                flip_x: true,
                ..Default::default()
            },
            TransformPreset::ObjZUpToYUp => CoordinateTransformConfig {
                axis_mapping: Some(z_up),
                rotation: Some(RotationDegrees {
                    x: 0.0,
                    y: 180.0,
                    z: 0.0,
                }),
                ..Default::default()
            },
            TransformPreset::Footprinter => CoordinateTransformConfig {
                axis_mapping: Some(AxisMapping {
                    x: SignedAxis::X,
                    y: SignedAxis::Z,
                    z: SignedAxis::NegY,
                }),
                ..Default::default()
            },
        }
    }
}

impl From<TransformPreset> for CoordinateTransformConfig {
    fn from(preset: TransformPreset) -> Self {
        preset.config()
    }
}
