// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frustum-exact camera fit
//!
//! Places a camera along a view direction so that the four corners of a
//! board or panel rectangle (lying in the circuit ground plane, Z up) stay
//! inside the view frustum. Renderers disagree on whether the configured
//! FOV is vertical or horizontal, so both readings are solved and the
//! farther distance wins.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FOV_DEGREES: f64 = 45.0;
pub const DEFAULT_ASPECT_RATIO: f64 = 16.0 / 9.0;
/// Camera position returned when there is nothing to frame
pub const DEFAULT_CAMERA_POSITION: [f64; 3] = [30.0, 30.0, 25.0];
pub const MIN_DISTANCE: f64 = 1.0;

/// Rectangle to frame, in circuit millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTarget {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl FitTarget {
    fn is_framable(&self) -> bool {
        [self.center_x, self.center_y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    fn corners(&self) -> [Point3<f64>; 4] {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let (cx, cy) = (self.center_x, self.center_y);
        [
            Point3::new(cx - hw, cy - hh, 0.0),
            Point3::new(cx + hw, cy - hh, 0.0),
            Point3::new(cx + hw, cy + hh, 0.0),
            Point3::new(cx - hw, cy + hh, 0.0),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraFitOptions {
    /// View direction (camera to target); normalized before use
    #[serde(default)]
    pub direction: Option<[f64; 3]>,
    /// Field of view in degrees
    #[serde(default)]
    pub fov: Option<f64>,
    #[serde(default)]
    pub aspect_ratio: Option<f64>,
    /// With `sensor_height`, overrides `fov`
    #[serde(default)]
    pub focal_length: Option<f64>,
    #[serde(default)]
    pub sensor_height: Option<f64>,
}

impl CameraFitOptions {
    /// Field of view in degrees, from focal length/sensor height when both are given
    pub fn resolved_fov(&self) -> f64 {
        match (self.focal_length, self.sensor_height) {
            (Some(focal), Some(sensor)) if focal > 0.0 && sensor > 0.0 => {
                (2.0 * (sensor / (2.0 * focal)).atan()).to_degrees()
            }
            _ => self
                .fov
                .filter(|f| f.is_finite() && *f > 0.0 && *f < 180.0)
                .unwrap_or(DEFAULT_FOV_DEGREES),
        }
    }

    pub fn resolved_aspect_ratio(&self) -> f64 {
        self.aspect_ratio
            .filter(|a| a.is_finite() && *a > 0.0)
            .unwrap_or(DEFAULT_ASPECT_RATIO)
    }

    pub fn resolved_direction(&self) -> Vector3<f64> {
        self.direction
            .map(Vector3::from)
            .and_then(|d| d.try_normalize(1e-12))
            .unwrap_or_else(default_direction)
    }
}

fn default_direction() -> Vector3<f64> {
    Vector3::new(-1.0, -1.0, -1.0).normalize()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraFit {
    pub cam_pos: [f64; 3],
    pub look_at: [f64; 3],
    pub fov: f64,
}

/// Orthonormal (forward, right, up) basis for a view direction
fn camera_basis(forward: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let world_up = if forward.cross(&Vector3::z()).norm_squared() < 1e-12 {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let right = forward.cross(&world_up).normalize();
    let up = right.cross(&forward).normalize();
    (forward, right, up)
}

/// Smallest distance keeping every corner within the given half-frustum tangents
fn solve_distance(
    corners: &[Point3<f64>],
    center: &Point3<f64>,
    basis: (Vector3<f64>, Vector3<f64>, Vector3<f64>),
    tan_h: f64,
    tan_v: f64,
) -> f64 {
    let (forward, right, up) = basis;
    corners
        .iter()
        .map(|corner| {
            let offset = corner - center;
            let along = offset.dot(&forward);
            let horizontal = offset.dot(&right).abs() / tan_h - along;
            let vertical = offset.dot(&up).abs() / tan_v - along;
            horizontal.max(vertical)
        })
        .fold(0.0, f64::max)
}

/// Camera distance from the target center, floored at [`MIN_DISTANCE`]
pub fn required_distance(target: &FitTarget, options: &CameraFitOptions) -> f64 {
    let half_fov = (options.resolved_fov() / 2.0).to_radians();
    let aspect = options.resolved_aspect_ratio();
    let basis = camera_basis(options.resolved_direction());

    let center = Point3::new(target.center_x, target.center_y, 0.0);
    let corners = target.corners();

    // FOV read as vertical
    let tan_v = half_fov.tan();
    let as_vertical = solve_distance(&corners, &center, basis, tan_v * aspect, tan_v);

    // FOV read as horizontal
    let tan_h = half_fov.tan();
    let as_horizontal = solve_distance(&corners, &center, basis, tan_h, tan_h / aspect);

    let distance = as_vertical.max(as_horizontal);
    if distance.is_finite() {
        distance.max(MIN_DISTANCE)
    } else {
        MIN_DISTANCE
    }
}

/// Fit a camera to `target`, or return the default camera when there is none
pub fn fit_camera(target: Option<&FitTarget>, options: &CameraFitOptions) -> CameraFit {
    let fov = options.resolved_fov();

    let Some(target) = target.filter(|t| t.is_framable()) else {
        return CameraFit {
            cam_pos: DEFAULT_CAMERA_POSITION,
            look_at: [0.0, 0.0, 0.0],
            fov,
        };
    };

    let forward = options.resolved_direction();
    let distance = required_distance(target, options);
    let center = Point3::new(target.center_x, target.center_y, 0.0);
    let position = center - forward * distance;

    tracing::trace!(distance, fov, "Fitted camera to target");

    // X mirrored for the scene exporter's convention
    CameraFit {
        cam_pos: [-position.x, position.y, position.z],
        look_at: [-center.x, center.y, center.z],
        fov,
    }
}
