// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - converting 2D outlines to prisms
//!
//! Prisms are built in circuit space (Z-up), between two Z levels.

use crate::error::{Error, Result};
use crate::mesh::{Mesh, Triangle};
use crate::triangulation::{normalize_ring, triangulate_polygon};
use nalgebra::{Point2, Point3, Vector3};
use std::f64::consts::PI;

/// Segments used to approximate full circles
pub const CIRCLE_SEGMENTS: usize = 32;

/// Extrude a closed 2D outline between `z_min` and `z_max`
pub fn extrude_polygon(outline: &[Point2<f64>], z_min: f64, z_max: f64) -> Result<Mesh> {
    if !(z_max > z_min) {
        return Err(Error::InvalidExtrusion(format!(
            "Extrusion range must be positive, got {}..{}",
            z_min, z_max
        )));
    }

    let ring = normalize_ring(outline);
    if ring.len() < 3 {
        return Err(Error::InvalidProfile(format!(
            "Outline needs at least 3 distinct points, got {}",
            ring.len()
        )));
    }

    let indices = triangulate_polygon(&ring)?;
    let mut mesh = Mesh::with_capacity(indices.len() / 3 * 2 + ring.len() * 2);

    let at = |p: &Point2<f64>, z: f64| Point3::new(p.x, p.y, z);

    // Caps: ring is counter-clockwise, so the top keeps the earcut winding
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (&ring[tri[0]], &ring[tri[1]], &ring[tri[2]]);
        let mut top = Triangle::with_normal([at(a, z_max), at(b, z_max), at(c, z_max)], Vector3::z());
        if top.face_normal().z < 0.0 {
            top.vertices.swap(1, 2);
        }
        let mut bottom = Triangle::with_normal(
            [top.vertices[0], top.vertices[2], top.vertices[1]],
            -Vector3::z(),
        );
        for v in &mut bottom.vertices {
            v.z = z_min;
        }
        mesh.push(top);
        mesh.push(bottom);
    }

    // Side walls, outward normal of a counter-clockwise edge is (dy, -dx)
    let n = ring.len();
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        let edge = b - a;
        let Some(outward) = Vector3::new(edge.y, -edge.x, 0.0).try_normalize(1e-12) else {
            continue;
        };
        let (a0, b0, b1, a1) = (at(a, z_min), at(b, z_min), at(b, z_max), at(a, z_max));
        mesh.push(Triangle::with_normal([a0, b0, b1], outward));
        mesh.push(Triangle::with_normal([a0, b1, a1], outward));
    }

    Ok(mesh)
}

/// Points of a regular polygon approximating a circle
pub fn circle_points(center: Point2<f64>, radius: f64, segments: usize) -> Vec<Point2<f64>> {
    let segments = segments.max(3);
    (0..segments)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / segments as f64;
            Point2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

/// Points of a stadium (pill): a rectangle with semicircular ends on its long axis
pub fn stadium_points(center: Point2<f64>, width: f64, height: f64, segments: usize) -> Vec<Point2<f64>> {
    if (width - height).abs() < 1e-9 {
        return circle_points(center, width / 2.0, segments);
    }

    let half_segments = (segments / 2).max(2);
    let horizontal = width > height;
    let radius = width.min(height) / 2.0;
    let offset = (width.max(height) - width.min(height)) / 2.0;

    // Cap centers along the long axis, each cap sweeping 180 degrees
    let (cap_a, start_a, cap_b, start_b) = if horizontal {
        (
            Point2::new(center.x + offset, center.y),
            -PI / 2.0,
            Point2::new(center.x - offset, center.y),
            PI / 2.0,
        )
    } else {
        (
            Point2::new(center.x, center.y + offset),
            0.0,
            Point2::new(center.x, center.y - offset),
            PI,
        )
    };

    let mut points = Vec::with_capacity((half_segments + 1) * 2);
    for (cap, start) in [(cap_a, start_a), (cap_b, start_b)] {
        for i in 0..=half_segments {
            let angle = start + PI * i as f64 / half_segments as f64;
            points.push(Point2::new(cap.x + radius * angle.cos(), cap.y + radius * angle.sin()));
        }
    }
    points
}

/// Corners of a rectangle rotated counter-clockwise by `rotation_deg` about its center
pub fn rect_points(center: Point2<f64>, width: f64, height: f64, rotation_deg: f64) -> Vec<Point2<f64>> {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let (sin, cos) = rotation_deg.to_radians().sin_cos();
    [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
        .iter()
        .map(|&(x, y)| Point2::new(center.x + x * cos - y * sin, center.y + x * sin + y * cos))
        .collect()
}
