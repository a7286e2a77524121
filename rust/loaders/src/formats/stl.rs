// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STL (ASCII and binary) via stl_io

use crate::error::{LoadError, Result};
use pcb_scene_geometry::{Mesh, Point3, Triangle, Vector3};
use std::io::Cursor;

/// Parse an ASCII or binary STL
pub fn parse_stl(bytes: &[u8]) -> Result<Mesh> {
    let mut cursor = Cursor::new(bytes);
    let reader = stl_io::create_stl_reader(&mut cursor).map_err(|e| LoadError::parse("STL", e))?;

    let mut mesh = Mesh::new();
    for facet in reader {
        let facet = facet.map_err(|e| LoadError::parse("STL", e))?;
        let [v0, v1, v2] = facet
            .vertices
            .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64));

        // Stored normals are often zeroed or stale; trust the winding then
        let stored = Vector3::new(facet.normal[0] as f64, facet.normal[1] as f64, facet.normal[2] as f64);
        let triangle = Triangle::new(v0, v1, v2);
        let normal = match stored.try_normalize(1e-9) {
            Some(n) if n.dot(&triangle.normal) > 0.0 => n,
            _ => triangle.normal,
        };
        mesh.push(Triangle::with_normal([v0, v1, v2], normal));
    }

    tracing::trace!(triangles = mesh.triangle_count(), "Parsed STL");
    Ok(mesh)
}
