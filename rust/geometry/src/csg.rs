// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSG (Constructive Solid Geometry) Operations
//!
//! Boolean union/difference through csgrs. Unions of many solids are done
//! in bounded batches: BSP-tree booleans recurse and allocate in proportion
//! to the operand size, so folding hundreds of drill holes into one operand
//! at once is not an option.

use crate::error::{Error, Result};
use crate::mesh::{Mesh, Triangle};
use crate::triangulation::{calculate_polygon_normal, project_to_2d, triangulate_polygon};
use csgrs::mesh::{polygon::Polygon, vertex::Vertex, Mesh as CsgMesh};
use csgrs::traits::CSG;
use nalgebra::{Point3, Vector3};

/// Solids combined per union step
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Batched boolean processor
#[derive(Debug, Clone, Copy)]
pub struct BooleanProcessor {
    batch_size: usize,
}

impl BooleanProcessor {
    /// Create a processor with the default batch size
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Batches smaller than 2 could never shrink the operand list
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(2),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Union every solid into one.
    ///
    /// Solids are unioned in batches of `batch_size`; the batch results are
    /// unioned again in batches until a single solid remains.
    pub fn union_all(&self, solids: Vec<CsgMesh<()>>) -> Result<CsgMesh<()>> {
        if solids.is_empty() {
            return Err(Error::EmptyBooleanInput("union".to_string()));
        }

        let mut level = solids;
        let mut passes = 0usize;
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(self.batch_size));
            let mut remaining = level.into_iter();
            loop {
                let batch: Vec<CsgMesh<()>> = remaining.by_ref().take(self.batch_size).collect();
                if batch.is_empty() {
                    break;
                }
                next.push(union_batch(batch));
            }
            level = next;
            passes += 1;
        }

        tracing::trace!(passes, batch_size = self.batch_size, "Batched union complete");

        level
            .pop()
            .ok_or_else(|| Error::EmptyBooleanInput("union".to_string()))
    }

    /// Subtract every cutter from `host` with a single difference
    pub fn subtract_all(&self, host: &Mesh, cutters: &[Mesh]) -> Result<Mesh> {
        if cutters.is_empty() {
            return Err(Error::EmptyBooleanInput("difference".to_string()));
        }

        let cutter = self.union_all(cutters.iter().map(to_csg).collect())?;
        let result = to_csg(host).difference(&cutter);
        Ok(from_csg(&result))
    }
}

impl Default for BooleanProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn union_batch(batch: Vec<CsgMesh<()>>) -> CsgMesh<()> {
    let mut iter = batch.into_iter();
    // Batches are never empty
    let first = iter.next().unwrap_or_else(|| CsgMesh::from_polygons(&[], None));
    iter.fold(first, |acc, solid| acc.union(&solid))
}

/// Convert our Mesh format to csgrs Mesh format
pub fn to_csg(mesh: &Mesh) -> CsgMesh<()> {
    let polygons: Vec<Polygon<()>> = mesh
        .triangles
        .iter()
        .filter_map(|triangle| {
            // Skip degenerate triangles to avoid NaN propagation
            let normal = triangle.face_normal().try_normalize(1e-10)?;
            let vertices = triangle
                .vertices
                .iter()
                .map(|v| Vertex::new(*v, normal))
                .collect();
            Some(Polygon::new(vertices, None))
        })
        .collect();

    CsgMesh::from_polygons(&polygons, None)
}

/// Convert csgrs Mesh format back to our Mesh format
pub fn from_csg(csg_mesh: &CsgMesh<()>) -> Mesh {
    let mut mesh = Mesh::new();

    for polygon in &csg_mesh.polygons {
        let vertices = &polygon.vertices;
        if vertices.len() < 3 {
            continue;
        }

        let points: Vec<Point3<f64>> = vertices
            .iter()
            .map(|v| Point3::new(v.pos[0], v.pos[1], v.pos[2]))
            .collect();

        let raw_normal = Vector3::new(vertices[0].normal[0], vertices[0].normal[1], vertices[0].normal[2]);
        let normal = match raw_normal.try_normalize(1e-10) {
            Some(n) if n.iter().all(|c| c.is_finite()) => n,
            _ => match calculate_polygon_normal(&points).try_normalize(1e-10) {
                Some(n) => n,
                None => continue,
            },
        };

        if points.len() == 3 {
            push_oriented(&mut mesh, [points[0], points[1], points[2]], normal);
            continue;
        }

        let projected = project_to_2d(&points, &normal);
        let Ok(indices) = triangulate_polygon(&projected) else {
            continue;
        };
        for tri in indices.chunks_exact(3) {
            push_oriented(&mut mesh, [points[tri[0]], points[tri[1]], points[tri[2]]], normal);
        }
    }

    mesh
}

/// Push a triangle whose winding agrees with the polygon normal
fn push_oriented(mesh: &mut Mesh, mut vertices: [Point3<f64>; 3], normal: Vector3<f64>) {
    let mut triangle = Triangle::with_normal(vertices, normal);
    let winding = triangle.face_normal();
    if winding.norm_squared() == 0.0 {
        return;
    }
    if winding.dot(&normal) < 0.0 {
        vertices.swap(1, 2);
        triangle.vertices = vertices;
    }
    mesh.push(triangle);
}
