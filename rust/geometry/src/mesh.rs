// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures
//!
//! The canonical mesh is a flat triangle list. Each triangle carries its own
//! normal and optional color so loaders for very different formats can all
//! emit the same shape, and consumers can group triangles by appearance.

use nalgebra::{Matrix3, Point3, Vector3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Linear RGBA color, components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build from 8-bit channels and a fractional alpha
    #[inline]
    pub fn from_rgb8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a,
        }
    }

    /// Bit pattern used to group identical colors
    #[inline]
    pub fn key(&self) -> [u32; 4] {
        [
            self.r.to_bits(),
            self.g.to_bits(),
            self.b.to_bits(),
            self.a.to_bits(),
        ]
    }
}

/// One entry of a mesh material table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub color: Color,
}

/// Triangle with its face normal and optional appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [Point3<f64>; 3],
    pub normal: Vector3<f64>,
    pub color: Option<Color>,
    pub material_index: Option<usize>,
}

impl Triangle {
    /// Create a triangle, computing its normal from the winding
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        let normal = face_normal(&v0, &v1, &v2);
        Self {
            vertices: [v0, v1, v2],
            normal,
            color: None,
            material_index: None,
        }
    }

    /// Create a triangle with a supplied normal
    pub fn with_normal(vertices: [Point3<f64>; 3], normal: Vector3<f64>) -> Self {
        Self {
            vertices,
            normal,
            color: None,
            material_index: None,
        }
    }

    pub fn with_color(mut self, color: Option<Color>) -> Self {
        self.color = color;
        self
    }

    /// Normal implied by the vertex winding
    #[inline]
    pub fn face_normal(&self) -> Vector3<f64> {
        face_normal(&self.vertices[0], &self.vertices[1], &self.vertices[2])
    }

    #[inline]
    pub fn area(&self) -> f64 {
        let [v0, v1, v2] = &self.vertices;
        (v1 - v0).cross(&(v2 - v0)).norm() * 0.5
    }

    /// Reverse the winding (and the normal)
    #[inline]
    pub fn flip(&mut self) {
        self.vertices.swap(1, 2);
        self.normal = -self.normal;
    }
}

/// Cross product normal of two triangle edges; zero for degenerate triangles
#[inline]
pub fn face_normal(v0: &Point3<f64>, v1: &Point3<f64>, v2: &Point3<f64>) -> Vector3<f64> {
    (v1 - v0)
        .cross(&(v2 - v0))
        .try_normalize(1e-12)
        .unwrap_or_else(Vector3::zeros)
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Inverted box that any point will expand
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.extend(p);
        }
        bbox
    }

    #[inline]
    pub fn extend(&mut self, p: &Point3<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Extents along each axis; non-finite for an empty box
    #[inline]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        let size = self.size();
        size.x.is_finite() && size.y.is_finite() && size.z.is_finite()
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Triangle mesh in canonical scene space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
    pub bounding_box: BoundingBox,
    /// Present when triangles are tagged with material indices
    pub materials: Option<Vec<Material>>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
            bounding_box: BoundingBox::empty(),
            materials: None,
        }
    }

    pub fn with_capacity(triangle_count: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(triangle_count),
            bounding_box: BoundingBox::empty(),
            materials: None,
        }
    }

    /// Build a mesh and its bounding box from triangles
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let mut mesh = Self {
            triangles,
            bounding_box: BoundingBox::empty(),
            materials: None,
        };
        mesh.recompute_bounds();
        mesh
    }

    /// Add a triangle
    #[inline]
    pub fn push(&mut self, triangle: Triangle) {
        for v in &triangle.vertices {
            self.bounding_box.extend(v);
        }
        self.triangles.push(triangle);
    }

    /// Merge another mesh into this one (material tables are not merged)
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }
        self.triangles.reserve(other.triangles.len());
        for triangle in &other.triangles {
            self.push(Triangle {
                material_index: None,
                ..triangle.clone()
            });
        }
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn recompute_bounds(&mut self) {
        self.bounding_box =
            BoundingBox::from_points(self.triangles.iter().flat_map(|t| t.vertices.iter()));
    }

    /// Whether any triangle carries a color
    pub fn has_colors(&self) -> bool {
        self.triangles.iter().any(|t| t.color.is_some())
    }

    /// Tag triangles with one material per distinct color.
    ///
    /// Uncolored triangles keep `material_index = None`. No-op when no
    /// triangle is colored.
    pub fn assign_color_materials(&mut self) {
        if !self.has_colors() {
            return;
        }

        let mut materials: Vec<Material> = Vec::new();
        let mut by_color: FxHashMap<[u32; 4], usize> = FxHashMap::default();

        for triangle in &mut self.triangles {
            let Some(color) = triangle.color else {
                triangle.material_index = None;
                continue;
            };
            let index = *by_color.entry(color.key()).or_insert_with(|| {
                materials.push(Material {
                    name: format!("material_{}", materials.len()),
                    color,
                });
                materials.len() - 1
            });
            triangle.material_index = Some(index);
        }

        self.materials = Some(materials);
    }

    /// Copy of the mesh uniformly scaled about the origin
    pub fn scaled(&self, factor: f64) -> Mesh {
        let mut mesh = self.clone();
        for triangle in &mut mesh.triangles {
            for v in &mut triangle.vertices {
                *v = Point3::from(v.coords * factor);
            }
            if factor < 0.0 {
                triangle.flip();
            }
        }
        mesh.recompute_bounds();
        mesh
    }

    /// Copy of the mesh with a linear map applied to every vertex.
    ///
    /// Normals are mapped by the inverse transpose. A map with a negative
    /// determinant mirrors the mesh, so windings are reversed to keep faces
    /// pointing outward.
    pub fn transformed(&self, matrix: &Matrix3<f64>) -> Mesh {
        let normal_matrix = matrix
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(*matrix);
        let mirrored = matrix.determinant() < 0.0;

        let mut mesh = Mesh::with_capacity(self.triangles.len());
        mesh.materials = self.materials.clone();

        for triangle in &self.triangles {
            let [v0, v1, v2] = triangle.vertices.map(|v| Point3::from(matrix * v.coords));
            let normal = (normal_matrix * triangle.normal)
                .try_normalize(1e-12)
                .unwrap_or_else(Vector3::zeros);
            let vertices = if mirrored { [v0, v2, v1] } else { [v0, v1, v2] };
            mesh.push(Triangle {
                vertices,
                normal,
                color: triangle.color,
                material_index: triangle.material_index,
            });
        }

        mesh
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
