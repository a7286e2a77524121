// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP through an external CAD kernel
//!
//! STEP is tessellated by an OpenCascade-based kernel. In native builds the
//! kernel is linked in; in the browser it is instantiated from a WASM
//! binary. Either way it returns flat position/normal/index buffers per
//! mesh, with optional per-mesh and per-face-range colors.

use crate::error::{LoadError, Result};
use async_trait::async_trait;
use pcb_scene_geometry::{Color, Mesh, Point3, Triangle, Vector3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where the kernel comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KernelRuntime {
    /// Linked kernel, no binary to fetch
    #[default]
    Native,
    /// WASM kernel fetched from a page origin, a project or a CDN
    Browser { origin: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearUnit {
    #[default]
    Millimeter,
    Centimeter,
    Meter,
    Inch,
    Foot,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepImportParams {
    pub linear_unit: LinearUnit,
}

impl StepImportParams {
    pub fn millimeters() -> Self {
        Self {
            linear_unit: LinearUnit::Millimeter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KernelArray<T> {
    pub array: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KernelAttributes {
    pub position: KernelArray<f32>,
    #[serde(default)]
    pub normal: Option<KernelArray<f32>>,
}

/// Inclusive triangle range of one B-rep face
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrepFace {
    pub first: usize,
    pub last: usize,
    #[serde(default)]
    pub color: Option<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KernelMesh {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<[f32; 3]>,
    #[serde(default)]
    pub brep_faces: Vec<BrepFace>,
    pub attributes: KernelAttributes,
    pub index: KernelArray<u32>,
}

impl KernelMesh {
    /// Color of the first colored face range holding the triangle, else the mesh color
    fn triangle_color(&self, triangle: usize) -> Option<Color> {
        self.brep_faces
            .iter()
            .filter(|face| face.first <= triangle && triangle <= face.last)
            .find_map(|face| face.color)
            .or(self.color)
            .map(|[r, g, b]| Color::rgb(r, g, b))
    }
}

/// Kernel output for one STEP file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StepImportResult {
    pub success: bool,
    #[serde(default)]
    pub meshes: Vec<KernelMesh>,
}

impl StepImportResult {
    /// Parse the kernel's JSON result
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LoadError::parse("STEP", e))
    }
}

/// An initialized CAD kernel
pub trait StepKernel: Send + Sync {
    fn read_step(&self, data: &[u8], params: &StepImportParams) -> Result<StepImportResult>;
}

/// Creates kernels, from a WASM binary in browser runtimes
#[async_trait]
pub trait StepKernelFactory: Send + Sync {
    async fn instantiate(&self, wasm_binary: Option<Vec<u8>>) -> Result<Arc<dyn StepKernel>>;
}

fn vec3(values: &[f32], i: usize) -> Option<[f64; 3]> {
    let chunk = values.get(i * 3..i * 3 + 3)?;
    Some([chunk[0] as f64, chunk[1] as f64, chunk[2] as f64])
}

/// Rebuild kernel buffers into a mesh
pub fn step_result_to_mesh(result: &StepImportResult) -> Result<Mesh> {
    if !result.success {
        return Err(LoadError::parse("STEP", "kernel reported an unsuccessful import"));
    }

    let mut mesh = Mesh::new();
    for source in &result.meshes {
        let positions = &source.attributes.position.array;
        let normals = source.attributes.normal.as_ref().map(|n| n.array.as_slice());
        let out_of_range = |i: u32| {
            LoadError::parse(
                "STEP",
                format!("mesh {:?}: index {} out of range", source.name.as_deref().unwrap_or(""), i),
            )
        };

        for (t, tri) in source.index.array.chunks_exact(3).enumerate() {
            let mut corners = [Point3::origin(); 3];
            let mut normal_sum = Vector3::zeros();
            for (corner, &i) in corners.iter_mut().zip(tri) {
                let [x, y, z] = vec3(positions, i as usize).ok_or_else(|| out_of_range(i))?;
                *corner = Point3::new(x, y, z);
                if let Some([nx, ny, nz]) = normals.and_then(|n| vec3(n, i as usize)) {
                    normal_sum += Vector3::new(nx, ny, nz);
                }
            }

            let triangle = match normal_sum.try_normalize(1e-9) {
                Some(n) => Triangle::with_normal(corners, n),
                None => Triangle::new(corners[0], corners[1], corners[2]),
            };
            mesh.push(triangle.with_color(source.triangle_color(t)));
        }
    }

    mesh.assign_color_materials();
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RESULT: &str = r#"{
        "success": true,
        "meshes": [{
            "name": "body",
            "color": [0.1, 0.1, 0.1],
            "brep_faces": [{"first": 1, "last": 1, "color": [0.9, 0.8, 0.2]}],
            "attributes": {"position": {"array": [0,0,0, 1,0,0, 0,1,0, 0,0,1]}},
            "index": {"array": [0,1,2, 0,2,3]}
        }]
    }"#;

    #[test]
    fn test_face_colors_and_materials() {
        let result = StepImportResult::from_json(RESULT).unwrap();
        let mesh = step_result_to_mesh(&result).unwrap();

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangles[0].color, Some(Color::rgb(0.1, 0.1, 0.1)));
        assert_eq!(mesh.triangles[1].color, Some(Color::rgb(0.9, 0.8, 0.2)));
        assert_eq!(mesh.materials.as_ref().unwrap().len(), 2);
        assert_eq!(mesh.triangles[1].material_index, Some(1));
    }

    #[test]
    fn test_colorless_face_range_does_not_hide_a_colored_one() {
        let result = StepImportResult::from_json(
            r#"{
                "success": true,
                "meshes": [{
                    "brep_faces": [{"first": 0, "last": 1}, {"first": 1, "last": 1, "color": [0.2, 0.4, 0.6]}],
                    "attributes": {"position": {"array": [0,0,0, 1,0,0, 0,1,0, 0,0,1]}},
                    "index": {"array": [0,1,2, 0,2,3]}
                }]
            }"#,
        )
        .unwrap();
        let mesh = step_result_to_mesh(&result).unwrap();

        assert_eq!(mesh.triangles[0].color, None);
        assert_eq!(mesh.triangles[1].color, Some(Color::rgb(0.2, 0.4, 0.6)));
    }

    #[test]
    fn test_missing_normals_use_cross_product() {
        let result = StepImportResult::from_json(RESULT).unwrap();
        let mesh = step_result_to_mesh(&result).unwrap();
        assert_relative_eq!(mesh.triangles[0].normal.z, 1.0);
    }

    #[test]
    fn test_failed_import_is_a_parse_error() {
        let result = StepImportResult::from_json(r#"{"success": false}"#).unwrap();
        assert!(matches!(
            step_result_to_mesh(&result),
            Err(LoadError::Parse { format: "STEP", .. })
        ));
    }

    #[test]
    fn test_bad_index_is_a_parse_error() {
        let result = StepImportResult::from_json(
            r#"{"success": true, "meshes": [{"attributes": {"position": {"array": [0,0,0]}}, "index": {"array": [0,1,2]}}]}"#,
        )
        .unwrap();
        assert!(step_result_to_mesh(&result).is_err());
    }
}
