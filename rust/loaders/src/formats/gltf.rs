// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GLB and glTF scenes
//!
//! The node hierarchy is flattened into one mesh with every node transform
//! applied. Base-color factors become triangle colors and a material table.
//! Buffers come from the GLB BIN chunk, `data:` URIs, or sibling files
//! fetched relative to the document URL.

use crate::error::{LoadError, Result};
use crate::fetch::{AuthHeaders, Fetcher};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nalgebra::Matrix4;
use pcb_scene_geometry::{Color, Mesh, Point3, Triangle};
use url::Url;

enum BufferSource {
    Bin,
    Data(Vec<u8>),
    External(String),
}

/// Decode a `data:` URI; `None` when `uri` is not one
fn decode_data_uri(uri: &str) -> Option<std::result::Result<Vec<u8>, String>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err("data URI without payload".to_string()));
    };
    Some(if header.ends_with(";base64") {
        STANDARD.decode(payload).map_err(|e| e.to_string())
    } else {
        Ok(payload.as_bytes().to_vec())
    })
}

fn format_name(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"glTF") {
        "GLB"
    } else {
        "glTF"
    }
}

/// Parse a GLB or glTF document located at `base_url`
pub async fn parse_gltf(
    bytes: &[u8],
    base_url: &str,
    fetcher: &dyn Fetcher,
    headers: &AuthHeaders,
) -> Result<Mesh> {
    let format = format_name(bytes);
    let ::gltf::Gltf { document, blob } =
        ::gltf::Gltf::from_slice(bytes).map_err(|e| LoadError::parse(format, e))?;

    let sources = document
        .buffers()
        .map(|buffer| match buffer.source() {
            ::gltf::buffer::Source::Bin => Ok(BufferSource::Bin),
            ::gltf::buffer::Source::Uri(uri) => match decode_data_uri(uri) {
                Some(decoded) => decoded
                    .map(BufferSource::Data)
                    .map_err(|e| LoadError::parse(format, e)),
                None => Ok(BufferSource::External(uri.to_string())),
            },
        })
        .collect::<Result<Vec<_>>>()?;

    let mut buffers = Vec::with_capacity(sources.len());
    for source in sources {
        let data = match source {
            BufferSource::Bin => blob
                .clone()
                .ok_or_else(|| LoadError::parse(format, "buffer refers to a missing BIN chunk"))?,
            BufferSource::Data(data) => data,
            BufferSource::External(uri) => {
                let url = Url::parse(base_url)
                    .and_then(|base| base.join(&uri))
                    .map_err(|e| LoadError::fetch(&uri, format!("cannot resolve against {base_url}: {e}")))?;
                fetcher.fetch(url.as_str(), headers).await?
            }
        };
        buffers.push(data);
    }

    let mut mesh = Mesh::new();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                visit_node(&node, &Matrix4::identity(), &buffers, &mut mesh, format)?;
            }
        }
        None => {
            for source in document.meshes() {
                append_mesh(&source, &Matrix4::identity(), &buffers, &mut mesh, format)?;
            }
        }
    }

    mesh.assign_color_materials();
    tracing::trace!(format, triangles = mesh.triangle_count(), "Parsed scene document");
    Ok(mesh)
}

fn visit_node(
    node: &::gltf::Node<'_>,
    parent: &Matrix4<f64>,
    buffers: &[Vec<u8>],
    mesh: &mut Mesh,
    format: &'static str,
) -> Result<()> {
    let local: Matrix4<f64> = Matrix4::from(node.transform().matrix()).cast();
    let world = parent * local;

    if let Some(source) = node.mesh() {
        append_mesh(&source, &world, buffers, mesh, format)?;
    }
    for child in node.children() {
        visit_node(&child, &world, buffers, mesh, format)?;
    }
    Ok(())
}

fn append_mesh(
    source: &::gltf::Mesh<'_>,
    world: &Matrix4<f64>,
    buffers: &[Vec<u8>],
    mesh: &mut Mesh,
    format: &'static str,
) -> Result<()> {
    let mirrored = world.fixed_view::<3, 3>(0, 0).determinant() < 0.0;

    for primitive in source.primitives() {
        if primitive.mode() != ::gltf::mesh::Mode::Triangles {
            tracing::trace!(mode = ?primitive.mode(), "Skipping non-triangle primitive");
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
        let positions: Vec<Point3<f64>> = reader
            .read_positions()
            .ok_or_else(|| LoadError::parse(format, "primitive without POSITION"))?
            .map(|[x, y, z]| world.transform_point(&Point3::new(x as f64, y as f64, z as f64)))
            .collect();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let material = primitive.material();
        let color = material.index().map(|_| {
            let [r, g, b, a] = material.pbr_metallic_roughness().base_color_factor();
            Color::rgba(r, g, b, a)
        });

        let vertex = |i: u32| {
            positions
                .get(i as usize)
                .copied()
                .ok_or_else(|| LoadError::parse(format, format!("index {} out of range", i)))
        };
        for tri in indices.chunks_exact(3) {
            let (v0, v1, v2) = (vertex(tri[0])?, vertex(tri[1])?, vertex(tri[2])?);
            let triangle = if mirrored {
                Triangle::new(v0, v2, v1)
            } else {
                Triangle::new(v0, v1, v2)
            };
            mesh.push(triangle.with_color(color));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn triangle_bytes() -> Vec<u8> {
        [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    fn document(buffer: &str) -> String {
        format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [{{"children": [1], "translation": [10, 0, 0]}}, {{"mesh": 0, "scale": [2, 2, 2]}}],
  "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "material": 0}}]}}],
  "materials": [{{"pbrMetallicRoughness": {{"baseColorFactor": [1, 0, 0, 1]}}}}],
  "buffers": [{{"byteLength": 36{buffer}}}],
  "bufferViews": [{{"buffer": 0, "byteLength": 36}}],
  "accessors": [{{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0]}}]
}}"#
        )
    }

    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(bin);
        out
    }

    struct SiblingFetcher {
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for SiblingFetcher {
        async fn fetch(&self, url: &str, _headers: &AuthHeaders) -> Result<Vec<u8>> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(triangle_bytes())
        }
    }

    fn no_fetch() -> SiblingFetcher {
        SiblingFetcher {
            requested: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_glb_with_node_transforms_and_color() {
        let bytes = glb(&document(""), &triangle_bytes());
        let fetcher = no_fetch();
        let mesh = parse_gltf(&bytes, "https://x/a.glb", &fetcher, &AuthHeaders::new())
            .await
            .unwrap();

        assert_eq!(mesh.triangle_count(), 1);
        // Child scale then parent translation
        assert_relative_eq!(mesh.bounding_box.min.x, 10.0);
        assert_relative_eq!(mesh.bounding_box.max.x, 12.0);
        assert_eq!(mesh.materials.as_ref().unwrap().len(), 1);
        assert_eq!(mesh.triangles[0].color, Some(Color::rgba(1.0, 0.0, 0.0, 1.0)));
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gltf_with_data_uri() {
        let uri = format!(r#", "uri": "data:application/octet-stream;base64,{}""#, STANDARD.encode(triangle_bytes()));
        let json = document(&uri);
        let mesh = parse_gltf(json.as_bytes(), "https://x/a.gltf", &no_fetch(), &AuthHeaders::new())
            .await
            .unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[tokio::test]
    async fn test_gltf_fetches_sibling_buffers() {
        let json = document(r#", "uri": "buffers/part.bin""#);
        let fetcher = no_fetch();
        let mesh = parse_gltf(json.as_bytes(), "https://x/models/a.gltf", &fetcher, &AuthHeaders::new())
            .await
            .unwrap();

        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(
            *fetcher.requested.lock().unwrap(),
            vec!["https://x/models/buffers/part.bin".to_string()]
        );
    }

    #[tokio::test]
    async fn test_garbage_is_a_parse_error() {
        let err = parse_gltf(b"glTF\x02\0\0\0garbage", "https://x/a.glb", &no_fetch(), &AuthHeaders::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { format: "GLB", .. }));
    }
}
