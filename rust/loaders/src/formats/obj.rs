// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ parser using nom
//!
//! Supports `v`, `vn`, `f` (all four index forms, negative indices,
//! polygons fanned into triangles) and the inline material statements
//! (`newmtl`, `Kd`, `d`, `usemtl`) that EDA exporters embed in the OBJ
//! body instead of a separate `.mtl` file.

use crate::error::{LoadError, Result};
use nom::{
    character::complete::{char, i64 as integer, space0, space1},
    combinator::{all_consuming, opt},
    multi::{many1, separated_list1},
    number::complete::double,
    sequence::{preceded, terminated, tuple},
    IResult,
};
use pcb_scene_geometry::{Color, Mesh, Point3, Triangle, Vector3};
use rustc_hash::FxHashMap;

/// One `v/vt/vn` reference, 1-based or negative
#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceVertex {
    position: i64,
    normal: Option<i64>,
}

/// Whitespace-separated floats
fn floats(input: &str) -> IResult<&str, Vec<f64>> {
    all_consuming(terminated(
        separated_list1(space1, double),
        space0,
    ))(input.trim_start())
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`
fn face_vertex(input: &str) -> IResult<&str, FaceVertex> {
    let (rest, (position, tail)) = tuple((
        integer,
        opt(preceded(
            char('/'),
            tuple((opt(integer), opt(preceded(char('/'), opt(integer))))),
        )),
    ))(input)?;

    let normal = tail.and_then(|(_texture, normal)| normal.flatten());
    Ok((rest, FaceVertex { position, normal }))
}

fn face(input: &str) -> IResult<&str, Vec<FaceVertex>> {
    all_consuming(terminated(many1(preceded(space0, face_vertex)), space0))(input)
}

/// Resolve a 1-based or negative (relative to the end) OBJ index
fn resolve_index(index: i64, len: usize, line: usize) -> Result<usize> {
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => len as i64 + i,
        _ => -1,
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(LoadError::parse(
            "OBJ",
            format!("line {}: index {} out of range for {} entries", line, index, len),
        ));
    }
    Ok(resolved as usize)
}

#[derive(Debug)]
struct MaterialState {
    diffuse: Option<[f64; 3]>,
    alpha: f64,
}

impl MaterialState {
    fn new() -> Self {
        Self { diffuse: None, alpha: 1.0 }
    }

    fn color(&self) -> Option<Color> {
        self.diffuse
            .map(|[r, g, b]| Color::rgba(r as f32, g as f32, b as f32, self.alpha as f32))
    }
}

fn parse_error(line: usize, what: &str, text: &str) -> LoadError {
    LoadError::parse("OBJ", format!("line {}: malformed {} {:?}", line, what, text))
}

/// Parse an OBJ document
pub fn parse_obj(bytes: &[u8]) -> Result<Mesh> {
    let text = String::from_utf8_lossy(bytes);

    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut normals: Vec<Vector3<f64>> = Vec::new();
    let mut materials: FxHashMap<String, MaterialState> = FxHashMap::default();
    let mut defining: Option<String> = None;
    let mut current_color: Option<Color> = None;
    let mut mesh = Mesh::new();

    for (number, raw) in text.lines().enumerate() {
        let line = number + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let (keyword, rest) = content
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((content, ""));
        let rest = rest.trim();

        match keyword {
            "v" => {
                let (_, values) = floats(rest).map_err(|_| parse_error(line, "vertex", rest))?;
                if values.len() < 3 {
                    return Err(parse_error(line, "vertex", rest));
                }
                positions.push(Point3::new(values[0], values[1], values[2]));
            }
            "vn" => {
                let (_, values) = floats(rest).map_err(|_| parse_error(line, "normal", rest))?;
                if values.len() < 3 {
                    return Err(parse_error(line, "normal", rest));
                }
                normals.push(Vector3::new(values[0], values[1], values[2]));
            }
            "f" => {
                let (_, refs) = face(rest).map_err(|_| parse_error(line, "face", rest))?;
                if refs.len() < 3 {
                    return Err(parse_error(line, "face", rest));
                }
                let mut corners = Vec::with_capacity(refs.len());
                for r in &refs {
                    let position = positions[resolve_index(r.position, positions.len(), line)?];
                    let normal = match r.normal {
                        Some(n) => Some(normals[resolve_index(n, normals.len(), line)?]),
                        None => None,
                    };
                    corners.push((position, normal));
                }
                push_fan(&mut mesh, &corners, current_color);
            }
            "newmtl" => {
                materials.insert(rest.to_string(), MaterialState::new());
                defining = Some(rest.to_string());
            }
            "Kd" | "d" | "Tr" => {
                let Some(state) = defining.as_ref().and_then(|name| materials.get_mut(name)) else {
                    continue;
                };
                let (_, values) = floats(rest).map_err(|_| parse_error(line, keyword, rest))?;
                match (keyword, values.as_slice()) {
                    ("Kd", [r, g, b, ..]) => state.diffuse = Some([*r, *g, *b]),
                    ("d", [alpha, ..]) => state.alpha = *alpha,
                    ("Tr", [transparency, ..]) => state.alpha = 1.0 - *transparency,
                    _ => return Err(parse_error(line, keyword, rest)),
                }
            }
            "usemtl" => {
                current_color = materials.get(rest).and_then(MaterialState::color);
                if current_color.is_none() {
                    tracing::trace!(material = rest, "Unknown or colorless OBJ material");
                }
            }
            // Texture coordinates, groups, smoothing, external libraries
            _ => {}
        }
    }

    mesh.assign_color_materials();
    tracing::trace!(
        triangles = mesh.triangle_count(),
        materials = mesh.materials.as_ref().map_or(0, Vec::len),
        "Parsed OBJ"
    );
    Ok(mesh)
}

/// Fan-triangulate one face
fn push_fan(mesh: &mut Mesh, corners: &[(Point3<f64>, Option<Vector3<f64>>)], color: Option<Color>) {
    let (p0, n0) = corners[0];
    for pair in corners[1..].windows(2) {
        let [(p1, n1), (p2, n2)] = [pair[0], pair[1]];
        let geometric = Triangle::new(p0, p1, p2);
        if geometric.area() <= 0.0 {
            continue;
        }

        // Vertex normals only orient the face; flat shading keeps the winding normal
        let mut triangle = geometric;
        if let (Some(a), Some(b), Some(c)) = (n0, n1, n2) {
            if (a + b + c).dot(&triangle.normal) < 0.0 {
                triangle.flip();
            }
        }
        mesh.push(triangle.with_color(color));
    }
}
