// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene composition
//!
//! One conversion resolves the records, builds at most one surface (panel,
//! else board, else an optional faux board), places every CAD component in
//! input order, adds bounding boxes for the components left without a 3D
//! representation, and finishes with a default camera and fixed lights.

use crate::error::{Result, SceneError};
use crate::options::ConversionOptions;
use crate::texture::{BoardTextureRenderer, TextureTarget};
use crate::types::{Box3D, BoxTextures, Camera, Light, Scene3D};
use nalgebra::Vector3;
use pcb_scene_core::{
    CadComponent, CircuitEntities, CircuitRecord, GeometrySource, Layer, PcbComponent, Point, SourceKind, Vec3,
};
use pcb_scene_geometry::{
    build_board_solid, build_panel_solid, build_solid, Color, Mesh, Outline, SurfaceSolid,
};
use pcb_scene_loaders::{scaled_copy, LoadRequest, ModelLoaders};
use rustc_hash::FxHashSet;
use std::f64::consts::PI;
use std::sync::Arc;

/// Margin added on every side of the faux board
pub const FAUX_BOARD_MARGIN: f64 = 2.0;
/// Smallest faux board, and its size when there are no components
pub const FAUX_BOARD_MIN_SIZE: f64 = 10.0;

pub const UNNAMED_LABEL: &str = "<unnamed>";

pub const CAMERA_FOV_DEGREES: f64 = 45.0;
pub const CAMERA_NEAR: f64 = 0.1;
/// Camera offset from the target per unit of viewing distance
pub const CAMERA_OFFSET: [f64; 3] = [0.5, 1.0, 0.5];
pub const FALLBACK_CAMERA_POSITION: [f64; 3] = [30.0, 30.0, 30.0];
pub const FALLBACK_CAMERA_FAR: f64 = 1000.0;

pub const AMBIENT_INTENSITY: f64 = 0.6;
pub const DIRECTIONAL_INTENSITY: f64 = 0.8;
pub const DIRECTIONAL_LIGHT_DIRECTION: [f64; 3] = [-1.0, -2.0, -1.0];

const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

/// Horizontal rectangle in scene space, used for camera placement
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    center_x: f64,
    center_z: f64,
    width: f64,
    depth: f64,
}

impl Frame {
    fn from_extent((min_x, min_z, max_x, max_z): (f64, f64, f64, f64)) -> Self {
        Self {
            center_x: (min_x + max_x) / 2.0,
            center_z: (min_z + max_z) / 2.0,
            width: max_x - min_x,
            depth: max_z - min_z,
        }
    }

    fn diagonal(&self) -> f64 {
        self.width.hypot(self.depth)
    }
}

/// Builds scenes from circuit records
pub struct SceneComposer {
    loaders: Arc<ModelLoaders>,
    textures: Option<Arc<dyn BoardTextureRenderer>>,
}

/// A composer over default loaders, without a footprint generator or a
/// STEP kernel; circuits needing either fail with `MissingCollaborator`
impl Default for SceneComposer {
    fn default() -> Self {
        Self::new(Arc::new(ModelLoaders::default()))
    }
}

impl SceneComposer {
    pub fn new(loaders: Arc<ModelLoaders>) -> Self {
        Self {
            loaders,
            textures: None,
        }
    }

    pub fn with_texture_renderer(mut self, renderer: Arc<dyn BoardTextureRenderer>) -> Self {
        self.textures = Some(renderer);
        self
    }

    /// The loader service, for cache control
    pub fn loaders(&self) -> &Arc<ModelLoaders> {
        &self.loaders
    }

    /// Parse a JSON record list and convert it
    pub async fn convert_json(&self, json: &str, options: &ConversionOptions) -> Result<Scene3D> {
        let records = CircuitRecord::parse_list(json)?;
        self.convert(&records, options).await
    }

    /// Convert circuit records into a scene
    pub async fn convert(&self, records: &[CircuitRecord], options: &ConversionOptions) -> Result<Scene3D> {
        let entities = CircuitEntities::resolve(records);
        let thickness = entities.effective_board_thickness(options.board_thickness);

        let mut boxes = Vec::new();
        let surface = self.surface(&entities, thickness, options).await?;
        let frame = surface.as_ref().map(|b| Frame::from_extent(b.footprint()));
        boxes.extend(surface);

        let represented = self.place_cad_components(&entities, thickness, options, &mut boxes).await?;

        if options.show_bounding_boxes {
            boxes.extend(
                entities
                    .pcb_components
                    .iter()
                    .filter(|c| !represented.contains(c.pcb_component_id.as_str()))
                    .map(|c| bounding_box(&entities, c, thickness, options)),
            );
        }

        let camera = default_camera(frame, &boxes);
        tracing::info!(
            primitives = boxes.len(),
            meshes = boxes.iter().filter(|b| b.has_mesh()).count(),
            "Composed scene"
        );

        Ok(Scene3D {
            boxes,
            camera,
            lights: default_lights(),
        })
    }

    /// The single rendering surface: panel, else board, else faux board
    async fn surface(
        &self,
        entities: &CircuitEntities,
        thickness: f64,
        options: &ConversionOptions,
    ) -> Result<Option<Box3D>> {
        if let Some(panel) = entities.panel() {
            if entities.board().is_some() {
                tracing::debug!(panel = %panel.pcb_panel_id, "Panel present, boards not rendered");
            }
            let solid = build_panel_solid(entities, panel, thickness)?;
            return Ok(Some(self.surface_box(entities, solid, panel.center, options).await));
        }

        if let Some(board) = entities.board() {
            let solid = build_board_solid(entities, board, thickness)?;
            return Ok(Some(self.surface_box(entities, solid, board.center, options).await));
        }

        if options.draw_faux_board {
            return Ok(Some(faux_board(entities, thickness, options)?));
        }

        Ok(None)
    }

    async fn surface_box(
        &self,
        entities: &CircuitEntities,
        solid: SurfaceSolid,
        center: Point,
        options: &ConversionOptions,
    ) -> Box3D {
        let (width, height) = solid.effective_size();
        let target = TextureTarget {
            center,
            width,
            height,
            resolution: options.texture_resolution,
            board_color: options.board_color,
            copper_color: options.copper_color,
        };

        let mut surface = Box3D::new([center.x, 0.0, center.y], [width, solid.thickness, height]);
        surface.mesh = Some(Arc::new(solid.mesh));
        surface.color = Some(options.board_color);
        if options.textures_enabled() {
            surface.textures = self.render_textures(entities, &target).await;
        }
        surface
    }

    async fn render_textures(&self, entities: &CircuitEntities, target: &TextureTarget) -> Option<BoxTextures> {
        let Some(renderer) = &self.textures else {
            tracing::warn!("Board textures requested but no texture renderer is configured");
            return None;
        };

        match renderer.render(entities, target).await {
            Ok(rendered) => Some(rendered.into_box_textures()).filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Texture rendering failed, using flat board color");
                None
            }
        }
    }

    /// Place every CAD component with a geometry source, in input order.
    ///
    /// Returns the ids of the PCB components that now have a 3D representation.
    async fn place_cad_components<'a>(
        &self,
        entities: &'a CircuitEntities,
        thickness: f64,
        options: &ConversionOptions,
        boxes: &mut Vec<Box3D>,
    ) -> Result<FxHashSet<&'a str>> {
        let mut represented = FxHashSet::default();

        for resolved in &entities.cad_components {
            let Some(source) = &resolved.source else {
                continue;
            };
            let cad = &resolved.cad;
            represented.insert(cad.pcb_component_id.as_str());

            let component = entities.pcb_component(&cad.pcb_component_id);
            let layer = cad.layer.or(component.map(|c| c.layer)).unwrap_or_default();

            let mut placed = Box3D::new(
                cad_center(cad, component, layer, thickness),
                cad_size(cad, component, options.default_component_height),
            );
            placed.rotation = cad_rotation(cad.rotation, source.kind(), layer);
            placed.is_translucent = cad.show_as_translucent_model.unwrap_or(false);
            placed.mesh = self.load_model(source, cad, options).await?;
            if placed.mesh.is_none() {
                placed.color = Some(options.component_color);
            }

            boxes.push(placed);
        }

        Ok(represented)
    }

    /// The component's mesh, or `None` when a degradable failure occurred
    async fn load_model(
        &self,
        source: &GeometrySource,
        cad: &CadComponent,
        options: &ConversionOptions,
    ) -> Result<Option<Arc<Mesh>>> {
        let kind = source.kind();
        let request = LoadRequest::for_source(source)
            .with_transform(options.coordinate_transform)
            .with_project_base_url(options.project_base_url.clone())
            .with_auth_headers(options.auth_headers.clone());

        match self.loaders.load(kind, &request).await {
            Ok(mesh) => Ok(Some(scaled_copy(&mesh, cad.model_unit_to_mm_scale_factor))),
            Err(e) => {
                let error = SceneError::from(e);
                if !error.is_degradable(kind) {
                    return Err(error);
                }
                tracing::warn!(
                    component = %cad.pcb_component_id,
                    format = kind.as_str(),
                    locator = %source.locator(),
                    error = %error,
                    "Model unavailable, rendering a plain box"
                );
                Ok(None)
            }
        }
    }
}

/// Circuit `(x, y, z)` to scene `(x, z, y)`
fn to_scene(v: Vec3) -> [f64; 3] {
    [v.x, v.z, v.y]
}

fn layer_sign(layer: Layer) -> f64 {
    match layer {
        Layer::Top => 1.0,
        Layer::Bottom => -1.0,
    }
}

fn cad_size(cad: &CadComponent, component: Option<&PcbComponent>, default_height: f64) -> [f64; 3] {
    if let Some(size) = cad.size {
        let factor = cad
            .model_unit_to_mm_scale_factor
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(1.0);
        let [x, y, z] = to_scene(size);
        return [x * factor, y * factor, z * factor];
    }

    match component {
        Some(c) => [c.width, default_height, c.height],
        None => [default_height; 3],
    }
}

fn cad_center(cad: &CadComponent, component: Option<&PcbComponent>, layer: Layer, thickness: f64) -> [f64; 3] {
    if let Some(position) = cad.position {
        return to_scene(position);
    }

    let center = component.map(|c| c.center).unwrap_or_default();
    [center.x, layer_sign(layer) * thickness / 2.0, center.y]
}

/// Explicit rotation wins; otherwise bottom-layer parts are flipped 180°
fn cad_rotation(explicit: Option<Vec3>, kind: SourceKind, layer: Layer) -> Option<[f64; 3]> {
    if let Some(degrees) = explicit {
        let (x, y, z) = (degrees.x.to_radians(), degrees.y.to_radians(), degrees.z.to_radians());
        // Scene interchange formats are Y-up, the circuit is Z-up
        return Some(if kind.is_scene_interchange() { [x, z, y] } else { [x, y, z] });
    }

    match (layer, kind) {
        (Layer::Top, _) => None,
        (Layer::Bottom, SourceKind::Glb | SourceKind::Gltf | SourceKind::Footprinter) => Some([0.0, 0.0, PI]),
        (Layer::Bottom, SourceKind::Stl | SourceKind::Obj | SourceKind::Step) => Some([PI, 0.0, 0.0]),
    }
}

/// Labeled placeholder for a component without a model
fn bounding_box(
    entities: &CircuitEntities,
    component: &PcbComponent,
    thickness: f64,
    options: &ConversionOptions,
) -> Box3D {
    let height = component
        .width
        .min(component.height)
        .min(options.default_component_height);
    let y = layer_sign(component.layer) * (thickness / 2.0 + height / 2.0);

    let mut placeholder = Box3D::new(
        [component.center.x, y, component.center.y],
        [component.width, height, component.height],
    );
    placeholder.color = Some(options.component_color);
    placeholder.label = Some(entities.source_name(component).unwrap_or(UNNAMED_LABEL).to_string());
    placeholder
}

/// Board covering every component plus a margin, at least 10×10
fn faux_board(entities: &CircuitEntities, thickness: f64, options: &ConversionOptions) -> Result<Box3D> {
    let extent = entities.pcb_components.iter().fold(None, |acc: Option<(f64, f64, f64, f64)>, c| {
        let (hw, hh) = (c.width / 2.0, c.height / 2.0);
        let (x0, y0, x1, y1) = (c.center.x - hw, c.center.y - hh, c.center.x + hw, c.center.y + hh);
        Some(match acc {
            Some((min_x, min_y, max_x, max_y)) => (min_x.min(x0), min_y.min(y0), max_x.max(x1), max_y.max(y1)),
            None => (x0, y0, x1, y1),
        })
    });

    let (center, width, height) = match extent {
        Some((min_x, min_y, max_x, max_y)) => (
            Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
            (max_x - min_x + 2.0 * FAUX_BOARD_MARGIN).max(FAUX_BOARD_MIN_SIZE),
            (max_y - min_y + 2.0 * FAUX_BOARD_MARGIN).max(FAUX_BOARD_MIN_SIZE),
        ),
        None => (Point::default(), FAUX_BOARD_MIN_SIZE, FAUX_BOARD_MIN_SIZE),
    };

    tracing::debug!(width, height, "Synthesizing faux board");
    let mesh = build_solid(&Outline::Rect { width, height }, thickness, &[])?;

    let mut board = Box3D::new([center.x, 0.0, center.y], [width, thickness, height]);
    board.mesh = Some(Arc::new(mesh));
    board.color = Some(options.board_color);
    Ok(board)
}

/// Diagonal heuristic over the surface, else over all primitives, else a constant
fn default_camera(surface: Option<Frame>, boxes: &[Box3D]) -> Camera {
    let frame = surface.or_else(|| {
        boxes
            .iter()
            .map(Box3D::footprint)
            .reduce(|(a, b, c, d), (x0, z0, x1, z1)| (a.min(x0), b.min(z0), c.max(x1), d.max(z1)))
            .map(Frame::from_extent)
    });

    match frame.filter(|f| f.diagonal().is_finite() && f.diagonal() > 0.0) {
        Some(frame) => {
            let distance = 1.5 * frame.diagonal();
            let [ox, oy, oz] = CAMERA_OFFSET;
            Camera {
                position: [
                    frame.center_x + ox * distance,
                    oy * distance,
                    frame.center_z + oz * distance,
                ],
                look_at: [frame.center_x, 0.0, frame.center_z],
                up: [0.0, 1.0, 0.0],
                fov: CAMERA_FOV_DEGREES,
                near: CAMERA_NEAR,
                far: 4.0 * distance,
            }
        }
        None => Camera {
            position: FALLBACK_CAMERA_POSITION,
            look_at: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov: CAMERA_FOV_DEGREES,
            near: CAMERA_NEAR,
            far: FALLBACK_CAMERA_FAR,
        },
    }
}

/// One ambient and one directional light
pub fn default_lights() -> Vec<Light> {
    let [x, y, z] = DIRECTIONAL_LIGHT_DIRECTION;
    let direction = Vector3::new(x, y, z).normalize();
    vec![
        Light::Ambient {
            color: WHITE,
            intensity: AMBIENT_INTENSITY,
        },
        Light::Directional {
            color: WHITE,
            intensity: DIRECTIONAL_INTENSITY,
            direction: [direction.x, direction.y, direction.z],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_explicit_rotation_swaps_axes_for_scene_formats() {
        let degrees = Some(Vec3::new(90.0, 0.0, 45.0));
        let glb = cad_rotation(degrees, SourceKind::Glb, Layer::Bottom).unwrap();
        assert_relative_eq!(glb[1], PI / 4.0);
        assert_relative_eq!(glb[2], 0.0);

        let stl = cad_rotation(degrees, SourceKind::Stl, Layer::Bottom).unwrap();
        assert_relative_eq!(stl[0], PI / 2.0);
        assert_relative_eq!(stl[2], PI / 4.0);
    }

    #[test]
    fn test_implicit_bottom_flip_axis() {
        assert_eq!(cad_rotation(None, SourceKind::Gltf, Layer::Bottom), Some([0.0, 0.0, PI]));
        assert_eq!(cad_rotation(None, SourceKind::Footprinter, Layer::Bottom), Some([0.0, 0.0, PI]));
        assert_eq!(cad_rotation(None, SourceKind::Step, Layer::Bottom), Some([PI, 0.0, 0.0]));
        assert_eq!(cad_rotation(None, SourceKind::Obj, Layer::Top), None);
    }

    #[test]
    fn test_explicit_size_scaled_by_unit_factor() {
        let cad = CadComponent {
            pcb_component_id: "p".to_string(),
            size: Some(Vec3::new(1.0, 2.0, 3.0)),
            model_unit_to_mm_scale_factor: Some(10.0),
            ..Default::default()
        };
        assert_eq!(cad_size(&cad, None, 2.0), [10.0, 30.0, 20.0]);
    }

    #[test]
    fn test_camera_heuristic() {
        let frame = Frame {
            center_x: 5.0,
            center_z: -2.0,
            width: 30.0,
            depth: 40.0,
        };
        let camera = default_camera(Some(frame), &[]);
        assert_relative_eq!(camera.far, 4.0 * 75.0);
        assert_eq!(camera.look_at, [5.0, 0.0, -2.0]);
        assert_relative_eq!(camera.position[1], 75.0);
        assert_eq!(camera.up, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_camera_from_primitives_then_fallback() {
        let boxes = vec![
            Box3D::new([0.0, 5.0, 0.0], [2.0, 10.0, 2.0]),
            Box3D::new([10.0, 0.0, 0.0], [2.0, 1.0, 2.0]),
        ];
        let camera = default_camera(None, &boxes);
        assert_eq!(camera.look_at, [5.0, 0.0, 0.0]);

        let fallback = default_camera(None, &[]);
        assert_eq!(fallback.position, FALLBACK_CAMERA_POSITION);
    }

    #[test]
    fn test_lights() {
        let lights = default_lights();
        assert_eq!(lights.len(), 2);
        assert!(matches!(lights[0], Light::Ambient { .. }));
        match lights[1] {
            Light::Directional { direction, .. } => {
                assert_relative_eq!(Vector3::from(direction).norm(), 1.0, epsilon = 1e-12)
            }
            _ => panic!("expected directional light"),
        }
    }
}
