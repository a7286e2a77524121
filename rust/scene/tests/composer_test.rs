// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end conversions against an in-memory fetcher.

use approx::assert_relative_eq;
use async_trait::async_trait;
use pcb_scene::{
    AuthHeaders, BoardTextureRenderer, ConversionOptions, KernelRuntime, LoadError, ModelLoaders, RenderedTextures,
    Scene3D, SceneComposer, SceneError, TextureError, TextureImage, TextureTarget,
};
use pcb_scene_core::CircuitEntities;
use pcb_scene_loaders::{Fetcher, Result as LoadResult, StepKernel, StepKernelFactory};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

const TRIANGLE_STL: &str = "solid t
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 1 0
  endloop
endfacet
endsolid t
";

#[derive(Default)]
struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    fn count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, _headers: &AuthHeaders) -> LoadResult<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| LoadError::fetch(url, "status 404"))
    }
}

fn composer(fetcher: Arc<MockFetcher>) -> SceneComposer {
    SceneComposer::new(Arc::new(ModelLoaders::new(fetcher)))
}

async fn convert(composer: &SceneComposer, json: &str) -> Result<Scene3D, SceneError> {
    composer.convert_json(json, &ConversionOptions::default()).await
}

#[tokio::test]
async fn test_panel_wins_over_board() {
    let json = r#"[
        {"type": "pcb_board", "pcb_board_id": "b", "center": {"x": 0, "y": 0}, "width": 30, "height": 20},
        {"type": "pcb_panel", "pcb_panel_id": "p", "center": {"x": 0, "y": 0}, "width": 100, "height": 80}
    ]"#;
    let scene = convert(&composer(Arc::default()), json).await.unwrap();

    let surfaces: Vec<_> = scene.boxes.iter().filter(|b| b.has_mesh()).collect();
    assert_eq!(surfaces.len(), 1);
    assert_relative_eq!(surfaces[0].size[0], 100.0, epsilon = 1e-6);
    assert_relative_eq!(surfaces[0].size[2], 80.0, epsilon = 1e-6);
    assert_relative_eq!(surfaces[0].size[1], 1.4);
}

#[tokio::test]
async fn test_component_without_model_gets_labeled_box() {
    let json = r#"[
        {"type": "pcb_board", "pcb_board_id": "b", "center": {"x": 0, "y": 0}, "width": 40, "height": 40},
        {"type": "source_component", "source_component_id": "s1", "name": "U1"},
        {"type": "pcb_component", "pcb_component_id": "c1", "source_component_id": "s1",
         "center": {"x": 5, "y": -3}, "width": 10, "height": 4}
    ]"#;
    let scene = convert(&composer(Arc::default()), json).await.unwrap();

    assert_eq!(scene.boxes.len(), 2);
    let part = scene.labeled("U1").unwrap();
    assert_eq!(part.size, [10.0, 2.0, 4.0]);
    assert_relative_eq!(part.center[0], 5.0);
    assert_relative_eq!(part.center[1], 0.7 + 1.0);
    assert_relative_eq!(part.center[2], -3.0);
    assert_eq!(part.color, Some(ConversionOptions::default().component_color));
    assert_eq!(scene.lights.len(), 2);
}

#[tokio::test]
async fn test_unnamed_bottom_component() {
    let json = r#"[
        {"type": "pcb_component", "pcb_component_id": "c1", "center": {"x": 0, "y": 0},
         "width": 1, "height": 3, "layer": "bottom"}
    ]"#;
    let scene = convert(&composer(Arc::default()), json).await.unwrap();

    let part = scene.labeled("<unnamed>").unwrap();
    assert_relative_eq!(part.size[1], 1.0);
    assert_relative_eq!(part.center[1], -(0.7 + 0.5));
}

#[tokio::test]
async fn test_bounding_boxes_can_be_disabled() {
    let json = r#"[{"type": "pcb_component", "pcb_component_id": "c1", "width": 1, "height": 1}]"#;
    let options = ConversionOptions {
        show_bounding_boxes: false,
        ..Default::default()
    };
    let scene = composer(Arc::default()).convert_json(json, &options).await.unwrap();
    assert!(scene.boxes.is_empty());
    assert_eq!(scene.lights.len(), 2);
}

#[tokio::test]
async fn test_shared_model_is_fetched_once() {
    let url = "https://models.example.com/r0402.stl";
    let fetcher = Arc::new(MockFetcher::default().with(url, TRIANGLE_STL));
    let json = format!(
        r#"[
        {{"type": "pcb_component", "pcb_component_id": "c1", "center": {{"x": 0, "y": 0}}, "width": 1, "height": 0.5}},
        {{"type": "pcb_component", "pcb_component_id": "c2", "center": {{"x": 3, "y": 0}}, "width": 1, "height": 0.5}},
        {{"type": "cad_component", "pcb_component_id": "c1", "model_stl_url": "{url}"}},
        {{"type": "cad_component", "pcb_component_id": "c2", "model_stl_url": "{url}"}}
    ]"#
    );
    let scene = convert(&composer(fetcher.clone()), &json).await.unwrap();

    assert_eq!(fetcher.count(url), 1);
    let meshes: Vec<_> = scene.meshes().collect();
    assert_eq!(meshes.len(), 2);
    assert!(Arc::ptr_eq(meshes[0], meshes[1]));
    // Components with a model get no bounding box and no fallback color
    assert!(scene.boxes.iter().all(|b| b.label.is_none() && b.color.is_none()));
}

#[tokio::test]
async fn test_bottom_flip_and_explicit_rotation() {
    let url = "https://x/part.stl";
    let fetcher = Arc::new(MockFetcher::default().with(url, TRIANGLE_STL));
    let json = format!(
        r#"[
        {{"type": "pcb_component", "pcb_component_id": "c1", "width": 1, "height": 1, "layer": "bottom"}},
        {{"type": "pcb_component", "pcb_component_id": "c2", "width": 1, "height": 1, "layer": "bottom"}},
        {{"type": "cad_component", "pcb_component_id": "c1", "model_stl_url": "{url}"}},
        {{"type": "cad_component", "pcb_component_id": "c2", "model_stl_url": "{url}",
          "rotation": {{"x": 0, "y": 0, "z": 90}}}}
    ]"#
    );
    let scene = convert(&composer(fetcher), &json).await.unwrap();

    assert_eq!(scene.boxes[0].rotation, Some([PI, 0.0, 0.0]));
    let explicit = scene.boxes[1].rotation.unwrap();
    assert_relative_eq!(explicit[0], 0.0);
    assert_relative_eq!(explicit[2], PI / 2.0);
    // Bottom parts hang below the board
    assert_relative_eq!(scene.boxes[0].center[1], -0.7);
}

#[tokio::test]
async fn test_unreachable_step_degrades_to_box() {
    let json = r#"[
        {"type": "pcb_component", "pcb_component_id": "c1", "width": 2, "height": 2},
        {"type": "cad_component", "pcb_component_id": "c1", "model_step_url": "https://x/missing.step"}
    ]"#;
    let options = ConversionOptions::default();
    let scene = composer(Arc::default()).convert_json(json, &options).await.unwrap();

    assert_eq!(scene.boxes.len(), 1);
    assert!(!scene.boxes[0].has_mesh());
    assert_eq!(scene.boxes[0].color, Some(options.component_color));
    assert!(scene.boxes[0].label.is_none());
}

#[tokio::test]
async fn test_unreachable_glb_degrades_but_stl_propagates() {
    let glb = r#"[
        {"type": "pcb_component", "pcb_component_id": "c1", "width": 2, "height": 2},
        {"type": "cad_component", "pcb_component_id": "c1", "model_glb_url": "https://x/missing.glb"}
    ]"#;
    assert!(convert(&composer(Arc::default()), glb).await.is_ok());

    let stl = glb.replace("model_glb_url", "model_stl_url").replace(".glb", ".stl");
    let err = convert(&composer(Arc::default()), &stl).await.unwrap_err();
    assert!(matches!(err, SceneError::Load(LoadError::ResourceFetch { .. })));
}

struct UnusedFactory;

#[async_trait]
impl StepKernelFactory for UnusedFactory {
    async fn instantiate(&self, _wasm_binary: Option<Vec<u8>>) -> LoadResult<Arc<dyn StepKernel>> {
        Err(LoadError::Geometry("instantiate should not be reached".to_string()))
    }
}

#[tokio::test]
async fn test_kernel_exhaustion_is_fatal() {
    let fetcher = Arc::new(MockFetcher::default().with("https://x/a.step", "ISO-10303-21;"));
    let loaders = ModelLoaders::new(fetcher).with_step_kernel(
        Arc::new(UnusedFactory),
        KernelRuntime::Browser {
            origin: "https://app.example.com".to_string(),
        },
    );
    let json = r#"[
        {"type": "pcb_component", "pcb_component_id": "c1", "width": 2, "height": 2},
        {"type": "cad_component", "pcb_component_id": "c1", "model_step_url": "https://x/a.step"}
    ]"#;

    let err = SceneComposer::new(Arc::new(loaders))
        .convert_json(json, &ConversionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SceneError::Load(LoadError::KernelInit { .. })));
}

#[tokio::test]
async fn test_faux_board_floors_at_minimum() {
    let json = r#"[
        {"type": "source_component", "source_component_id": "s1", "name": "C1"},
        {"type": "pcb_component", "pcb_component_id": "c1", "source_component_id": "s1",
         "center": {"x": 15, "y": 5}, "width": 4, "height": 6}
    ]"#;
    let options = ConversionOptions {
        draw_faux_board: true,
        ..Default::default()
    };
    let scene = composer(Arc::default()).convert_json(json, &options).await.unwrap();

    assert_eq!(scene.boxes.len(), 2);
    let board = &scene.boxes[0];
    assert!(board.has_mesh());
    assert_eq!(board.center, [15.0, 0.0, 5.0]);
    assert_eq!(board.size, [10.0, 1.4, 10.0]);
    assert!(scene.labeled("C1").is_some());
    assert_eq!(scene.camera.look_at, [15.0, 0.0, 5.0]);
}

#[tokio::test]
async fn test_unit_scale_leaves_cache_untouched() {
    let url = "https://x/inch.stl";
    let fetcher = Arc::new(MockFetcher::default().with(url, TRIANGLE_STL));
    let composer = composer(fetcher.clone());
    let scaled = format!(
        r#"[
        {{"type": "pcb_component", "pcb_component_id": "c1", "width": 1, "height": 1}},
        {{"type": "cad_component", "pcb_component_id": "c1", "model_stl_url": "{url}",
          "model_unit_to_mm_scale_factor": 25.4}}
    ]"#
    );
    let plain = format!(
        r#"[
        {{"type": "pcb_component", "pcb_component_id": "c1", "width": 1, "height": 1}},
        {{"type": "cad_component", "pcb_component_id": "c1", "model_stl_url": "{url}"}}
    ]"#
    );

    let big = convert(&composer, &scaled).await.unwrap();
    let small = convert(&composer, &plain).await.unwrap();

    assert_eq!(fetcher.count(url), 1);
    let big_mesh = big.boxes[0].mesh.as_ref().unwrap();
    let small_mesh = small.boxes[0].mesh.as_ref().unwrap();
    assert_relative_eq!(big_mesh.bounding_box.max.x, 25.4, epsilon = 1e-9);
    assert_relative_eq!(small_mesh.bounding_box.max.x, 1.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_footprint_without_generator_is_fatal() {
    let json = r#"[
        {"type": "pcb_board", "pcb_board_id": "b", "center": {"x": 0, "y": 0}, "width": 10, "height": 10},
        {"type": "pcb_component", "pcb_component_id": "c1", "width": 1, "height": 0.5},
        {"type": "cad_component", "pcb_component_id": "c1", "footprinter_string": "0402"}
    ]"#;

    let err = convert(&composer(Arc::default()), json).await.unwrap_err();
    assert!(matches!(
        err,
        SceneError::Load(LoadError::MissingCollaborator("footprint generator"))
    ));
}

struct StubTextures {
    fail: bool,
}

#[async_trait]
impl BoardTextureRenderer for StubTextures {
    async fn render(
        &self,
        _entities: &CircuitEntities,
        target: &TextureTarget,
    ) -> Result<RenderedTextures, TextureError> {
        if self.fail {
            return Err(TextureError("no canvas".to_string()));
        }
        Ok(RenderedTextures {
            top: Some(TextureImage {
                width: target.resolution,
                height: target.resolution,
                png: vec![1, 2, 3],
            }),
            bottom: None,
        })
    }
}

#[tokio::test]
async fn test_texture_failure_keeps_flat_color() {
    let json = r#"[{"type": "pcb_board", "pcb_board_id": "b", "center": {"x": 0, "y": 0}, "width": 20, "height": 10}]"#;
    let options = ConversionOptions {
        render_board_textures: true,
        texture_resolution: 256,
        ..Default::default()
    };

    let failing = composer(Arc::default()).with_texture_renderer(Arc::new(StubTextures { fail: true }));
    let scene = failing.convert_json(json, &options).await.unwrap();
    assert!(scene.boxes[0].textures.is_none());
    assert_eq!(scene.boxes[0].color, Some(options.board_color));

    let working = composer(Arc::default()).with_texture_renderer(Arc::new(StubTextures { fail: false }));
    let scene = working.convert_json(json, &options).await.unwrap();
    let textures = scene.boxes[0].textures.as_ref().unwrap();
    assert!(textures.top.as_ref().unwrap().starts_with("data:image/png;base64,"));
    assert!(textures.bottom.is_none());
}
