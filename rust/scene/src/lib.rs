// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # PCB Scene
//!
//! Converts a flat list of circuit records into a renderable 3D scene:
//! the board or panel solid with its holes and cutouts, every component
//! model placed and oriented, bounding boxes for components without a
//! model, a default camera and lights.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pcb_scene::{ConversionOptions, SceneComposer};
//!
//! let composer = SceneComposer::default();
//! let scene = composer.convert_json(circuit_json, &ConversionOptions::from_env()).await?;
//! println!("{} primitives", scene.boxes.len());
//! ```
//!
//! Model caches live in the composer's [`ModelLoaders`]; share one composer
//! (or one `Arc<ModelLoaders>`) across conversions to reuse loaded models.
//!
//! ## Footprints and STEP models
//!
//! Footprint generation and STEP tessellation are external collaborators.
//! `SceneComposer::default()` carries neither, so a circuit with a
//! `footprinter_string` or a reachable STEP model fails with
//! [`LoadError::MissingCollaborator`]. Plug them in on the loaders:
//!
//! ```rust,ignore
//! let loaders = ModelLoaders::default()
//!     .with_footprint_generator(generator)
//!     .with_step_kernel(factory, KernelRuntime::Native);
//! let composer = SceneComposer::new(Arc::new(loaders));
//! ```

pub mod camera_fit;
pub mod composer;
pub mod error;
pub mod options;
pub mod texture;
pub mod types;

pub use camera_fit::{fit_camera_to_circuit, fit_target};
pub use composer::{default_lights, SceneComposer};
pub use error::{Result, SceneError};
pub use options::ConversionOptions;
pub use texture::{BoardTextureRenderer, RenderedTextures, TextureError, TextureImage, TextureTarget};
pub use types::{Box3D, BoxTextures, Camera, Light, Scene3D};

pub use pcb_scene_core::{CircuitRecord, GeometrySource, SourceKind};
pub use pcb_scene_geometry::{CameraFit, CameraFitOptions, CoordinateTransformConfig, TransformPreset};
pub use pcb_scene_loaders::{AuthHeaders, KernelRuntime, LoadError, ModelLoaders};
