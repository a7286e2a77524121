// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # PCB Scene Loaders
//!
//! Fetching and parsing of component models into canonical scene space.
//!
//! ## Formats
//!
//! - **STL**: ASCII and binary, through `stl_io`
//! - **OBJ**: with inline material colors
//! - **GLB / glTF**: node hierarchy flattened, external buffers fetched
//! - **STEP**: tessellated by an external CAD kernel
//! - **Footprints**: generated from a descriptor by a host-supplied generator
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pcb_scene_loaders::{LoadRequest, ModelLoaders};
//!
//! let loaders = ModelLoaders::default();
//! let mesh = loaders
//!     .load_stl(&LoadRequest::new("https://example.com/part.stl"))
//!     .await?;
//! println!("{} triangles", mesh.triangle_count());
//! ```

pub mod cache;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod kernel;
pub mod loader;
pub mod url;
pub mod wasm;

pub use cache::SingleFlightCache;
pub use error::{KernelAttempt, LoadError, Result};
pub use fetch::{auth_signature, AuthHeaders, Fetcher, HttpFetcher};
pub use formats::{
    parse_gltf, parse_obj, parse_stl, FootprintGenerator, KernelRuntime, StepImportParams, StepImportResult,
    StepKernel, StepKernelFactory,
};
pub use kernel::{KernelCacheKey, StepKernels};
pub use loader::{default_transform, scaled_copy, LoadRequest, MeshCacheKey, ModelLoaders};
pub use url::{resolve_model_url, PackageReference};
pub use wasm::{first_success, validate_wasm, wasm_candidates, AttemptOutcome, CandidateKind, WasmCandidate};
