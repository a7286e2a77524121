// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model format parsers
//!
//! Each parser turns raw bytes into a [`Mesh`](pcb_scene_geometry::Mesh)
//! in the producer's own axes; loaders apply the coordinate transform.

pub mod footprint;
pub mod gltf;
pub mod obj;
pub mod step;
pub mod stl;

pub use footprint::FootprintGenerator;
pub use self::gltf::parse_gltf;
pub use obj::parse_obj;
pub use step::{KernelRuntime, StepImportParams, StepImportResult, StepKernel, StepKernelFactory};
pub use stl::parse_stl;
