// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # PCB-Scene Core
//!
//! Circuit record model for PCB scene construction.
//!
//! - **Records**: serde model of the flat, `type`-tagged circuit record list
//! - **Entity resolution**: typed lookup tables built once per conversion
//! - **Geometry sources**: the single model source chosen for each CAD component
//!
//! ```rust,ignore
//! use pcb_scene_core::{CircuitEntities, CircuitRecord};
//!
//! let records = CircuitRecord::parse_list(json)?;
//! let entities = CircuitEntities::resolve(&records);
//! for cad in &entities.cad_components {
//!     println!("{:?}", cad.source);
//! }
//! ```

pub mod entities;
pub mod error;
pub mod records;
pub mod source;

pub use entities::{CircuitEntities, ResolvedCadComponent};
pub use error::{Error, Result};
pub use records::{
    CadComponent, CircuitRecord, CutoutShape, HoleShape, Layer, PcbBoard, PcbComponent,
    PcbCutout, PcbHole, PcbPanel, PcbPlatedHole, PlatedHoleShape, Point, SourceComponent, Vec3,
};
pub use source::{GeometrySource, SourceKind};
