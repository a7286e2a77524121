// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parametric footprint geometry
//!
//! A footprint descriptor string (for example `soic8_p1.27mm`) is turned
//! into a component body by an external generator. The generator works in
//! its own axes; loaders map them with the `FOOTPRINTER` preset.

use crate::error::Result;
use async_trait::async_trait;
use pcb_scene_geometry::Mesh;

/// Builds component geometry from a footprint descriptor
#[async_trait]
pub trait FootprintGenerator: Send + Sync {
    async fn generate(&self, descriptor: &str) -> Result<Mesh>;
}
