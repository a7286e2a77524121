// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use pcb_scene_core::SourceKind;
use pcb_scene_loaders::LoadError;
use thiserror::Error;

/// Result type for scene conversion
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors that abort a conversion
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Invalid circuit records: {0}")]
    Records(#[from] pcb_scene_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] pcb_scene_geometry::Error),

    #[error("Model load failed: {0}")]
    Load(#[from] LoadError),
}

impl SceneError {
    /// Whether a failed model of `kind` becomes a flat-colored box instead of
    /// aborting the conversion.
    ///
    /// Only STEP and GLB fetch/parse failures degrade. STL, OBJ, glTF and
    /// footprint failures propagate, and kernel or geometry failures are
    /// always fatal.
    pub fn is_degradable(&self, kind: SourceKind) -> bool {
        match self {
            SceneError::Load(error) => {
                matches!(kind, SourceKind::Step | SourceKind::Glb) && error.is_fetch_or_parse()
            }
            _ => false,
        }
    }
}
