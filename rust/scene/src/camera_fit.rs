// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frustum-exact camera for a circuit
//!
//! Independent of the composer's default camera: frames the panel, or the
//! board when there is no panel, so it exactly fills the field of view.

use pcb_scene_core::{CircuitEntities, CircuitRecord};
use pcb_scene_geometry::{fit_camera, CameraFit, CameraFitOptions, FitTarget};

/// Rectangle framed for these entities: panel, else first board
pub fn fit_target(entities: &CircuitEntities) -> Option<FitTarget> {
    entities
        .panel()
        .map(|p| (p.center, p.width, p.height))
        .or_else(|| entities.board().map(|b| (b.center, b.width, b.height)))
        .map(|(center, width, height)| FitTarget {
            center_x: center.x,
            center_y: center.y,
            width,
            height,
        })
}

/// Camera that frames the circuit's panel or board
pub fn fit_camera_to_circuit(records: &[CircuitRecord], options: &CameraFitOptions) -> CameraFit {
    let entities = CircuitEntities::resolve(records);
    fit_camera(fit_target(&entities).as_ref(), options)
}
