// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tagged geometry source of a CAD component

use crate::records::CadComponent;
use serde::{Deserialize, Serialize};

/// Mesh format family a geometry source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Stl,
    Obj,
    Glb,
    Gltf,
    Step,
    Footprinter,
}

impl SourceKind {
    /// Short lowercase name, used in log fields and error messages
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Stl => "stl",
            SourceKind::Obj => "obj",
            SourceKind::Glb => "glb",
            SourceKind::Gltf => "gltf",
            SourceKind::Step => "step",
            SourceKind::Footprinter => "footprinter",
        }
    }

    /// Scene-interchange formats (GLB, glTF), which carry their own Y-up orientation
    pub fn is_scene_interchange(self) -> bool {
        matches!(self, SourceKind::Glb | SourceKind::Gltf)
    }
}

/// The one geometry source selected for a CAD component
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometrySource {
    Stl { url: String },
    Obj { url: String },
    Glb { url: String },
    Gltf { url: String },
    Step { url: String },
    Footprinter { descriptor: String },
}

impl GeometrySource {
    /// Select the geometry source of a CAD component.
    ///
    /// Precedence: STL > OBJ > GLB > glTF > STEP > footprinter string.
    /// Empty strings are treated as absent.
    pub fn select(cad: &CadComponent) -> Option<Self> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        if let Some(url) = present(&cad.model_stl_url) {
            return Some(GeometrySource::Stl { url });
        }
        if let Some(url) = present(&cad.model_obj_url) {
            return Some(GeometrySource::Obj { url });
        }
        if let Some(url) = present(&cad.model_glb_url) {
            return Some(GeometrySource::Glb { url });
        }
        if let Some(url) = present(&cad.model_gltf_url) {
            return Some(GeometrySource::Gltf { url });
        }
        if let Some(url) = present(&cad.model_step_url) {
            return Some(GeometrySource::Step { url });
        }
        present(&cad.footprinter_string).map(|descriptor| GeometrySource::Footprinter { descriptor })
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            GeometrySource::Stl { .. } => SourceKind::Stl,
            GeometrySource::Obj { .. } => SourceKind::Obj,
            GeometrySource::Glb { .. } => SourceKind::Glb,
            GeometrySource::Gltf { .. } => SourceKind::Gltf,
            GeometrySource::Step { .. } => SourceKind::Step,
            GeometrySource::Footprinter { .. } => SourceKind::Footprinter,
        }
    }

    /// URL or footprint descriptor
    pub fn locator(&self) -> &str {
        match self {
            GeometrySource::Stl { url }
            | GeometrySource::Obj { url }
            | GeometrySource::Glb { url }
            | GeometrySource::Gltf { url }
            | GeometrySource::Step { url } => url,
            GeometrySource::Footprinter { descriptor } => descriptor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_prefers_solid_geometry() {
        let cad = CadComponent {
            pcb_component_id: "p1".into(),
            model_step_url: Some("part.step".into()),
            model_glb_url: Some("part.glb".into()),
            model_obj_url: Some("part.obj".into()),
            footprinter_string: Some("soic8".into()),
            ..Default::default()
        };
        assert_eq!(
            GeometrySource::select(&cad),
            Some(GeometrySource::Obj { url: "part.obj".into() })
        );
    }

    #[test]
    fn test_precedence_chain() {
        let mut cad = CadComponent {
            pcb_component_id: "p1".into(),
            model_gltf_url: Some("a.gltf".into()),
            model_step_url: Some("a.step".into()),
            footprinter_string: Some("0402".into()),
            ..Default::default()
        };
        assert_eq!(GeometrySource::select(&cad).unwrap().kind(), SourceKind::Gltf);

        cad.model_gltf_url = None;
        assert_eq!(GeometrySource::select(&cad).unwrap().kind(), SourceKind::Step);

        cad.model_step_url = Some("   ".into());
        let source = GeometrySource::select(&cad).unwrap();
        assert_eq!(source.kind(), SourceKind::Footprinter);
        assert_eq!(source.locator(), "0402");

        cad.footprinter_string = None;
        assert!(GeometrySource::select(&cad).is_none());
    }
}
