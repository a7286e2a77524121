// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity resolution
//!
//! Builds typed lookup tables from the raw record list once per conversion.
//! Everything downstream consumes [`CircuitEntities`], never the record list.

use crate::records::{
    CadComponent, CircuitRecord, PcbBoard, PcbComponent, PcbCutout, PcbHole, PcbPanel,
    PcbPlatedHole, SourceComponent,
};
use crate::source::GeometrySource;
use rustc_hash::FxHashMap;

/// A CAD component together with its selected geometry source
#[derive(Debug, Clone)]
pub struct ResolvedCadComponent {
    pub cad: CadComponent,
    /// `None` when the component names no usable source
    pub source: Option<GeometrySource>,
}

/// Typed view of a circuit description
#[derive(Debug, Clone, Default)]
pub struct CircuitEntities {
    pub boards: Vec<PcbBoard>,
    pub panels: Vec<PcbPanel>,
    pub holes: Vec<PcbHole>,
    pub plated_holes: Vec<PcbPlatedHole>,
    pub cutouts: Vec<PcbCutout>,
    /// PCB components in input order
    pub pcb_components: Vec<PcbComponent>,
    /// CAD components in input order
    pub cad_components: Vec<ResolvedCadComponent>,
    pcb_component_index: FxHashMap<String, usize>,
    source_components: FxHashMap<String, SourceComponent>,
    board_index: FxHashMap<String, usize>,
}

impl CircuitEntities {
    /// Resolve a record list into lookup tables
    pub fn resolve(records: &[CircuitRecord]) -> Self {
        let mut entities = CircuitEntities::default();

        for record in records {
            match record {
                CircuitRecord::PcbBoard(board) => {
                    entities
                        .board_index
                        .entry(board.pcb_board_id.clone())
                        .or_insert(entities.boards.len());
                    entities.boards.push(board.clone());
                }
                CircuitRecord::PcbPanel(panel) => entities.panels.push(panel.clone()),
                CircuitRecord::PcbHole(hole) => entities.holes.push(hole.clone()),
                CircuitRecord::PcbPlatedHole(hole) => entities.plated_holes.push(hole.clone()),
                CircuitRecord::PcbCutout(cutout) => entities.cutouts.push(cutout.clone()),
                CircuitRecord::PcbComponent(component) => {
                    entities
                        .pcb_component_index
                        .entry(component.pcb_component_id.clone())
                        .or_insert(entities.pcb_components.len());
                    entities.pcb_components.push(component.clone());
                }
                CircuitRecord::SourceComponent(source) => {
                    entities
                        .source_components
                        .insert(source.source_component_id.clone(), source.clone());
                }
                CircuitRecord::CadComponent(cad) => {
                    let source = GeometrySource::select(cad);
                    entities.cad_components.push(ResolvedCadComponent {
                        cad: cad.clone(),
                        source,
                    });
                }
                CircuitRecord::Unknown => {}
            }
        }

        tracing::debug!(
            boards = entities.boards.len(),
            panels = entities.panels.len(),
            holes = entities.holes.len() + entities.plated_holes.len(),
            cutouts = entities.cutouts.len(),
            pcb_components = entities.pcb_components.len(),
            cad_components = entities.cad_components.len(),
            "Resolved circuit entities"
        );

        entities
    }

    /// First panel, if any
    pub fn panel(&self) -> Option<&PcbPanel> {
        self.panels.first()
    }

    /// First board, if any
    pub fn board(&self) -> Option<&PcbBoard> {
        self.boards.first()
    }

    pub fn board_by_id(&self, id: &str) -> Option<&PcbBoard> {
        self.board_index.get(id).map(|&i| &self.boards[i])
    }

    pub fn pcb_component(&self, id: &str) -> Option<&PcbComponent> {
        self.pcb_component_index
            .get(id)
            .map(|&i| &self.pcb_components[i])
    }

    pub fn source_component(&self, id: &str) -> Option<&SourceComponent> {
        self.source_components.get(id)
    }

    /// Display name of a PCB component's source component
    pub fn source_name(&self, component: &PcbComponent) -> Option<&str> {
        component
            .source_component_id
            .as_deref()
            .and_then(|id| self.source_component(id))
            .and_then(|source| source.name.as_deref())
    }

    /// Thickness every surface uses: the first board's own thickness, else `fallback`
    pub fn effective_board_thickness(&self, fallback: f64) -> f64 {
        self.board()
            .and_then(|b| b.thickness)
            .filter(|t| t.is_finite() && *t > 0.0)
            .unwrap_or(fallback)
    }

    /// Cutouts cut from one board: its own, plus the unscoped (global) ones
    /// when no panel exists to carry them
    pub fn board_cutouts<'a>(&'a self, board_id: &'a str) -> impl Iterator<Item = &'a PcbCutout> {
        let global = self.panels.is_empty();
        self.cutouts.iter().filter(move |c| match c.pcb_board_id.as_deref() {
            Some(id) => id == board_id,
            None => global,
        })
    }

    /// Cutouts without a board scope
    pub fn panel_cutouts(&self) -> impl Iterator<Item = &PcbCutout> {
        self.cutouts.iter().filter(|c| c.pcb_board_id.is_none())
    }

    /// Holes drilled through one board: its own plus unscoped ones
    pub fn board_holes<'a>(&'a self, board_id: &'a str) -> impl Iterator<Item = &'a PcbHole> {
        self.holes.iter().filter(move |h| {
            h.pcb_board_id
                .as_deref()
                .map_or(true, |id| id == board_id)
        })
    }

    pub fn board_plated_holes<'a>(
        &'a self,
        board_id: &'a str,
    ) -> impl Iterator<Item = &'a PcbPlatedHole> {
        self.plated_holes.iter().filter(move |h| {
            h.pcb_board_id
                .as_deref()
                .map_or(true, |id| id == board_id)
        })
    }

    /// Holes without a board scope
    pub fn panel_holes(&self) -> impl Iterator<Item = &PcbHole> {
        self.holes.iter().filter(|h| h.pcb_board_id.is_none())
    }

    pub fn panel_plated_holes(&self) -> impl Iterator<Item = &PcbPlatedHole> {
        self.plated_holes.iter().filter(|h| h.pcb_board_id.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CutoutShape, Layer, Point};

    fn component(id: &str, source: &str) -> CircuitRecord {
        CircuitRecord::PcbComponent(PcbComponent {
            pcb_component_id: id.into(),
            source_component_id: Some(source.into()),
            center: Point::new(1.0, 2.0),
            width: 3.0,
            height: 4.0,
            layer: Layer::Top,
            rotation: None,
        })
    }

    #[test]
    fn test_resolve_links_source_names() {
        let records = vec![
            component("pc1", "sc1"),
            CircuitRecord::SourceComponent(SourceComponent {
                source_component_id: "sc1".into(),
                name: Some("U1".into()),
            }),
            CircuitRecord::Unknown,
        ];

        let entities = CircuitEntities::resolve(&records);
        let pc = entities.pcb_component("pc1").unwrap();
        assert_eq!(entities.source_name(pc), Some("U1"));
        assert!(entities.pcb_component("missing").is_none());
    }

    #[test]
    fn test_cutout_scoping() {
        let rect = CutoutShape::Rect {
            center: Point::new(0.0, 0.0),
            width: 1.0,
            height: 1.0,
            rotation: None,
        };
        let records = vec![
            CircuitRecord::PcbCutout(PcbCutout {
                pcb_cutout_id: "c1".into(),
                pcb_board_id: Some("b1".into()),
                shape: rect.clone(),
            }),
            CircuitRecord::PcbCutout(PcbCutout {
                pcb_cutout_id: "c2".into(),
                pcb_board_id: None,
                shape: rect,
            }),
        ];

        fn ids<'a>(cutouts: impl Iterator<Item = &'a PcbCutout>) -> Vec<&'a str> {
            cutouts.map(|c| c.pcb_cutout_id.as_str()).collect()
        }

        // Without a panel, global cutouts land on every board
        let entities = CircuitEntities::resolve(&records);
        assert_eq!(ids(entities.board_cutouts("b1")), vec!["c1", "c2"]);
        assert_eq!(ids(entities.board_cutouts("b2")), vec!["c2"]);

        let mut with_panel = records.clone();
        with_panel.push(CircuitRecord::PcbPanel(PcbPanel {
            pcb_panel_id: "p1".into(),
            center: Point::default(),
            width: 50.0,
            height: 50.0,
            outline: None,
        }));
        let entities = CircuitEntities::resolve(&with_panel);
        assert_eq!(ids(entities.board_cutouts("b1")), vec!["c1"]);
        assert_eq!(ids(entities.panel_cutouts()), vec!["c2"]);
        assert_eq!(entities.board_cutouts("b2").count(), 0);
    }

    #[test]
    fn test_effective_thickness_falls_back() {
        let mut entities = CircuitEntities::default();
        assert_eq!(entities.effective_board_thickness(1.4), 1.4);

        entities.boards.push(PcbBoard {
            pcb_board_id: "b1".into(),
            center: Point::default(),
            width: 10.0,
            height: 10.0,
            thickness: Some(0.8),
            outline: None,
        });
        assert_eq!(entities.effective_board_thickness(1.4), 0.8);
    }
}
