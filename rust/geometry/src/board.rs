// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board and panel solids
//!
//! A surface is its outline extruded to the board thickness, minus one
//! subtraction solid per hole and cutout. Geometry is built around the
//! surface center in circuit space, then mapped into the canonical Y-up
//! scene space.

use crate::csg::BooleanProcessor;
use crate::error::Result;
use crate::extrusion::{circle_points, extrude_polygon, rect_points, stadium_points, CIRCLE_SEGMENTS};
use crate::mesh::Mesh;
use crate::transform::TransformPreset;
use nalgebra::Point2;
use pcb_scene_core::{
    CircuitEntities, CutoutShape, HoleShape, PcbBoard, PcbCutout, PcbHole, PcbPanel,
    PcbPlatedHole, PlatedHoleShape, Point,
};

/// Outline of a surface, relative to its center
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    Rect { width: f64, height: f64 },
    Polygon(Vec<Point2<f64>>),
}

impl Outline {
    fn points(&self) -> Vec<Point2<f64>> {
        match self {
            Outline::Rect { width, height } => rect_points(Point2::origin(), *width, *height, 0.0),
            Outline::Polygon(points) => points.clone(),
        }
    }

    /// Outline of a board or panel record, relative to `center`
    pub fn from_record(width: f64, height: f64, outline: Option<&[Point]>, center: Point) -> Self {
        match outline {
            Some(points) if points.len() >= 3 => Outline::Polygon(
                points
                    .iter()
                    .map(|p| Point2::new(p.x - center.x, p.y - center.y))
                    .collect(),
            ),
            _ => Outline::Rect { width, height },
        }
    }
}

/// A region removed from a surface, relative to the surface center
#[derive(Debug, Clone, PartialEq)]
pub enum Subtraction {
    Circle { center: Point2<f64>, radius: f64 },
    Stadium { center: Point2<f64>, width: f64, height: f64 },
    Rect { center: Point2<f64>, width: f64, height: f64, rotation_deg: f64 },
    Polygon(Vec<Point2<f64>>),
}

impl Subtraction {
    fn points(&self) -> Vec<Point2<f64>> {
        match self {
            Subtraction::Circle { center, radius } => circle_points(*center, *radius, CIRCLE_SEGMENTS),
            Subtraction::Stadium { center, width, height } => {
                stadium_points(*center, *width, *height, CIRCLE_SEGMENTS)
            }
            Subtraction::Rect { center, width, height, rotation_deg } => {
                rect_points(*center, *width, *height, *rotation_deg)
            }
            Subtraction::Polygon(points) => points.clone(),
        }
    }

    /// Hole drill shape; `None` when the record carries no usable size
    pub fn from_hole(hole: &PcbHole, origin: Point) -> Option<Self> {
        let center = local(hole.x, hole.y, origin);
        match hole.hole_shape {
            HoleShape::Circle => {
                let diameter = hole.hole_diameter.or(hole.hole_width)?;
                circle(center, diameter)
            }
            HoleShape::Oval | HoleShape::Pill => {
                let (width, height) = slot_size(hole.hole_width, hole.hole_height, hole.hole_diameter)?;
                Some(Subtraction::Stadium { center, width, height })
            }
            HoleShape::Rect | HoleShape::Square => {
                let (width, height) = slot_size(hole.hole_width, hole.hole_height, hole.hole_diameter)?;
                Some(Subtraction::Rect { center, width, height, rotation_deg: 0.0 })
            }
        }
    }

    /// Drill of a plated hole (the plating ring is not removed)
    pub fn from_plated_hole(hole: &PcbPlatedHole, origin: Point) -> Option<Self> {
        let center = local(hole.x, hole.y, origin);
        match hole.shape {
            PlatedHoleShape::Circle | PlatedHoleShape::CircularHoleWithRectPad => {
                circle(center, hole.hole_diameter?)
            }
            PlatedHoleShape::Oval | PlatedHoleShape::Pill | PlatedHoleShape::PillHoleWithRectPad => {
                let (width, height) = slot_size(hole.hole_width, hole.hole_height, hole.hole_diameter)?;
                Some(Subtraction::Stadium { center, width, height })
            }
        }
    }

    pub fn from_cutout(cutout: &PcbCutout, origin: Point) -> Option<Self> {
        match &cutout.shape {
            CutoutShape::Rect { center, width, height, rotation } => {
                (*width > 0.0 && *height > 0.0).then(|| Subtraction::Rect {
                    center: local(center.x, center.y, origin),
                    width: *width,
                    height: *height,
                    rotation_deg: rotation.unwrap_or(0.0),
                })
            }
            CutoutShape::Circle { center, radius } => (*radius > 0.0).then(|| Subtraction::Circle {
                center: local(center.x, center.y, origin),
                radius: *radius,
            }),
            CutoutShape::Polygon { points } => (points.len() >= 3).then(|| {
                Subtraction::Polygon(points.iter().map(|p| local(p.x, p.y, origin)).collect())
            }),
        }
    }
}

fn local(x: f64, y: f64, origin: Point) -> Point2<f64> {
    Point2::new(x - origin.x, y - origin.y)
}

fn circle(center: Point2<f64>, diameter: f64) -> Option<Subtraction> {
    (diameter > 0.0).then(|| Subtraction::Circle { center, radius: diameter / 2.0 })
}

fn slot_size(width: Option<f64>, height: Option<f64>, diameter: Option<f64>) -> Option<(f64, f64)> {
    let width = width.or(diameter)?;
    let height = height.or(diameter).unwrap_or(width);
    (width > 0.0 && height > 0.0).then_some((width, height))
}

/// Extrude `outline` to `thickness` and subtract every region in one difference.
///
/// The result is centered on the surface center in canonical Y-up space.
pub fn build_solid(outline: &Outline, thickness: f64, subtractions: &[Subtraction]) -> Result<Mesh> {
    build_solid_with(&BooleanProcessor::new(), outline, thickness, subtractions)
}

pub fn build_solid_with(
    processor: &BooleanProcessor,
    outline: &Outline,
    thickness: f64,
    subtractions: &[Subtraction],
) -> Result<Mesh> {
    let half = thickness / 2.0;
    let slab = extrude_polygon(&outline.points(), -half, half)?;

    let solid = if subtractions.is_empty() {
        slab
    } else {
        // Cutters overshoot both faces so no face is coplanar with the slab
        let cutters = subtractions
            .iter()
            .map(|s| extrude_polygon(&s.points(), -thickness, thickness))
            .collect::<Result<Vec<_>>>()?;
        processor.subtract_all(&slab, &cutters)?
    };

    Ok(TransformPreset::ZUpToYUp.config().apply(&solid))
}

/// A built board or panel and the size it declared
#[derive(Debug, Clone)]
pub struct SurfaceSolid {
    pub mesh: Mesh,
    pub declared_width: f64,
    pub declared_height: f64,
    pub thickness: f64,
}

impl SurfaceSolid {
    /// Width/height of the built mesh, or the declared size when the mesh
    /// extents are not finite (degenerate geometry)
    pub fn effective_size(&self) -> (f64, f64) {
        let size = self.mesh.bounding_box.size();
        if size.x.is_finite() && size.z.is_finite() {
            (size.x, size.z)
        } else {
            (self.declared_width, self.declared_height)
        }
    }
}

/// Build one board: its own and unscoped holes, its own cutouts, and the
/// unscoped cutouts when the design has no panel
pub fn build_board_solid(entities: &CircuitEntities, board: &PcbBoard, thickness: f64) -> Result<SurfaceSolid> {
    let origin = board.center;
    let subtractions: Vec<Subtraction> = entities
        .board_holes(&board.pcb_board_id)
        .filter_map(|h| Subtraction::from_hole(h, origin))
        .chain(
            entities
                .board_plated_holes(&board.pcb_board_id)
                .filter_map(|h| Subtraction::from_plated_hole(h, origin)),
        )
        .chain(
            entities
                .board_cutouts(&board.pcb_board_id)
                .filter_map(|c| Subtraction::from_cutout(c, origin)),
        )
        .collect();

    tracing::debug!(
        board = %board.pcb_board_id,
        subtractions = subtractions.len(),
        "Building board solid"
    );

    let outline = Outline::from_record(board.width, board.height, board.outline.as_deref(), origin);
    Ok(SurfaceSolid {
        mesh: build_solid(&outline, thickness, &subtractions)?,
        declared_width: board.width,
        declared_height: board.height,
        thickness,
    })
}

/// Build the panel: unscoped holes and unscoped (panel-level) cutouts only
pub fn build_panel_solid(entities: &CircuitEntities, panel: &PcbPanel, thickness: f64) -> Result<SurfaceSolid> {
    let origin = panel.center;
    let subtractions: Vec<Subtraction> = entities
        .panel_holes()
        .filter_map(|h| Subtraction::from_hole(h, origin))
        .chain(
            entities
                .panel_plated_holes()
                .filter_map(|h| Subtraction::from_plated_hole(h, origin)),
        )
        .chain(
            entities
                .panel_cutouts()
                .filter_map(|c| Subtraction::from_cutout(c, origin)),
        )
        .collect();

    tracing::debug!(
        panel = %panel.pcb_panel_id,
        subtractions = subtractions.len(),
        "Building panel solid"
    );

    let outline = Outline::from_record(panel.width, panel.height, panel.outline.as_deref(), origin);
    Ok(SurfaceSolid {
        mesh: build_solid(&outline, thickness, &subtractions)?,
        declared_width: panel.width,
        declared_height: panel.height,
        thickness,
    })
}
