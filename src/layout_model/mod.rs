// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SUPPLEMENT (C0): the layout collaborator the engine consumes but never owns.
//! `original_source/` makes clear the engine is generic over a `db::Layout`-like
//! object; §6 of the distilled spec describes it only in prose. This module turns
//! that prose into the traits the rest of the crate is generic over, plus one
//! in-memory reference implementation (`mem::MemLayout`) used by the test suite.

pub mod mem;

use crate::connectivity::LayerId;
use crate::geometry::{ShapeVariant, Transform};
use crate::index::Index;
use iron_shapes::prelude::Rect;
use iron_shapes::CoordinateType;

/// Marker type for [`Index`] over cells.
#[derive(Debug)]
pub struct CellMarker;

/// A cell identifier, stable for the lifetime of a layout.
pub type CellIndex = Index<CellMarker>;

/// Marker type for [`Index`] over instance-carried properties.
#[derive(Debug)]
pub struct PropertyMarker;

/// A property identifier attached to an instance or shape (0 = "none").
pub type PropertyId = Index<PropertyMarker>;

/// An attribute id carried by a shape (0 = "none"), per §3.
pub type AttributeId = u32;

/// Regular array replication of an instance: `row_count` x `col_count` copies,
/// stepped by `row_vector`/`col_vector` respectively.
#[derive(Debug, Clone, Copy)]
pub struct Repetition<C> {
    /// Number of rows.
    pub row_count: usize,
    /// Number of columns.
    pub col_count: usize,
    /// Displacement between consecutive rows, expressed as a point offset.
    pub row_vector: iron_shapes::prelude::Point<C>,
    /// Displacement between consecutive columns, expressed as a point offset.
    pub col_vector: iron_shapes::prelude::Point<C>,
}

/// A placement of a child cell inside a parent cell (§3 "Instance").
#[derive(Debug, Clone)]
pub struct CellInstance<C> {
    /// The instantiated child cell.
    pub cell_index: CellIndex,
    /// The base placement transform (iteration index 0 of the array, if any).
    pub trans: Transform<C>,
    /// `Some` for a regular array instance, `None` for a single placement.
    pub repetition: Option<Repetition<C>>,
    /// The property id carried by this instance placement.
    pub property_id: PropertyId,
}

impl<C: CoordinateType> CellInstance<C> {
    /// `true` if this instance is a regular array with more than one element.
    pub fn is_iterated_array(&self) -> bool {
        matches!(&self.repetition, Some(r) if r.row_count * r.col_count > 1)
    }

    /// The number of placed array elements (1 for a simple instance).
    pub fn size(&self) -> usize {
        self.repetition.as_ref().map(|r| r.row_count * r.col_count).unwrap_or(1)
    }

    /// The absolute transform of array element `iteration_index` (row-major).
    pub fn complex_trans(&self, iteration_index: usize) -> Transform<C> {
        match &self.repetition {
            None => self.trans,
            Some(r) => {
                let row = C::from(iteration_index / r.col_count).unwrap();
                let col = C::from(iteration_index % r.col_count).unwrap();
                let [rx, ry]: [C; 2] = r.row_vector.into();
                let [cx, cy]: [C; 2] = r.col_vector.into();
                let disp = iron_shapes::prelude::Point::from((rx * row + cx * col, ry * row + cy * col));
                let step = Transform::displacement(disp);
                self.trans.then(&step)
            }
        }
    }

    /// Array elements (iteration index + absolute transform) whose placement
    /// transform displacement falls within `bbox` of the instance's own child cell
    /// bounding box. A simplified, in-memory-friendly stand-in for the streaming
    /// `begin_touching` the original exposes.
    pub fn elements_in_box(&self, bbox: Rect<C>, child_bbox: Rect<C>) -> Vec<(usize, Transform<C>)> {
        (0..self.size())
            .map(|i| (i, self.complex_trans(i)))
            .filter(|(_, t)| crate::geometry::predicates::bboxes_touch(&t.transform_rect(child_bbox), &bbox))
            .collect()
    }
}

/// An instance as seen from one of the child cell's parents: which parent cell,
/// and the instance placing the child there.
#[derive(Debug, Clone)]
pub struct ParentInstance<C> {
    /// The parent cell index.
    pub parent_cell: CellIndex,
    /// The instance, in the parent's coordinate frame, that places the child here.
    pub instance: CellInstance<C>,
}

/// One cell's contents, as handed to the engine (§6 "Consumed from the layout collaborator").
pub trait CellAccess<C: CoordinateType, S: ShapeVariant<C>> {
    /// This cell's stable index.
    fn cell_index(&self) -> CellIndex;

    /// Bounding box of all shapes on `layer` in this cell, if any.
    fn bbox(&self, layer: LayerId) -> Option<Rect<C>>;

    /// Shapes on `layer`, each with its attribute id.
    fn shapes(&self, layer: LayerId) -> Vec<(S, AttributeId)>;

    /// All child instances of this cell.
    fn children(&self) -> Vec<CellInstance<C>>;

    /// Child instances whose bounding box touches `bbox`.
    fn begin_touching(&self, bbox: Rect<C>) -> Vec<CellInstance<C>>;
}

/// The layout collaborator itself (§6 "cell_count, cell_by_index").
pub trait LayoutIndex<C: CoordinateType, S: ShapeVariant<C>> {
    /// The concrete cell type this layout hands out.
    type Cell: CellAccess<C, S>;

    /// The number of cells in the layout.
    fn cell_count(&self) -> usize;

    /// Look up a cell by its index.
    fn cell_by_index(&self, index: CellIndex) -> Option<&Self::Cell>;

    /// A valid topological (bottom-up) order of the cell DAG.
    fn bottom_up_order(&self) -> Vec<CellIndex>;

    /// Every placement of `cell` inside a parent (§6 "parents() → iterator<Instance-from-parent>").
    fn parents_of(&self, cell: CellIndex) -> Vec<ParentInstance<C>>;

    /// Human-readable name of a cell, used only for diagnostics (§7 "errors carry
    /// the offending cell name").
    fn cell_name(&self, index: CellIndex) -> String {
        format!("cell#{}", index.value())
    }
}
