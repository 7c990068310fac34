// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `MemLayout`: an in-memory reference implementation of the consumed layout
//! traits, used by the integration tests and by `DESIGN.md`'s worked examples.
//! Not part of the production surface — a real host supplies its own layout.

use crate::connectivity::LayerId;
use crate::geometry::ShapeVariant;
use crate::layout_model::{AttributeId, CellAccess, CellIndex, CellInstance, LayoutIndex};
use crate::layout_model::ParentInstance;
use fnv::FnvHashMap;
use iron_shapes::prelude::Rect;
use iron_shapes::CoordinateType;

/// One cell's contents in a [`MemLayout`].
pub struct MemCell<C, S> {
    cell_index: CellIndex,
    shapes: FnvHashMap<LayerId, Vec<(S, AttributeId)>>,
    children: Vec<CellInstance<C>>,
}

impl<C: CoordinateType, S: ShapeVariant<C>> MemCell<C, S> {
    /// Create an empty cell with the given index.
    pub fn new(cell_index: CellIndex) -> Self {
        MemCell { cell_index, shapes: FnvHashMap::default(), children: Vec::new() }
    }

    /// Add a shape with its attribute id on `layer`.
    pub fn add_shape(&mut self, layer: LayerId, shape: S, attr: AttributeId) {
        self.shapes.entry(layer).or_default().push((shape, attr));
    }

    /// Add a child instance.
    pub fn add_instance(&mut self, inst: CellInstance<C>) {
        self.children.push(inst);
    }
}

impl<C: CoordinateType, S: ShapeVariant<C>> CellAccess<C, S> for MemCell<C, S> {
    fn cell_index(&self) -> CellIndex {
        self.cell_index
    }

    fn bbox(&self, layer: LayerId) -> Option<Rect<C>> {
        let shapes = self.shapes.get(&layer)?;
        let mut iter = shapes.iter();
        let first = iter.next()?.0.bbox();
        Some(iter.fold(first, |acc, (s, _)| acc.add_rect(&s.bbox())))
    }

    fn shapes(&self, layer: LayerId) -> Vec<(S, AttributeId)> {
        self.shapes.get(&layer).cloned().unwrap_or_default()
    }

    fn children(&self) -> Vec<CellInstance<C>> {
        self.children.clone()
    }

    fn begin_touching(&self, bbox: Rect<C>) -> Vec<CellInstance<C>> {
        self.children
            .iter()
            .filter(|inst| crate::geometry::predicates::bboxes_touch(&inst.trans.transform_rect(bbox), &bbox))
            .cloned()
            .collect()
    }
}

/// An in-memory layout: a flat vector of cells plus an explicit bottom-up order.
pub struct MemLayout<C, S> {
    cells: Vec<MemCell<C, S>>,
    order: Vec<CellIndex>,
    names: FnvHashMap<CellIndex, String>,
}

impl<C: CoordinateType, S: ShapeVariant<C>> Default for MemLayout<C, S> {
    fn default() -> Self {
        MemLayout { cells: Vec::new(), order: Vec::new(), names: FnvHashMap::default() }
    }
}

impl<C: CoordinateType, S: ShapeVariant<C>> MemLayout<C, S> {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell and return its index. Cells must be added in a valid
    /// bottom-up order (leaves first): the order of insertion becomes the
    /// layout's `bottom_up_order`.
    pub fn add_cell(&mut self, name: impl Into<String>) -> CellIndex {
        let index = crate::index::Index::new(self.cells.len());
        self.cells.push(MemCell::new(index));
        self.order.push(index);
        self.names.insert(index, name.into());
        index
    }

    /// Mutable access to a cell, for building up test fixtures.
    pub fn cell_mut(&mut self, index: CellIndex) -> &mut MemCell<C, S> {
        &mut self.cells[index.value()]
    }

    /// Parents of `child`: every cell whose children list instantiates it.
    pub fn parents_of(&self, child: CellIndex) -> Vec<ParentInstance<C>> {
        let mut out = Vec::new();
        for cell in &self.cells {
            for inst in &cell.children {
                if inst.cell_index == child {
                    out.push(ParentInstance { parent_cell: cell.cell_index, instance: inst.clone() });
                }
            }
        }
        out
    }
}

impl<C: CoordinateType, S: ShapeVariant<C>> LayoutIndex<C, S> for MemLayout<C, S> {
    type Cell = MemCell<C, S>;

    fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn cell_by_index(&self, index: CellIndex) -> Option<&Self::Cell> {
        self.cells.get(index.value())
    }

    fn bottom_up_order(&self) -> Vec<CellIndex> {
        self.order.clone()
    }

    fn parents_of(&self, cell: CellIndex) -> Vec<ParentInstance<C>> {
        self.parents_of(cell)
    }

    fn cell_name(&self, index: CellIndex) -> String {
        self.names.get(&index).cloned().unwrap_or_else(|| format!("cell#{}", index.value()))
    }
}
