// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Recursive cluster iterators (C10): walk a net across every instantiation
//! path it reaches, yielding shapes (or just structural addresses) with the
//! accumulated transform. Realized with an explicit stack of
//! `(cell, outbound_iter_begin, outbound_iter_end, transform)` frames per §9
//! Design Notes, since Rust has no generators on stable.

use crate::cluster::arena::ClusterId;
use crate::cluster::connected::ClusterInstanceRef;
use crate::cluster::tree::HierClusters;
use crate::connectivity::LayerId;
use crate::geometry::{ShapeVariant, Transform};
use crate::layout_model::{AttributeId, CellIndex};
use iron_shapes::CoordinateType;
use std::hash::Hash;

struct Frame<C, S> {
    cell_index: CellIndex,
    cluster_id: ClusterId,
    transform: Transform<C>,
    shapes: Vec<(LayerId, S, AttributeId)>,
    shape_cursor: usize,
    outbound: Vec<ClusterInstanceRef<C>>,
    outbound_cursor: usize,
}

/// Yields `(layer, shape, attribute_id)` triples of one net, across every
/// instantiation path it reaches, with the shape already expressed in the
/// iterator's root cell's coordinate frame.
pub struct RecursiveClusterShapeIterator<'a, C, S> {
    hier: &'a HierClusters<C, S>,
    layer_filter: Option<LayerId>,
    should_visit: Option<Box<dyn Fn(CellIndex) -> bool + 'a>>,
    stack: Vec<Frame<C, S>>,
}

impl<'a, C: CoordinateType + Hash + Eq, S: ShapeVariant<C>> RecursiveClusterShapeIterator<'a, C, S> {
    /// Start a traversal rooted at `(cell_index, cluster_id)`, optionally
    /// restricted to shapes on one layer.
    pub fn new(hier: &'a HierClusters<C, S>, cell_index: CellIndex, cluster_id: ClusterId, layer_filter: Option<LayerId>) -> Self {
        let mut it = RecursiveClusterShapeIterator { hier, layer_filter, should_visit: None, stack: Vec::new() };
        it.push_frame(cell_index, cluster_id, Transform::identity());
        it
    }

    /// Install a callback that can skip entire sub-hierarchies by cell index.
    pub fn with_should_visit(mut self, f: impl Fn(CellIndex) -> bool + 'a) -> Self {
        self.should_visit = Some(Box::new(f));
        self
    }

    /// The list of cluster-instances from the root cell to the current frame,
    /// i.e. the hierarchical address of whatever will be yielded next.
    pub fn inst_path(&self) -> Vec<(CellIndex, ClusterId)> {
        self.stack.iter().map(|f| (f.cell_index, f.cluster_id)).collect()
    }

    fn push_frame(&mut self, cell_index: CellIndex, cluster_id: ClusterId, transform: Transform<C>) {
        let shapes = self
            .hier
            .clusters_per_cell(cell_index)
            .and_then(|cc| cc.cluster(cluster_id))
            .map(|cluster| {
                cluster
                    .layers()
                    .filter(|l| self.layer_filter.map_or(true, |want| *l == want))
                    .flat_map(|l| cluster.shapes(l).iter().map(move |(s, a)| (l, s.clone(), *a)))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let outbound = self
            .hier
            .clusters_per_cell(cell_index)
            .map(|cc| cc.outbound(cluster_id).to_vec())
            .unwrap_or_default();
        self.stack.push(Frame { cell_index, cluster_id, transform, shapes, shape_cursor: 0, outbound, outbound_cursor: 0 });
    }
}

impl<'a, C: CoordinateType + Hash + Eq, S: ShapeVariant<C>> Iterator for RecursiveClusterShapeIterator<'a, C, S> {
    type Item = (LayerId, S, AttributeId);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            if top.shape_cursor < top.shapes.len() {
                let (layer, shape, attr) = top.shapes[top.shape_cursor].clone();
                top.shape_cursor += 1;
                let placed = shape.transformed_by(&top.transform);
                return Some((layer, placed, attr));
            }
            if top.outbound_cursor < top.outbound.len() {
                let ci = top.outbound[top.outbound_cursor];
                top.outbound_cursor += 1;
                if let Some(should_visit) = &self.should_visit {
                    if !should_visit(ci.child_cell) {
                        continue;
                    }
                }
                let child_transform = top.transform.then(&ci.trans);
                self.push_frame(ci.child_cell, ci.cluster_id, child_transform);
                continue;
            }
            self.stack.pop();
            if self.stack.is_empty() {
                return None;
            }
        }
    }
}

struct StructuralFrame<C> {
    cell_index: CellIndex,
    cluster_id: ClusterId,
    transform: Transform<C>,
    outbound: Vec<ClusterInstanceRef<C>>,
    outbound_cursor: usize,
    yielded_self: bool,
}

/// Yields `(cell_index, cluster_id, inst_path)` without materializing shapes,
/// used to enumerate all cells a net enters.
pub struct StructuralClusterIterator<'a, C, S> {
    hier: &'a HierClusters<C, S>,
    should_visit: Option<Box<dyn Fn(CellIndex) -> bool + 'a>>,
    stack: Vec<StructuralFrame<C>>,
}

impl<'a, C: CoordinateType + Hash + Eq, S: ShapeVariant<C>> StructuralClusterIterator<'a, C, S> {
    /// Start a structural traversal rooted at `(cell_index, cluster_id)`.
    pub fn new(hier: &'a HierClusters<C, S>, cell_index: CellIndex, cluster_id: ClusterId) -> Self {
        let outbound = hier.clusters_per_cell(cell_index).map(|cc| cc.outbound(cluster_id).to_vec()).unwrap_or_default();
        let frame = StructuralFrame { cell_index, cluster_id, transform: Transform::identity(), outbound, outbound_cursor: 0, yielded_self: false };
        StructuralClusterIterator { hier, should_visit: None, stack: vec![frame] }
    }

    /// Install a callback that can skip entire sub-hierarchies by cell index.
    pub fn with_should_visit(mut self, f: impl Fn(CellIndex) -> bool + 'a) -> Self {
        self.should_visit = Some(Box::new(f));
        self
    }
}

impl<'a, C: CoordinateType + Hash + Eq, S: ShapeVariant<C>> Iterator for StructuralClusterIterator<'a, C, S> {
    type Item = (CellIndex, ClusterId, Vec<(CellIndex, ClusterId)>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            if !top.yielded_self {
                top.yielded_self = true;
                let cell_index = top.cell_index;
                let cluster_id = top.cluster_id;
                let path: Vec<_> = self.stack.iter().map(|f| (f.cell_index, f.cluster_id)).collect();
                return Some((cell_index, cluster_id, path));
            }
            if top.outbound_cursor < top.outbound.len() {
                let ci = top.outbound[top.outbound_cursor];
                top.outbound_cursor += 1;
                if let Some(should_visit) = &self.should_visit {
                    if !should_visit(ci.child_cell) {
                        continue;
                    }
                }
                let child_transform = top.transform.then(&ci.trans);
                let outbound = self.hier.clusters_per_cell(ci.child_cell).map(|cc| cc.outbound(ci.cluster_id).to_vec()).unwrap_or_default();
                self.stack.push(StructuralFrame {
                    cell_index: ci.child_cell,
                    cluster_id: ci.cluster_id,
                    transform: child_transform,
                    outbound,
                    outbound_cursor: 0,
                    yielded_self: false,
                });
                continue;
            }
            self.stack.pop();
            if self.stack.is_empty() {
                return None;
            }
        }
    }
}

/// Collect every `(layer, shape, attribute_id)` triple of a net, used by
/// `HierClusters::return_to_hierarchy`.
pub fn collect_cluster_shapes<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>>(
    hier: &HierClusters<C, S>,
    cell_index: CellIndex,
    cluster_id: ClusterId,
) -> Vec<(LayerId, S, AttributeId)> {
    RecursiveClusterShapeIterator::new(hier, cell_index, cluster_id, None).collect()
}
