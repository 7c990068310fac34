// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Hierarchical cluster tree (C7): `cell_index → connected-clusters-of-that-cell`,
//! plus `return_to_hierarchy` (SUPPLEMENT C11).

use crate::cluster::arena::ClusterId;
use crate::cluster::connected::ConnectedClusters;
use crate::connectivity::GlobalNetId;
use crate::geometry::ShapeVariant;
use crate::layout_model::{AttributeId, CellIndex};
use fnv::FnvHashMap;
use iron_shapes::CoordinateType;
use std::hash::Hash;

/// The whole hierarchical cluster network, produced by [`crate::cluster::hier_builder::build`].
pub struct HierClusters<C, S> {
    per_cell: FnvHashMap<CellIndex, ConnectedClusters<C, S>>,
    global_net_members: FnvHashMap<GlobalNetId, Vec<(CellIndex, ClusterId)>>,
}

impl<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>> Default for HierClusters<C, S> {
    fn default() -> Self {
        HierClusters { per_cell: FnvHashMap::default(), global_net_members: FnvHashMap::default() }
    }
}

impl<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>> HierClusters<C, S> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `(cell_index, cluster_id)` carries a global-net attachment
    /// (§4.3 Step E). Global nets are not physically merged across cells —
    /// cluster identity stays cell-local — this index is how a caller learns
    /// that two clusters anywhere in the hierarchy are electrically identical
    /// by virtue of a shared global net, without flattening the hierarchy.
    pub(crate) fn note_global_net(&mut self, net: GlobalNetId, cell_index: CellIndex, cluster_id: ClusterId) {
        let members = self.global_net_members.entry(net).or_default();
        if !members.contains(&(cell_index, cluster_id)) {
            members.push((cell_index, cluster_id));
        }
    }

    /// Every `(cell_index, cluster_id)` attached to `net`, anywhere in the hierarchy.
    pub fn global_net_members(&self, net: GlobalNetId) -> &[(CellIndex, ClusterId)] {
        self.global_net_members.get(&net).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every global net with at least one member anywhere in the hierarchy.
    pub fn global_nets(&self) -> impl Iterator<Item = GlobalNetId> + '_ {
        self.global_net_members.keys().copied()
    }

    /// Read-only access to one cell's connected clusters (§6 "Produced").
    pub fn clusters_per_cell(&self, cell_index: CellIndex) -> Option<&ConnectedClusters<C, S>> {
        self.per_cell.get(&cell_index)
    }

    /// Mutable access, used internally by the hierarchical builder.
    pub(crate) fn clusters_per_cell_mut(&mut self, cell_index: CellIndex) -> &mut ConnectedClusters<C, S> {
        self.per_cell.entry(cell_index).or_insert_with(ConnectedClusters::new)
    }

    /// Iterate over every cell with at least one cluster.
    pub fn cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        self.per_cell.keys().copied()
    }

    /// Discard all state, e.g. before a fresh `build`.
    pub fn clear(&mut self) {
        self.per_cell.clear();
        self.global_net_members.clear();
    }

    /// Walk every root cluster of every cell and hand its member shapes, with
    /// their accumulated transform, to `sink` — one net at a time, materialized
    /// on the cell the root cluster lives in. `sink` decides which output layer
    /// a net's shapes land on; this crate does not dictate a layer-mapping
    /// policy (SUPPLEMENT C11).
    pub fn return_to_hierarchy(&self, sink: &mut dyn NetShapeSink<C, S>) {
        for (&cell_index, connected) in &self.per_cell {
            for (cluster_id, _) in connected.iter() {
                if !connected.is_root(cluster_id) {
                    continue;
                }
                let shapes = crate::cluster::iter::collect_cluster_shapes(self, cell_index, cluster_id);
                for (layer, shape, attr) in shapes {
                    sink.receive(cell_index, cluster_id, layer, shape, attr);
                }
            }
        }
    }
}

/// The output side of `return_to_hierarchy`: the host layout decides where a
/// net's re-materialized shapes go.
pub trait NetShapeSink<C, S> {
    /// Receive one shape belonging to `(cell_index, cluster_id)`'s net, already
    /// expressed in `cell_index`'s own coordinate frame.
    fn receive(&mut self, cell_index: CellIndex, cluster_id: ClusterId, layer: crate::connectivity::LayerId, shape: S, attr: AttributeId);
}
