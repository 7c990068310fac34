// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Incoming-connections index (§4.6, auxiliary): the inverse of the
//! outbound-connection relation, built lazily and cached one cell at a time.
//!
//! `ConnectedClusters` only records outbound connections (parent cluster →
//! child cluster-instance); answering "who promotes cluster X of cell Y" means
//! scanning every parent of `Y` for a connection that points back into it.
//! This is cheap to do once per cell and reuse, so results are cached per
//! `CellIndex` rather than per `(CellIndex, ClusterId)` — a lookup for one
//! cluster in a cell builds (and keeps) the whole cell's incoming map.

use crate::cluster::arena::ClusterId;
use crate::cluster::connected::ClusterInstanceRef;
use crate::cluster::tree::HierClusters;
use crate::geometry::ShapeVariant;
use crate::layout_model::{CellIndex, LayoutIndex};
use fnv::FnvHashMap;
use iron_shapes::CoordinateType;
use std::cell::RefCell;
use std::hash::Hash;

/// One incoming connection: the parent cell and cluster that promoted a
/// child cluster upward, plus the exact cluster-instance reference recorded
/// for that promotion.
pub type IncomingConnection<C> = (CellIndex, ClusterId, ClusterInstanceRef<C>);

/// Lazily computed, per-cell-cached view of a [`HierClusters`] network's
/// incoming connections.
pub struct IncomingIndex<'a, C, S, L> {
    hier: &'a HierClusters<C, S>,
    layout: &'a L,
    cache: RefCell<FnvHashMap<CellIndex, FnvHashMap<ClusterId, Vec<IncomingConnection<C>>>>>,
}

impl<'a, C, S, L> IncomingIndex<'a, C, S, L>
where
    C: CoordinateType + Hash + Eq,
    S: ShapeVariant<C>,
    L: LayoutIndex<C, S>,
{
    /// Wrap a finished hierarchical cluster network for incoming-connection queries.
    pub fn new(hier: &'a HierClusters<C, S>, layout: &'a L) -> Self {
        IncomingIndex { hier, layout, cache: RefCell::new(FnvHashMap::default()) }
    }

    /// Every parent-cell/parent-cluster that has promoted `(cell_index, cluster_id)`
    /// upward, empty if the cluster is a root everywhere it is reached from.
    pub fn incoming(&self, cell_index: CellIndex, cluster_id: ClusterId) -> Vec<IncomingConnection<C>> {
        self.ensure_built(cell_index);
        self.cache.borrow().get(&cell_index).and_then(|by_cluster| by_cluster.get(&cluster_id)).cloned().unwrap_or_default()
    }

    /// Discard cached results, e.g. after the underlying `HierClusters` changes.
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    fn ensure_built(&self, cell_index: CellIndex) {
        if self.cache.borrow().contains_key(&cell_index) {
            return;
        }
        let mut by_cluster: FnvHashMap<ClusterId, Vec<IncomingConnection<C>>> = FnvHashMap::default();
        for parent in self.layout.parents_of(cell_index) {
            let connected = match self.hier.clusters_per_cell(parent.parent_cell) {
                Some(c) => c,
                None => continue,
            };
            for (parent_cluster_id, ci) in connected.connections_into(cell_index) {
                by_cluster.entry(ci.cluster_id).or_default().push((parent.parent_cell, parent_cluster_id, ci));
            }
        }
        self.cache.borrow_mut().insert(cell_index, by_cluster);
    }
}
