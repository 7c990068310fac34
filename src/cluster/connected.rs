// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Connected clusters (per cell): a local-cluster set extended with outbound
//! connections into child-cell instances, per §3 "Connected clusters".

use crate::cluster::arena::{ClusterArena, ClusterId};
use crate::cluster::local::LocalCluster;
use crate::geometry::ShapeVariant;
use crate::layout_model::{CellIndex, PropertyId};
use fnv::{FnvHashMap, FnvHashSet};
use iron_shapes::CoordinateType;
use std::hash::Hash;

/// A typed reference naming "the cluster with id `cluster_id` that lives in
/// `child_cell`, as inserted into the parent cell by `trans`, carrying
/// `property_id`" (§3 "Cluster instance"). Equality is by the full quadruple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterInstanceRef<C> {
    /// The referenced cluster's id, local to `child_cell`.
    pub cluster_id: ClusterId,
    /// The child cell the referenced cluster lives in.
    pub child_cell: CellIndex,
    /// The instance transform placing the child cell into the parent.
    pub trans: crate::geometry::Transform<C>,
    /// The property id carried by the originating instance.
    pub property_id: PropertyId,
}

/// Local clusters of one cell plus their outbound connections into child cells.
pub struct ConnectedClusters<C, S> {
    clusters: ClusterArena<LocalCluster<C, S>>,
    outbound: FnvHashMap<ClusterId, Vec<ClusterInstanceRef<C>>>,
    reverse: FnvHashMap<ClusterInstanceRef<C>, ClusterId>,
    non_root: FnvHashSet<ClusterId>,
}

impl<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>> Default for ConnectedClusters<C, S> {
    fn default() -> Self {
        ConnectedClusters {
            clusters: ClusterArena::new(),
            outbound: FnvHashMap::default(),
            reverse: FnvHashMap::default(),
            non_root: FnvHashSet::default(),
        }
    }
}

impl<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>> ConnectedClusters<C, S> {
    /// Create an empty connected-clusters set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new local cluster, returning its id.
    pub fn insert_cluster(&mut self, cluster: LocalCluster<C, S>) -> ClusterId {
        self.clusters.insert(cluster)
    }

    /// Allocate a new empty ("dummy") cluster.
    pub fn insert_dummy(&mut self) -> ClusterId {
        self.clusters.insert(LocalCluster::empty())
    }

    /// Borrow a cluster by id.
    pub fn cluster(&self, id: ClusterId) -> Option<&LocalCluster<C, S>> {
        self.clusters.get(id)
    }

    /// Mutably borrow a cluster by id.
    pub fn cluster_mut(&mut self, id: ClusterId) -> Option<&mut LocalCluster<C, S>> {
        self.clusters.get_mut(id)
    }

    /// Iterate over every (id, cluster) still present.
    pub fn iter(&self) -> impl Iterator<Item = (ClusterId, &LocalCluster<C, S>)> {
        self.clusters.iter()
    }

    /// The highest cluster id ever allocated in this cell.
    pub fn max_id(&self) -> Option<ClusterId> {
        self.clusters.max_id()
    }

    /// Add an outbound connection from `id` to `ci`, and record it in the
    /// reverse map. Idempotent if the exact same connection is added twice.
    pub fn add_connection(&mut self, id: ClusterId, ci: ClusterInstanceRef<C>) {
        let list = self.outbound.entry(id).or_default();
        if !list.contains(&ci) {
            list.push(ci);
        }
        self.reverse.insert(ci, id);
    }

    /// Outbound connections of `id`.
    pub fn outbound(&self, id: ClusterId) -> &[ClusterInstanceRef<C>] {
        self.outbound.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The local cluster id a given cluster-instance reference has already
    /// been promoted to in this cell, if any (§4.4 "if the reverse map of
    /// `parent_cell` already contains `ci`, return its mapped id").
    pub fn promoted_id_of(&self, ci: &ClusterInstanceRef<C>) -> Option<ClusterId> {
        self.reverse.get(ci).copied()
    }

    /// Merge `b`'s outbound connections and member shapes into `a`, then empty
    /// `b`'s slot. Used by the weighted-union tie-break in `connect_clusters`
    /// (§4.4) and by same-cell `join_cluster_with`.
    pub fn join_cluster_with(&mut self, a: ClusterId, b: ClusterId) {
        if a == b {
            return;
        }
        if let Some(removed) = self.clusters.remove(b) {
            if let Some(target) = self.clusters.get_mut(a) {
                target.merge_from(removed);
            }
        }
        if let Some(b_outbound) = self.outbound.remove(&b) {
            let a_outbound = self.outbound.entry(a).or_default();
            for ci in b_outbound {
                if !a_outbound.contains(&ci) {
                    a_outbound.push(ci);
                }
                self.reverse.insert(ci, a);
            }
        }
        if self.non_root.remove(&b) {
            self.non_root.insert(a);
        }
    }

    /// Empty a cluster's member shapes and connections without deallocating
    /// its id (§3 "`remove_cluster` empties a cluster but keeps its slot").
    pub fn remove_cluster(&mut self, id: ClusterId) {
        self.clusters.remove(id);
        self.outbound.remove(&id);
    }

    /// Mark `id` as non-root: some parent cell has promoted it upward.
    pub fn mark_non_root(&mut self, id: ClusterId) {
        self.non_root.insert(id);
    }

    /// `true` iff no parent cell has ever promoted `id` upward.
    pub fn is_root(&self, id: ClusterId) -> bool {
        !self.non_root.contains(&id)
    }

    /// Every outbound connection recorded in this cell that points into
    /// `child_cell`, as `(local cluster id, cluster-instance reference)`
    /// pairs — the raw material for the incoming-connections index (§4.6),
    /// which is this relation inverted and grouped by the referenced child
    /// cluster.
    pub fn connections_into(&self, child_cell: CellIndex) -> Vec<(ClusterId, ClusterInstanceRef<C>)> {
        self.reverse.iter().filter(|(ci, _)| ci.child_cell == child_cell).map(|(ci, id)| (*id, *ci)).collect()
    }

    /// Discard all clusters and connections, e.g. before a fresh `build`.
    pub fn clear(&mut self) {
        self.clusters.clear();
        self.outbound.clear();
        self.reverse.clear();
        self.non_root.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NetShape;
    use crate::index::IndexGenerator;

    #[test]
    fn join_cluster_with_merges_and_frees_slot() {
        let mut cc: ConnectedClusters<i32, NetShape<i32>> = ConnectedClusters::new();
        let a = cc.insert_dummy();
        let b = cc.insert_dummy();
        cc.join_cluster_with(a, b);
        assert!(cc.cluster(b).is_none());
        assert!(cc.cluster(a).is_some());
    }

    #[test]
    fn new_clusters_are_root_until_marked_otherwise() {
        let mut cc: ConnectedClusters<i32, NetShape<i32>> = ConnectedClusters::new();
        let a = cc.insert_dummy();
        assert!(cc.is_root(a));
        cc.mark_non_root(a);
        assert!(!cc.is_root(a));
    }

    #[test]
    fn outbound_connections_round_trip_through_reverse_map() {
        let mut cc: ConnectedClusters<i32, NetShape<i32>> = ConnectedClusters::new();
        let mut cell_gen = IndexGenerator::<crate::layout_model::CellMarker>::default();
        let child = cell_gen.next();
        let a = cc.insert_dummy();
        let child_cluster_id = cc.insert_dummy();
        let ci = ClusterInstanceRef {
            cluster_id: child_cluster_id,
            child_cell: child,
            trans: crate::geometry::Transform::identity(),
            property_id: crate::index::IndexGenerator::<crate::layout_model::PropertyMarker>::default().next(),
        };
        cc.add_connection(a, ci);
        assert_eq!(cc.promoted_id_of(&ci), Some(a));
        assert_eq!(cc.outbound(a).len(), 1);
    }
}
