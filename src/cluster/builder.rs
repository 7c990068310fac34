// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Local clustering builder (C5, §4.2): partitions one cell's shapes into
//! local clusters using a 2-D box scanner plus weighted union-find.

use crate::box_scanner::BoxScanner;
use crate::cluster::connected::ConnectedClusters;
use crate::cluster::local::LocalCluster;
use crate::connectivity::{Connectivity, LayerId};
use crate::geometry::ShapeVariant;
use crate::layout_model::AttributeId;
use crate::union_find::UnionFind;
use fnv::FnvHashMap;
use iron_shapes::CoordinateType;
use std::hash::Hash;

/// Maps an attribute id to the representative of its equivalence class, used
/// to force-join clusters carrying equivalent labels (§4.2 step 5, §6
/// "attribute_equivalence"). The identity mapping (every attribute its own
/// class) means "no equivalence beyond exact attribute-id equality".
pub trait AttributeEquivalence {
    /// The equivalence-class representative of `attr`.
    fn representative(&self, attr: AttributeId) -> AttributeId;
}

impl AttributeEquivalence for () {
    fn representative(&self, attr: AttributeId) -> AttributeId {
        attr
    }
}

/// Build local clusters for one cell's shapes (§4.2).
///
/// `separate_attributes`: if true, two shapes carrying distinct nonzero
/// attribute ids never merge even if they geometrically interact.
///
/// The attribute-equivalence force-join (§4.2 step 5) and the global-net
/// unification (§4.2 step 3) are both folded into the same union-find pass as
/// the geometric merges, rather than run as a separate post-pass over
/// materialized clusters: joining shape-level representatives before
/// materializing produces the same partition as joining clusters afterward,
/// for less bookkeeping.
pub fn build_local_clusters<C, S>(
    shapes: Vec<(LayerId, S, AttributeId)>,
    connectivity: &Connectivity,
    separate_attributes: bool,
    attribute_equivalence: Option<&dyn AttributeEquivalence>,
) -> ConnectedClusters<C, S>
where
    C: CoordinateType + Hash + Eq,
    S: ShapeVariant<C>,
{
    let n = shapes.len();
    let mut uf = UnionFind::new(n);
    // Soft (rectifying) touches never union; collected here as raw shape
    // indices and resolved to cluster ids after `uf` settles, then recorded
    // as annotations rather than merges (§9 Design Notes).
    let mut soft_shape_pairs: Vec<(usize, usize)> = Vec::new();

    if n > 0 {
        let entries: Vec<(usize, iron_shapes::prelude::Rect<C>)> = shapes.iter().enumerate().map(|(i, (_, s, _))| (i, s.bbox())).collect();
        let scanner = BoxScanner::build(entries);
        let identity = crate::geometry::Transform::identity();
        for (i, j) in scanner.touching_pairs() {
            let (layer_i, shape_i, attr_i) = &shapes[i];
            let (layer_j, shape_j, attr_j) = &shapes[j];
            if separate_attributes && *attr_i != 0 && *attr_j != 0 && attr_i != attr_j {
                continue;
            }
            if connectivity.interacts(shape_i, *layer_i, shape_j, *layer_j, &identity) {
                uf.union(i, j);
                continue;
            }
            if connectivity.soft_interacts(shape_i, *layer_i, shape_j, *layer_j, &identity) {
                soft_shape_pairs.push((i, j));
            }
            if connectivity.soft_interacts(shape_j, *layer_j, shape_i, *layer_i, &identity) {
                soft_shape_pairs.push((j, i));
            }
        }
    }

    // Global-net unification: shapes attached (via their layer) to the same
    // global net join the same union-find set, using the first shape seen
    // with that net as the set's representative (§4.2 step 3).
    let mut global_net_rep: FnvHashMap<crate::connectivity::GlobalNetId, usize> = FnvHashMap::default();
    for (i, (layer, _, _)) in shapes.iter().enumerate() {
        for net in connectivity.global_nets_of(*layer) {
            match global_net_rep.get(&net) {
                Some(&rep) => {
                    uf.union(rep, i);
                }
                None => {
                    global_net_rep.insert(net, i);
                }
            }
        }
    }

    // Attribute-equivalence force-join (§4.2 step 5), same trick.
    if let Some(eq) = attribute_equivalence {
        let mut class_rep: FnvHashMap<AttributeId, usize> = FnvHashMap::default();
        for (i, (_, _, attr)) in shapes.iter().enumerate() {
            if *attr == 0 {
                continue;
            }
            let class = eq.representative(*attr);
            match class_rep.get(&class) {
                Some(&rep) => {
                    uf.union(rep, i);
                }
                None => {
                    class_rep.insert(class, i);
                }
            }
        }
    }

    let mut connected = ConnectedClusters::new();
    let mut cluster_of_set: FnvHashMap<usize, crate::cluster::arena::ClusterId> = FnvHashMap::default();
    for (i, (layer, shape, attr)) in shapes.into_iter().enumerate() {
        let root = uf.find(i);
        let cluster_id = *cluster_of_set.entry(root).or_insert_with(|| connected.insert_cluster(LocalCluster::empty()));
        if let Some(cluster) = connected.cluster_mut(cluster_id) {
            cluster.add_shape(layer, shape, attr);
        }
        for net in connectivity.global_nets_of(layer) {
            if let Some(cluster) = connected.cluster_mut(cluster_id) {
                cluster.attach_global_net(net);
            }
        }
    }

    // Soft-upward annotations, resolved to the clusters the union-find
    // settled on — deduplicated since several shape pairs can collapse onto
    // the same pair of clusters.
    let mut seen_soft_cluster_pairs: fnv::FnvHashSet<(crate::cluster::arena::ClusterId, crate::cluster::arena::ClusterId)> = fnv::FnvHashSet::default();
    for (from_idx, to_idx) in soft_shape_pairs {
        let from_root = uf.find(from_idx);
        let to_root = uf.find(to_idx);
        if from_root == to_root {
            continue;
        }
        let (Some(&from_cluster), Some(&to_cluster)) = (cluster_of_set.get(&from_root), cluster_of_set.get(&to_root)) else {
            continue;
        };
        if !seen_soft_cluster_pairs.insert((from_cluster, to_cluster)) {
            continue;
        }
        if let Some(cluster) = connected.cluster_mut(from_cluster) {
            cluster.attach_soft_upward(to_cluster);
        }
    }

    connected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::Connectivity;
    use crate::geometry::{EdgeInteractionMode, NetShape, PolygonRef};
    use crate::index::IndexGenerator;
    use iron_shapes::prelude::Point;
    use std::rc::Rc;

    fn square(x0: i32, y0: i32, x1: i32, y1: i32) -> NetShape<i32> {
        let hull = Rc::new(vec![Point::from((x0, y0)), Point::from((x1, y0)), Point::from((x1, y1)), Point::from((x0, y1))]);
        NetShape::Polygon(PolygonRef::new(hull, crate::geometry::Transform::identity()))
    }

    #[test]
    fn two_overlapping_boxes_form_one_cluster() {
        let mut gen = IndexGenerator::<crate::connectivity::LayerMarker>::default();
        let l1 = gen.next();
        let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
        conn.connect_hard(l1, l1);

        let shapes = vec![(l1, square(0, 0, 100, 100), 0), (l1, square(50, 50, 200, 200), 0)];
        let connected: ConnectedClusters<i32, NetShape<i32>> = build_local_clusters(shapes, &conn, false, None);

        let clusters: Vec<_> = connected.iter().filter(|(_, c)| !c.is_empty()).collect();
        assert_eq!(clusters.len(), 1);
    }

    #[test]
    fn disjoint_boxes_form_two_clusters() {
        let mut gen = IndexGenerator::<crate::connectivity::LayerMarker>::default();
        let l1 = gen.next();
        let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
        conn.connect_hard(l1, l1);

        let shapes = vec![(l1, square(0, 0, 10, 10), 0), (l1, square(1000, 1000, 1010, 1010), 0)];
        let connected: ConnectedClusters<i32, NetShape<i32>> = build_local_clusters(shapes, &conn, false, None);
        let clusters: Vec<_> = connected.iter().filter(|(_, c)| !c.is_empty()).collect();
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn global_net_unifies_otherwise_disjoint_shapes() {
        let mut layer_gen = IndexGenerator::<crate::connectivity::LayerMarker>::default();
        let l1 = layer_gen.next();
        let mut net_gen = IndexGenerator::<crate::connectivity::GlobalNetMarker>::default();
        let vdd = net_gen.next();
        let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
        conn.connect_hard(l1, l1);
        conn.attach_global_net(l1, vdd);

        let shapes = vec![(l1, square(0, 0, 10, 10), 0), (l1, square(1000, 1000, 1010, 1010), 0)];
        let connected: ConnectedClusters<i32, NetShape<i32>> = build_local_clusters(shapes, &conn, false, None);
        let clusters: Vec<_> = connected.iter().filter(|(_, c)| !c.is_empty()).collect();
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].1.global_nets().any(|n| n == vdd));
    }

    #[test]
    fn soft_connect_annotates_but_does_not_unify_touching_clusters() {
        // Via-stack scenario (§8 scenario 3): an NTIE shape soft-connects
        // upward into an NWELL shape it touches. The two must stay separate
        // clusters, with the soft direction only recorded as an annotation.
        let mut gen = IndexGenerator::<crate::connectivity::LayerMarker>::default();
        let ntie = gen.next();
        let nwell = gen.next();
        let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
        conn.connect_soft(ntie, nwell);

        let shapes = vec![(ntie, square(0, 0, 10, 10), 0), (nwell, square(5, 5, 20, 20), 0)];
        let connected: ConnectedClusters<i32, NetShape<i32>> = build_local_clusters(shapes, &conn, false, None);
        let clusters: Vec<_> = connected.iter().filter(|(_, c)| !c.is_empty()).collect();
        assert_eq!(clusters.len(), 2, "soft connect must not unify the two clusters");

        let ntie_cluster = clusters.iter().find(|(_, c)| c.layers().any(|l| l == ntie)).unwrap();
        let nwell_cluster = clusters.iter().find(|(_, c)| c.layers().any(|l| l == nwell)).unwrap();
        let soft_targets: Vec<_> = ntie_cluster.1.soft_upward().collect();
        assert_eq!(soft_targets, vec![nwell_cluster.0], "soft direction should be annotated from NTIE to NWELL");
        assert!(nwell_cluster.1.soft_upward().next().is_none(), "the soft connection is one-directional");
    }

    #[test]
    fn separate_attributes_prevents_merge_of_distinct_labels() {
        let mut gen = IndexGenerator::<crate::connectivity::LayerMarker>::default();
        let l1 = gen.next();
        let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
        conn.connect_hard(l1, l1);

        let shapes = vec![(l1, square(0, 0, 100, 100), 1), (l1, square(50, 50, 200, 200), 2)];
        let connected: ConnectedClusters<i32, NetShape<i32>> = build_local_clusters(shapes, &conn, true, None);
        let clusters: Vec<_> = connected.iter().filter(|(_, c)| !c.is_empty()).collect();
        assert_eq!(clusters.len(), 2);
    }
}
