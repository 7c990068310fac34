// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The hierarchical builder (C9, §4.3): one bottom-up pass over the cell DAG
//! that turns per-cell local clusters into the full `HierClusters` network,
//! without ever flattening a cell's shapes into its parent.
//!
//! Grounded on `dbHierNetworkProcessor.cc`'s `build_connected_clusters`: local
//! pass, then instance-to-instance, then local-to-instance, promoting cluster
//! identity upward into the parent only where an interaction is actually
//! found (§4.4 "upward-promote"/"connect_clusters").

use crate::box_scanner::BoxScanner;
use crate::cluster::arena::ClusterId;
use crate::cluster::cache::{InstancePairKey, InteractionCaches};
use crate::cluster::connected::{ClusterInstanceRef, ConnectedClusters};
use crate::cluster::tree::HierClusters;
use crate::config::HierClustersConfig;
use crate::connectivity::{Connectivity, GlobalNetId, LayerId};
use crate::error::{ClusterError, Result};
use crate::geometry::{ShapeVariant, Transform};
use crate::layout_model::{AttributeId, CellAccess, CellIndex, LayoutIndex};
use crate::progress::Progress;
use fnv::FnvHashMap;
use iron_shapes::prelude::Rect;
use iron_shapes::CoordinateType;
use log::{debug, info};
use std::hash::Hash;

/// Run the full bottom-up hierarchical build over `layout`, returning the
/// resulting cluster network. `hier` is expected freshly cleared; the caller
/// owns its lifetime across repeated builds.
pub fn build<C, S, L>(layout: &L, connectivity: &Connectivity, config: &HierClustersConfig, progress: &dyn Progress) -> Result<HierClusters<C, S>>
where
    C: CoordinateType + Hash + Eq,
    S: ShapeVariant<C>,
    L: LayoutIndex<C, S>,
{
    let mut hier = HierClusters::new();
    let mut cache = InteractionCaches::new(config.instance_to_instance_cache_size_threshold);
    let mut full_bbox: FnvHashMap<CellIndex, Rect<C>> = FnvHashMap::default();

    for cell_index in layout.bottom_up_order() {
        progress.tick()?;
        let cell = layout.cell_by_index(cell_index).ok_or_else(|| {
            log::error!("cell index {} is not known to the consumed layout", cell_index.value());
            ClusterError::UnknownCell(cell_index.value())
        })?;
        debug!("Clustering cell {}.", layout.cell_name(cell_index));
        if config.report_progress {
            progress.report(&format!("clustering cell {}", layout.cell_name(cell_index)));
        }

        // Step A: local clustering (§4.2), grounded on `cluster::builder::build_local_clusters`.
        let mut own_shapes = Vec::new();
        for layer in connectivity.layers() {
            for (shape, attr) in cell.shapes(layer) {
                own_shapes.push((layer, shape, attr));
            }
        }
        let eq = config.attribute_equivalence.get(&cell_index).map(|b| b.as_ref());
        let local = crate::cluster::builder::build_local_clusters(own_shapes, connectivity, config.separate_attributes, eq);
        *hier.clusters_per_cell_mut(cell_index) = local;

        // Flatten array instances into individually placed elements.
        let children = cell.children();
        let mut elements: Vec<(CellIndex, Transform<C>, crate::layout_model::PropertyId)> = Vec::new();
        for inst in &children {
            for k in 0..inst.size() {
                elements.push((inst.cell_index, inst.complex_trans(k), inst.property_id));
            }
        }

        // Own-layer bbox, used as the seed of this cell's full hierarchical bbox.
        let mut acc: Option<Rect<C>> = None;
        for layer in connectivity.layers() {
            if let Some(b) = cell.bbox(layer) {
                acc = Some(match acc {
                    Some(a) => a.add_rect(&b),
                    None => b,
                });
            }
        }
        for &(child_cell, trans, _) in &elements {
            if let Some(child_bbox) = full_bbox.get(&child_cell) {
                let placed = trans.transform_rect(*child_bbox);
                acc = Some(match acc {
                    Some(a) => a.add_rect(&placed),
                    None => placed,
                });
            }
        }
        if let Some(bbox) = acc {
            full_bbox.insert(cell_index, bbox);
        }

        // Breakout cells are opaque from a *parent's* perspective: their own local
        // clustering (Step A, above) still ran normally when they are the cell
        // currently being processed; here we only drop child instances of
        // breakout cells from the instance-to-instance and local-to-instance
        // passes of *this* cell, matching `is_breakout_cell` filtering the
        // instance list rather than skipping the current cell outright.
        let elements: Vec<(CellIndex, Transform<C>, crate::layout_model::PropertyId)> =
            elements.into_iter().filter(|&(child_cell, _, _)| !config.breakout_cells.contains(&child_cell)).collect();

        if elements.is_empty() {
            record_global_nets(&mut hier, cell_index);
            continue;
        }

        // Coarse box scanner over instance elements, keyed by their index into `elements`.
        let mut entries = Vec::with_capacity(elements.len());
        for (i, &(child_cell, trans, _)) in elements.iter().enumerate() {
            if let Some(child_bbox) = full_bbox.get(&child_cell) {
                entries.push((i, trans.transform_rect(*child_bbox)));
            }
        }
        let scanner = BoxScanner::build(entries);

        // Step B: instance-to-instance interactions (§4.3 Step B).
        for (i, j) in scanner.touching_pairs() {
            progress.tick()?;
            let (cell_a, trans_a, prop_a) = elements[i];
            let (cell_b, trans_b, prop_b) = elements[j];
            let rel_transform = trans_a.inverted().then(&trans_b);
            let pairs = cached_pair_interactions(&hier, &mut cache, connectivity, cell_a, cell_b, rel_transform);
            if pairs.is_empty() {
                continue;
            }
            for (ca, cb) in pairs {
                let ci_a = ClusterInstanceRef { cluster_id: ca, child_cell: cell_a, trans: trans_a, property_id: prop_a };
                let ci_b = ClusterInstanceRef { cluster_id: cb, child_cell: cell_b, trans: trans_b, property_id: prop_b };
                join_via_instances(&mut hier, cell_index, ci_a, ci_b);
            }
        }

        // Step C: local-to-instance interactions (§4.3 Step C). Reuses the same
        // box scanner built for Step B above (it already spans every instance
        // element's bbox in `cell_index`'s own frame, with breakout children
        // dropped), querying it per local cluster instead of a naive nested
        // loop over every element. A hit defers to `cached_pair_interactions`,
        // the same cache Step B populates: `cell_index` can never appear as
        // one of its own children's cell index in a non-cyclic hierarchy, so
        // the two steps never collide on a cache key, and a local cluster
        // querying an instance element already probed by an earlier local
        // cluster (or by Step B, for a self-referential array instance) reuses
        // that entry instead of recomputing it.
        let local_ids: Vec<ClusterId> = hier.clusters_per_cell(cell_index).map(|cc| cc.iter().map(|(id, _)| id).collect()).unwrap_or_default();
        for local_id in local_ids {
            progress.tick()?;
            let local_bbox = match hier.clusters_per_cell_mut(cell_index).cluster_mut(local_id).and_then(|c| c.bbox()) {
                Some(b) => b,
                None => continue, // empty or already absorbed by an earlier merge this pass
            };
            let candidates: Vec<usize> = scanner.touching(local_bbox).collect();
            for i in candidates {
                let (child_cell, trans, prop) = elements[i];
                if hier.clusters_per_cell(cell_index).and_then(|cc| cc.cluster(local_id)).is_none() {
                    break; // local_id got merged away by an earlier instance this loop
                }
                let pairs = cached_pair_interactions(&hier, &mut cache, connectivity, cell_index, child_cell, trans);
                for (ca, cb) in pairs {
                    if ca != local_id {
                        continue;
                    }
                    let ci = ClusterInstanceRef { cluster_id: cb, child_cell, trans, property_id: prop };
                    join_local_with_instance(&mut hier, cell_index, local_id, ci);
                }
            }
        }

        record_global_nets(&mut hier, cell_index);
    }

    unify_global_nets(&mut hier);

    let stats = cache.stats();
    info!("Cluster build finished: instance-pair cache {} hits / {} misses.", stats.instance_hits, stats.instance_misses);

    Ok(hier)
}

fn record_global_nets<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>>(hier: &mut HierClusters<C, S>, cell_index: CellIndex) {
    let nets: Vec<(ClusterId, GlobalNetId)> = match hier.clusters_per_cell(cell_index) {
        Some(connected) => connected.iter().flat_map(|(id, c)| c.global_nets().map(move |n| (id, n))).collect(),
        None => return,
    };
    for (id, net) in nets {
        hier.note_global_net(net, cell_index, id);
    }
}

/// A reserved cell index that never corresponds to a real layout cell, used
/// purely as the scope that holds each global net's representative connector
/// cluster (§4.3 Step E). `HierClusters::cells`/`return_to_hierarchy` see it
/// like any other cell; its clusters simply have no local shapes of their own.
fn global_net_scope_cell() -> CellIndex {
    crate::index::Index::new(usize::MAX)
}

/// `connect_clusters` for global nets (§4.3 Step E): every `(cell_index,
/// cluster_id)` pair attached to the same global net, anywhere in the
/// hierarchy regardless of any actual instance relationship between the
/// cells they live in, is promoted under one representative connector
/// cluster living in the reserved global-net scope cell, the same way
/// `join_via_instances` promotes two instance-cluster references under a
/// fresh dummy connector. A net touched by fewer than two clusters needs no
/// connector.
fn unify_global_nets<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>>(hier: &mut HierClusters<C, S>) {
    let scope = global_net_scope_cell();
    let nets: Vec<GlobalNetId> = hier.global_nets().collect();
    for net in nets {
        let members = hier.global_net_members(net).to_vec();
        if members.len() < 2 {
            continue;
        }
        let connector = hier.clusters_per_cell_mut(scope).insert_dummy();
        for (cell_index, cluster_id) in members {
            let ci = ClusterInstanceRef { cluster_id, child_cell: cell_index, trans: Transform::identity(), property_id: crate::index::Index::new(0) };
            add_and_mark(hier, scope, connector, ci);
        }
    }
}

/// The instance-to-instance cluster-pair cache lookup/compute (§4.3 Step B.2).
/// On a miss, compares every pair of clusters present in `cell_a` and `cell_b`
/// by their fully recursively-expanded shape sets (reusing the C10 iterator),
/// rather than each cluster's own local shapes: a cluster with no local
/// shapes of its own (a pure connector created by an earlier promotion) still
/// represents real geometry further down the hierarchy and must be tested.
/// This trades the original's incrementally maintained per-cluster bounding
/// box for straightforward recomputation; see `DESIGN.md`.
fn cached_pair_interactions<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>>(
    hier: &HierClusters<C, S>,
    cache: &mut InteractionCaches<C>,
    connectivity: &Connectivity,
    cell_a: CellIndex,
    cell_b: CellIndex,
    rel_transform: Transform<C>,
) -> Vec<(ClusterId, ClusterId)> {
    let key = InstancePairKey { cell_a, cell_b, normalized_transform: rel_transform };
    if let Some(hit) = cache.get_instance_pairs(&key) {
        return hit.to_vec();
    }

    let ids_a: Vec<ClusterId> = hier.clusters_per_cell(cell_a).map(|cc| cc.iter().map(|(id, _)| id).collect()).unwrap_or_default();
    let ids_b: Vec<ClusterId> = hier.clusters_per_cell(cell_b).map(|cc| cc.iter().map(|(id, _)| id).collect()).unwrap_or_default();

    let shapes_a: Vec<_> = ids_a.into_iter().map(|id| (id, crate::cluster::iter::collect_cluster_shapes(hier, cell_a, id))).filter(|(_, s)| !s.is_empty()).collect();
    let shapes_b: Vec<_> = ids_b.into_iter().map(|id| (id, crate::cluster::iter::collect_cluster_shapes(hier, cell_b, id))).filter(|(_, s)| !s.is_empty()).collect();

    let mut pairs = Vec::new();
    for (ida, sa) in &shapes_a {
        for (idb, sb) in &shapes_b {
            let touches = sa.iter().any(|(la, a, _)| sb.iter().any(|(lb, b, _)| connectivity.interacts(a, *la, b, *lb, &rel_transform)));
            if touches {
                pairs.push((*ida, *idb));
            }
        }
    }
    cache.put_instance_pairs(key, pairs.clone());
    pairs
}

/// `upward-promote`: the local (parent-level) cluster id a cluster-instance
/// reference has already been promoted to, if any (§4.4).
fn upward_promote<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>>(connected: &ConnectedClusters<C, S>, ci: &ClusterInstanceRef<C>) -> Option<ClusterId> {
    connected.promoted_id_of(ci)
}

/// Record a fresh promotion: add the outbound connection in the parent cell
/// and mark the referenced child cluster as non-root in the child cell's own
/// table — a cluster's root/non-root flag lives where the cluster itself
/// lives, not where it gets promoted to.
fn add_and_mark<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>>(hier: &mut HierClusters<C, S>, parent_cell: CellIndex, id: ClusterId, ci: ClusterInstanceRef<C>) {
    hier.clusters_per_cell_mut(parent_cell).add_connection(id, ci);
    hier.clusters_per_cell_mut(ci.child_cell).mark_non_root(ci.cluster_id);
}

/// `connect_clusters` for a pair of instance-cluster references discovered to
/// interact (§4.4): promote both sides, then join per the documented
/// tie-break — a fresh dummy connector if neither side was promoted yet,
/// attach to the already-promoted side if only one was, or weighted-union
/// merge (fewer connections into more) if both were promoted to distinct
/// clusters already.
fn join_via_instances<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>>(
    hier: &mut HierClusters<C, S>,
    parent_cell: CellIndex,
    ci_a: ClusterInstanceRef<C>,
    ci_b: ClusterInstanceRef<C>,
) {
    let k1 = hier.clusters_per_cell(parent_cell).and_then(|c| upward_promote(c, &ci_a));
    let k2 = hier.clusters_per_cell(parent_cell).and_then(|c| upward_promote(c, &ci_b));
    match (k1, k2) {
        (None, None) => {
            let id = hier.clusters_per_cell_mut(parent_cell).insert_dummy();
            add_and_mark(hier, parent_cell, id, ci_a);
            add_and_mark(hier, parent_cell, id, ci_b);
        }
        (Some(a), None) => add_and_mark(hier, parent_cell, a, ci_b),
        (None, Some(b)) => add_and_mark(hier, parent_cell, b, ci_a),
        (Some(a), Some(b)) if a == b => {}
        (Some(a), Some(b)) => {
            let connected = hier.clusters_per_cell_mut(parent_cell);
            let (big, small) = if connected.outbound(a).len() >= connected.outbound(b).len() { (a, b) } else { (b, a) };
            connected.join_cluster_with(big, small);
        }
    }
}

/// `connect_clusters` between an already-materialized local cluster and an
/// instance-cluster reference found to interact with it (§4.3 Step C.3).
fn join_local_with_instance<C: CoordinateType + Hash + Eq, S: ShapeVariant<C>>(
    hier: &mut HierClusters<C, S>,
    parent_cell: CellIndex,
    local_id: ClusterId,
    ci: ClusterInstanceRef<C>,
) {
    match hier.clusters_per_cell(parent_cell).and_then(|c| upward_promote(c, &ci)) {
        None => add_and_mark(hier, parent_cell, local_id, ci),
        Some(b) if b == local_id => {}
        Some(b) => {
            let connected = hier.clusters_per_cell_mut(parent_cell);
            let (big, small) = if connected.outbound(local_id).len() >= connected.outbound(b).len() { (local_id, b) } else { (b, local_id) };
            connected.join_cluster_with(big, small);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{Connectivity, LayerMarker};
    use crate::geometry::{EdgeInteractionMode, NetShape, PolygonRef};
    use crate::index::IndexGenerator;
    use crate::layout_model::mem::MemLayout;
    use crate::layout_model::{CellInstance, Repetition};
    use crate::progress::NoopProgress;
    use iron_shapes::prelude::Point;
    use std::rc::Rc;

    fn square(x0: i32, y0: i32, x1: i32, y1: i32) -> NetShape<i32> {
        let hull = Rc::new(vec![Point::from((x0, y0)), Point::from((x1, y0)), Point::from((x1, y1)), Point::from((x0, y1))]);
        NetShape::Polygon(PolygonRef::new(hull, Transform::identity()))
    }

    fn one_layer_connectivity() -> (Connectivity, crate::connectivity::LayerId) {
        let mut gen = IndexGenerator::<LayerMarker>::default();
        let l1 = gen.next();
        let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
        conn.connect_hard(l1, l1);
        (conn, l1)
    }

    #[test]
    fn single_cell_two_overlapping_boxes_form_one_root_cluster() {
        let (conn, l1) = one_layer_connectivity();
        let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
        let top = layout.add_cell("TOP");
        layout.cell_mut(top).add_shape(l1, square(0, 0, 100, 100), 0);
        layout.cell_mut(top).add_shape(l1, square(50, 50, 200, 200), 0);

        let config = HierClustersConfig::new();
        let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();
        let connected = hier.clusters_per_cell(top).unwrap();
        let roots: Vec<_> = connected.iter().filter(|(id, _)| connected.is_root(*id)).collect();
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn parent_and_child_touching_shapes_join_across_the_boundary() {
        let (conn, l1) = one_layer_connectivity();
        let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
        let child = layout.add_cell("CHILD");
        layout.cell_mut(child).add_shape(l1, square(0, 0, 50, 50), 0);
        let parent = layout.add_cell("PARENT");
        layout.cell_mut(parent).add_shape(l1, square(40, 40, 100, 100), 0);
        layout.cell_mut(parent).add_instance(CellInstance { cell_index: child, trans: Transform::identity(), repetition: None, property_id: IndexGenerator::<crate::layout_model::PropertyMarker>::default().next() });

        let config = HierClustersConfig::new();
        let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();

        let child_connected = hier.clusters_per_cell(child).unwrap();
        let child_roots: Vec<_> = child_connected.iter().filter(|(id, _)| child_connected.is_root(*id)).collect();
        assert_eq!(child_roots.len(), 0, "child's own cluster should have been promoted into the parent, making it non-root");
    }

    #[test]
    fn two_disjoint_shapes_form_two_independent_clusters() {
        let (conn, l1) = one_layer_connectivity();
        let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
        let top = layout.add_cell("TOP");
        layout.cell_mut(top).add_shape(l1, square(0, 0, 10, 10), 0);
        layout.cell_mut(top).add_shape(l1, square(1000, 1000, 1010, 1010), 0);

        let config = HierClustersConfig::new();
        let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();
        let connected = hier.clusters_per_cell(top).unwrap();
        assert_eq!(connected.iter().filter(|(_, c)| !c.is_empty()).count(), 2);
    }

    #[test]
    fn array_instance_self_interaction_merges_periodic_elements() {
        let (conn, l1) = one_layer_connectivity();
        let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
        let child = layout.add_cell("CHILD");
        layout.cell_mut(child).add_shape(l1, square(0, 0, 100, 50), 0);
        let parent = layout.add_cell("PARENT");
        let repetition = Repetition { row_count: 1, col_count: 2, row_vector: Point::from((0, 0)), col_vector: Point::from((50, 0)) };
        layout.cell_mut(parent).add_instance(CellInstance {
            cell_index: child,
            trans: Transform::identity(),
            repetition: Some(repetition),
            property_id: IndexGenerator::<crate::layout_model::PropertyMarker>::default().next(),
        });

        let config = HierClustersConfig::new();
        let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();
        let child_connected = hier.clusters_per_cell(child).unwrap();
        // The two periodic placements (period 50 < bbox width 100) overlap, so the
        // child cell's one cluster must have been promoted into the parent.
        let non_root_count = child_connected.iter().filter(|(id, _)| !child_connected.is_root(*id)).count();
        assert_eq!(non_root_count, 1);
    }

    #[test]
    fn breakout_cell_still_builds_its_own_local_clusters_but_is_opaque_to_its_parent() {
        let (conn, l1) = one_layer_connectivity();
        let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
        let child = layout.add_cell("CHILD");
        layout.cell_mut(child).add_shape(l1, square(0, 0, 50, 50), 0);
        layout.cell_mut(child).add_shape(l1, square(1000, 1000, 1010, 1010), 0);
        let parent = layout.add_cell("PARENT");
        layout.cell_mut(parent).add_shape(l1, square(40, 40, 100, 100), 0);
        layout.cell_mut(parent).add_instance(CellInstance { cell_index: child, trans: Transform::identity(), repetition: None, property_id: IndexGenerator::<crate::layout_model::PropertyMarker>::default().next() });

        let mut config = HierClustersConfig::new();
        config.breakout_cells.insert(child);
        let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();

        let child_connected = hier.clusters_per_cell(child).unwrap();
        assert_eq!(child_connected.iter().filter(|(_, c)| !c.is_empty()).count(), 2, "the breakout cell's own local clustering still ran");
        let child_roots = child_connected.iter().filter(|(id, _)| child_connected.is_root(*id)).count();
        assert_eq!(child_roots, 2, "an instance of a breakout cell is never promoted into its parent");

        let parent_connected = hier.clusters_per_cell(parent).unwrap();
        let parent_clusters: Vec<_> = parent_connected.iter().filter(|(_, c)| !c.is_empty()).collect();
        assert_eq!(parent_clusters.len(), 1, "PARENT's own shape forms its own cluster, untouched by the breakout child");
        assert_eq!(parent_connected.outbound(parent_clusters[0].0).len(), 0);
    }
}
