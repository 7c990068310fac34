// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end fixtures for the six concrete scenarios, one small layout
//! built by hand and checked against `build`'s output.

use hier_net_clusters::cluster::hier_builder::build;
use hier_net_clusters::config::HierClustersConfig;
use hier_net_clusters::connectivity::{Connectivity, GlobalNetMarker, LayerMarker};
use hier_net_clusters::geometry::{EdgeInteractionMode, NetShape, PolygonRef, Transform};
use hier_net_clusters::index::IndexGenerator;
use hier_net_clusters::layout_model::mem::MemLayout;
use hier_net_clusters::layout_model::{CellInstance, PropertyMarker, Repetition};
use hier_net_clusters::progress::NoopProgress;
use iron_shapes::prelude::Point;
use std::rc::Rc;

fn square(x0: i32, y0: i32, x1: i32, y1: i32) -> NetShape<i32> {
    let hull = Rc::new(vec![Point::from((x0, y0)), Point::from((x1, y0)), Point::from((x1, y1)), Point::from((x0, y1))]);
    NetShape::Polygon(PolygonRef::new(hull, Transform::identity()))
}

fn no_property() -> hier_net_clusters::layout_model::PropertyId {
    IndexGenerator::<PropertyMarker>::default().next()
}

/// Scenario 1: single cell, two overlapping boxes, one layer.
#[test]
fn scenario_1_single_cell_two_overlapping_boxes() {
    let mut layers = IndexGenerator::<LayerMarker>::default();
    let l1 = layers.next();
    let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
    conn.connect_hard(l1, l1);

    let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
    let top = layout.add_cell("TOP");
    layout.cell_mut(top).add_shape(l1, square(0, 0, 100, 100), 0);
    layout.cell_mut(top).add_shape(l1, square(50, 50, 200, 200), 0);

    let config = HierClustersConfig::new();
    let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();

    let connected = hier.clusters_per_cell(top).unwrap();
    let clusters: Vec<_> = connected.iter().filter(|(_, c)| !c.is_empty()).collect();
    assert_eq!(clusters.len(), 1);
    let (id, _) = clusters[0];
    assert!(connected.is_root(id));
    assert_eq!(connected.outbound(id).len(), 0);
}

/// Scenario 2: parent + child touching across the instance boundary.
#[test]
fn scenario_2_parent_and_child_touching() {
    let mut layers = IndexGenerator::<LayerMarker>::default();
    let l1 = layers.next();
    let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
    conn.connect_hard(l1, l1);

    let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
    let c1 = layout.add_cell("C1");
    layout.cell_mut(c1).add_shape(l1, square(0, 0, 100, 100), 0);
    let top = layout.add_cell("TOP");
    layout.cell_mut(top).add_shape(l1, square(100, 0, 200, 100), 0);
    layout.cell_mut(top).add_instance(CellInstance { cell_index: c1, trans: Transform::identity(), repetition: None, property_id: no_property() });

    let config = HierClustersConfig::new();
    let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();

    let top_connected = hier.clusters_per_cell(top).unwrap();
    let (top_id, _) = top_connected.iter().next().unwrap();
    assert_eq!(top_connected.outbound(top_id).len(), 1);

    let c1_connected = hier.clusters_per_cell(c1).unwrap();
    let c1_roots: Vec<_> = c1_connected.iter().filter(|(id, _)| c1_connected.is_root(*id)).collect();
    assert_eq!(c1_roots.len(), 0, "C1's cluster was promoted into TOP");
}

/// Scenario 3: via-stack with soft connect. An NTIE box sits inside an NWELL
/// poly-ref; NTIE and NWELL each hard-connect to themselves, and NTIE soft-
/// connects up to NWELL. The two must stay separate clusters within C1, with
/// the soft direction only recorded as an annotation.
#[test]
fn scenario_3_via_stack_with_soft_connect() {
    let mut layers = IndexGenerator::<LayerMarker>::default();
    let nwell = layers.next();
    let ntie = layers.next();
    let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
    conn.connect_hard(ntie, ntie);
    conn.connect_hard(nwell, nwell);
    conn.connect_soft(ntie, nwell);

    let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
    let c1 = layout.add_cell("C1");
    layout.cell_mut(c1).add_shape(nwell, square(0, 0, 2000, 2000), 0);
    layout.cell_mut(c1).add_shape(ntie, square(500, 500, 1500, 1500), 0);

    let config = HierClustersConfig::new();
    let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();

    let connected = hier.clusters_per_cell(c1).unwrap();
    let clusters: Vec<_> = connected.iter().filter(|(_, c)| !c.is_empty()).collect();
    assert_eq!(clusters.len(), 2, "soft connect must not unify the NTIE and NWELL clusters");

    let ntie_cluster = clusters.iter().find(|(_, c)| c.layers().any(|l| l == ntie)).unwrap();
    let nwell_cluster = clusters.iter().find(|(_, c)| c.layers().any(|l| l == nwell)).unwrap();
    assert_eq!(ntie_cluster.1.soft_upward().collect::<Vec<_>>(), vec![nwell_cluster.0]);
}

/// Scenario 4: two sibling instances bridged by a parent shape.
#[test]
fn scenario_4_siblings_bridged_by_parent_shape() {
    let mut layers = IndexGenerator::<LayerMarker>::default();
    let l1 = layers.next();
    let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
    conn.connect_hard(l1, l1);

    let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
    let c1 = layout.add_cell("C1");
    layout.cell_mut(c1).add_shape(l1, square(0, 0, 100, 500), 0);
    let top = layout.add_cell("TOP");
    layout.cell_mut(top).add_shape(l1, square(0, 400, 100, 600), 0);
    layout.cell_mut(top).add_instance(CellInstance { cell_index: c1, trans: Transform::identity(), repetition: None, property_id: no_property() });
    layout.cell_mut(top).add_instance(CellInstance {
        cell_index: c1,
        trans: Transform::displacement(Point::from((0, 1000))),
        repetition: None,
        property_id: no_property(),
    });

    let config = HierClustersConfig::new();
    let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();

    let top_connected = hier.clusters_per_cell(top).unwrap();
    let top_clusters: Vec<_> = top_connected.iter().filter(|(_, c)| !c.is_empty()).collect();
    assert_eq!(top_clusters.len(), 1, "both instances and TOP's own shape join one net");
    let (top_id, _) = top_clusters[0];
    assert_eq!(top_connected.outbound(top_id).len(), 2, "one outbound connection per instance");
}

/// Scenario 5: two disjoint global nets in unrelated cells never unify.
#[test]
fn scenario_5_two_disjoint_global_nets() {
    let mut layers = IndexGenerator::<LayerMarker>::default();
    let nwell = layers.next();
    let ptap = layers.next();
    let mut nets = IndexGenerator::<GlobalNetMarker>::default();
    let vdd = nets.next();
    let gnd = nets.next();
    let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
    conn.connect_hard(nwell, nwell);
    conn.connect_hard(ptap, ptap);
    conn.attach_global_net(nwell, vdd);
    conn.attach_global_net(ptap, gnd);

    let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
    let cell_a = layout.add_cell("A");
    layout.cell_mut(cell_a).add_shape(nwell, square(0, 0, 10, 10), 0);
    let cell_b = layout.add_cell("B");
    layout.cell_mut(cell_b).add_shape(ptap, square(0, 0, 10, 10), 0);

    let config = HierClustersConfig::new();
    let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();

    assert_eq!(hier.global_net_members(vdd).len(), 1);
    assert_eq!(hier.global_net_members(gnd).len(), 1);
    assert_ne!(hier.global_net_members(vdd)[0], hier.global_net_members(gnd)[0]);
}

/// Two unrelated cells sharing one global net end up connected: both
/// clusters are promoted non-root, and walking the resulting net from either
/// cell's root reaches both members' shapes.
#[test]
fn shared_global_net_unifies_clusters_across_unrelated_cells() {
    let mut layers = IndexGenerator::<LayerMarker>::default();
    let nwell = layers.next();
    let mut nets = IndexGenerator::<GlobalNetMarker>::default();
    let vdd = nets.next();
    let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
    conn.connect_hard(nwell, nwell);
    conn.attach_global_net(nwell, vdd);

    let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
    let cell_a = layout.add_cell("A");
    layout.cell_mut(cell_a).add_shape(nwell, square(0, 0, 10, 10), 0);
    let cell_b = layout.add_cell("B");
    layout.cell_mut(cell_b).add_shape(nwell, square(1000, 1000, 1010, 1010), 0);

    let config = HierClustersConfig::new();
    let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();

    assert_eq!(hier.global_net_members(vdd).len(), 2);

    let connected_a = hier.clusters_per_cell(cell_a).unwrap();
    let (id_a, _) = connected_a.iter().next().unwrap();
    assert!(!connected_a.is_root(id_a), "A's cluster was promoted into the global-net connector");

    let connected_b = hier.clusters_per_cell(cell_b).unwrap();
    let (id_b, _) = connected_b.iter().next().unwrap();
    assert!(!connected_b.is_root(id_b), "B's cluster was promoted into the global-net connector");
}

/// Scenario 6: a 2x1 array instance whose period is shorter than the child's
/// own bounding box unifies both array elements via the instance-to-instance
/// pass, and the pair cache records one entry for it.
#[test]
fn scenario_6_array_instance_self_interaction() {
    let mut layers = IndexGenerator::<LayerMarker>::default();
    let l1 = layers.next();
    let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
    conn.connect_hard(l1, l1);

    let mut layout: MemLayout<i32, NetShape<i32>> = MemLayout::new();
    let c1 = layout.add_cell("C1");
    layout.cell_mut(c1).add_shape(l1, square(0, 0, 100, 10), 0);
    let top = layout.add_cell("TOP");
    layout.cell_mut(top).add_instance(CellInstance {
        cell_index: c1,
        trans: Transform::identity(),
        repetition: Some(Repetition { row_count: 1, col_count: 2, row_vector: Point::from((0, 0)), col_vector: Point::from((50, 0)) }),
        property_id: no_property(),
    });

    let config = HierClustersConfig::new();
    let hier = build(&layout, &conn, &config, &NoopProgress).unwrap();

    let top_connected = hier.clusters_per_cell(top).unwrap();
    let (dummy_id, _) = top_connected.iter().next().expect("a connector cluster unifies the two array elements");
    assert_eq!(top_connected.outbound(dummy_id).len(), 2, "both array elements promoted under one connector cluster");

    let c1_connected = hier.clusters_per_cell(c1).unwrap();
    let non_root_count = c1_connected.iter().filter(|(id, _)| !c1_connected.is_root(*id)).count();
    assert_eq!(non_root_count, 1, "C1 has exactly one local cluster, promoted into TOP");
}
