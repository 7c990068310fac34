// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Local cluster (C4): one electrically-connected set of shapes inside a
//! single cell, per §3 "Local cluster".

use crate::cluster::arena::ClusterId;
use crate::connectivity::{Connectivity, GlobalNetId, LayerId};
use crate::geometry::{ShapeVariant, Transform};
use crate::layout_model::AttributeId;
use fnv::{FnvHashMap, FnvHashSet};
use iron_shapes::prelude::Rect;
use iron_shapes::CoordinateType;

/// One electrically-connected set of shapes inside one cell.
#[derive(Debug, Clone)]
pub struct LocalCluster<C, S> {
    shapes_by_layer: FnvHashMap<LayerId, Vec<(S, AttributeId)>>,
    attribute_ids: FnvHashSet<AttributeId>,
    global_nets: FnvHashSet<GlobalNetId>,
    soft_upward: FnvHashSet<ClusterId>,
    bbox: Option<Rect<C>>,
    dirty: bool,
}

impl<C: CoordinateType, S: ShapeVariant<C>> Default for LocalCluster<C, S> {
    fn default() -> Self {
        LocalCluster {
            shapes_by_layer: FnvHashMap::default(),
            attribute_ids: FnvHashSet::default(),
            global_nets: FnvHashSet::default(),
            soft_upward: FnvHashSet::default(),
            bbox: None,
            dirty: false,
        }
    }
}

impl<C: CoordinateType, S: ShapeVariant<C>> LocalCluster<C, S> {
    /// An empty cluster, e.g. a dummy connector with no member shapes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a member shape, marking the cached bounding box dirty.
    pub fn add_shape(&mut self, layer: LayerId, shape: S, attr: AttributeId) {
        if attr != 0 {
            self.attribute_ids.insert(attr);
        }
        self.shapes_by_layer.entry(layer).or_default().push((shape, attr));
        self.dirty = true;
    }

    /// Attach this cluster to a global net.
    pub fn attach_global_net(&mut self, net: GlobalNetId) {
        self.global_nets.insert(net);
    }

    /// The global nets this cluster is attached to.
    pub fn global_nets(&self) -> impl Iterator<Item = GlobalNetId> + '_ {
        self.global_nets.iter().copied()
    }

    /// `true` if this cluster carries no global-net attachment.
    pub fn has_no_global_nets(&self) -> bool {
        self.global_nets.is_empty()
    }

    /// The union of attribute ids of all member shapes (0 excluded).
    pub fn attribute_ids(&self) -> impl Iterator<Item = AttributeId> + '_ {
        self.attribute_ids.iter().copied()
    }

    /// Member shapes on `layer`.
    pub fn shapes(&self, layer: LayerId) -> &[(S, AttributeId)] {
        self.shapes_by_layer.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All layers with at least one member shape.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.shapes_by_layer.keys().copied()
    }

    /// `true` if this cluster has no member shapes (a "dummy" connector cluster).
    pub fn is_empty(&self) -> bool {
        self.shapes_by_layer.values().all(|v| v.is_empty())
    }

    /// The cached overall bounding box, recomputing it first if dirty.
    pub fn bbox(&mut self) -> Option<Rect<C>> {
        if self.dirty {
            self.bbox = self.shapes_by_layer.values().flatten().map(|(s, _)| s.bbox()).reduce(|a, b| a.add_rect(&b));
            self.dirty = false;
        }
        self.bbox
    }

    /// Record a soft (rectifying) upward connection from this cluster to
    /// `target`, within the same cell. Unlike [`LocalCluster::merge_from`],
    /// this never folds `target`'s shapes into `self` — the two clusters stay
    /// distinct nets, per the soft-connect/upward-promotion open question
    /// (§9 Design Notes).
    pub fn attach_soft_upward(&mut self, target: ClusterId) {
        self.soft_upward.insert(target);
    }

    /// The same-cell clusters this cluster has a soft upward connection into.
    /// A target id may no longer resolve to a live cluster if it was later
    /// folded into another cluster by a hierarchical weighted-union merge —
    /// callers should treat a miss on lookup as "annotation stale", not as an
    /// error.
    pub fn soft_upward(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.soft_upward.iter().copied()
    }

    /// Absorb `other`'s member shapes, attribute ids, global-net attachments
    /// and soft-upward annotations into `self`. Used by the builder's weighted-
    /// union merge step.
    pub fn merge_from(&mut self, other: LocalCluster<C, S>) {
        for (layer, shapes) in other.shapes_by_layer {
            self.shapes_by_layer.entry(layer).or_default().extend(shapes);
        }
        self.attribute_ids.extend(other.attribute_ids);
        self.global_nets.extend(other.global_nets);
        self.soft_upward.extend(other.soft_upward);
        self.dirty = true;
    }

    /// Direct pairwise interaction test between two local clusters' own
    /// member shapes (not their recursively expanded net), with `trans`
    /// mapping `other`'s frame into `self`'s frame. A standalone convenience
    /// for callers probing local-cluster adjacency directly; `hier_builder`'s
    /// own instance-to-instance and local-to-instance passes go through
    /// [`crate::cluster::iter::collect_cluster_shapes`] instead, since a
    /// cluster with no local shapes of its own (a pure connector) still
    /// represents real geometry further down the hierarchy.
    pub fn interacts(&self, other: &Self, trans: &Transform<C>, connectivity: &Connectivity) -> bool {
        for (&la, shapes_a) in &self.shapes_by_layer {
            for (&lb, shapes_b) in &other.shapes_by_layer {
                if connectivity.conducts(la, lb) == crate::connectivity::Conducts::None {
                    continue;
                }
                for (sa, _) in shapes_a {
                    for (sb, _) in shapes_b {
                        if connectivity.interacts(sa, la, sb, lb, trans) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
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
        NetShape::Polygon(PolygonRef::new(hull, Transform::identity()))
    }

    #[test]
    fn bbox_covers_all_member_shapes() {
        let mut gen = IndexGenerator::<crate::connectivity::LayerMarker>::default();
        let l1 = gen.next();
        let mut c: LocalCluster<i32, NetShape<i32>> = LocalCluster::empty();
        c.add_shape(l1, square(0, 0, 10, 10), 0);
        c.add_shape(l1, square(20, 20, 30, 30), 0);
        let bbox = c.bbox().unwrap();
        assert_eq!(bbox.lower_left(), Point::from((0, 0)));
        assert_eq!(bbox.upper_right(), Point::from((30, 30)));
    }

    #[test]
    fn interacts_true_when_layers_conduct_and_shapes_touch() {
        let mut gen = IndexGenerator::<crate::connectivity::LayerMarker>::default();
        let l1 = gen.next();
        let mut conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);
        conn.connect_hard(l1, l1);

        let mut a: LocalCluster<i32, NetShape<i32>> = LocalCluster::empty();
        a.add_shape(l1, square(0, 0, 10, 10), 0);
        let mut b: LocalCluster<i32, NetShape<i32>> = LocalCluster::empty();
        b.add_shape(l1, square(5, 5, 15, 15), 0);

        assert!(a.interacts(&b, &Transform::identity(), &conn));
    }

    #[test]
    fn interacts_false_when_layers_do_not_conduct() {
        let mut gen = IndexGenerator::<crate::connectivity::LayerMarker>::default();
        let l1 = gen.next();
        let l2 = gen.next();
        let conn = Connectivity::new(EdgeInteractionMode::CollinearTouching);

        let mut a: LocalCluster<i32, NetShape<i32>> = LocalCluster::empty();
        a.add_shape(l1, square(0, 0, 10, 10), 0);
        let mut b: LocalCluster<i32, NetShape<i32>> = LocalCluster::empty();
        b.add_shape(l2, square(5, 5, 15, 15), 0);

        assert!(!a.interacts(&b, &Transform::identity(), &conn));
    }
}
