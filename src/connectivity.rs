// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Connectivity descriptor (C3): the layer set, the layer-to-layer conductive
//! relation, per-layer global-net attachments, and the edge-interaction mode.

use crate::geometry::{EdgeInteractionMode, ShapeVariant};
use crate::index::Index;
use fnv::{FnvHashMap, FnvHashSet};
use iron_shapes::CoordinateType;

/// Marker type for [`Index`] over layers.
#[derive(Debug)]
pub struct LayerMarker;

/// A layer identifier.
pub type LayerId = Index<LayerMarker>;

/// Marker type for [`Index`] over global nets.
#[derive(Debug)]
pub struct GlobalNetMarker;

/// A global-net identifier, allocated by first-seen name.
pub type GlobalNetId = Index<GlobalNetMarker>;

/// The conductive relation between an ordered pair of layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conducts {
    /// The layers never conduct.
    None,
    /// The layers conduct symmetrically.
    Hard,
    /// A directed, rectifying connection from the first layer to the second.
    /// Never unions the two clusters it touches — [`Connectivity::interacts`]
    /// treats it the same as [`Conducts::None`] — it only ever shows up as a
    /// directed annotation between the two resulting clusters, recorded via
    /// [`crate::cluster::LocalCluster::attach_soft_upward`] (see §9 Design
    /// Notes on the soft-connect/upward-promotion open question).
    SoftFromAToB,
}

/// Layer set, conductive relation, global-net attachments and edge mode (§3).
#[derive(Debug, Clone)]
pub struct Connectivity {
    layers: FnvHashSet<LayerId>,
    conducts: FnvHashMap<(LayerId, LayerId), Conducts>,
    global_nets: FnvHashMap<LayerId, FnvHashSet<GlobalNetId>>,
    edge_mode: EdgeInteractionMode,
}

impl Default for Connectivity {
    fn default() -> Self {
        Connectivity {
            layers: FnvHashSet::default(),
            conducts: FnvHashMap::default(),
            global_nets: FnvHashMap::default(),
            edge_mode: EdgeInteractionMode::CollinearTouching,
        }
    }
}

impl Connectivity {
    /// Create an empty connectivity descriptor.
    pub fn new(edge_mode: EdgeInteractionMode) -> Self {
        Connectivity { edge_mode, ..Default::default() }
    }

    /// Register a layer. Idempotent.
    pub fn add_layer(&mut self, layer: LayerId) {
        self.layers.insert(layer);
    }

    /// All registered layers.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.iter().copied()
    }

    /// Declare a hard (symmetric) conductive pair. `a == b` is allowed and is
    /// how "same-layer connect" is expressed.
    pub fn connect_hard(&mut self, a: LayerId, b: LayerId) {
        self.add_layer(a);
        self.add_layer(b);
        self.conducts.insert((a, b), Conducts::Hard);
        self.conducts.insert((b, a), Conducts::Hard);
    }

    /// Declare a directed soft (rectifying) connection from `a` to `b`.
    pub fn connect_soft(&mut self, a: LayerId, b: LayerId) {
        self.add_layer(a);
        self.add_layer(b);
        self.conducts.insert((a, b), Conducts::SoftFromAToB);
    }

    /// Attach a layer to a global net.
    pub fn attach_global_net(&mut self, layer: LayerId, net: GlobalNetId) {
        self.add_layer(layer);
        self.global_nets.entry(layer).or_default().insert(net);
    }

    /// The global nets a layer is attached to.
    pub fn global_nets_of(&self, layer: LayerId) -> impl Iterator<Item = GlobalNetId> + '_ {
        self.global_nets.get(&layer).into_iter().flatten().copied()
    }

    /// The conductive relation between an ordered pair of layers.
    pub fn conducts(&self, a: LayerId, b: LayerId) -> Conducts {
        self.conducts.get(&(a, b)).copied().unwrap_or(Conducts::None)
    }

    /// The configured edge-interaction mode.
    pub fn edge_mode(&self) -> EdgeInteractionMode {
        self.edge_mode
    }

    /// `true` iff any layer pair drawn from `a` and `b` can conduct at all. Used
    /// as a fast cell-pair rejection before running the full box scanner (§4.3 Step B.1).
    pub fn any_shared_conductivity(&self, a: &FnvHashSet<LayerId>, b: &FnvHashSet<LayerId>) -> bool {
        for &la in a {
            for &lb in b {
                if self.conducts(la, lb) != Conducts::None {
                    return true;
                }
            }
        }
        false
    }

    /// `interacts(a, la, b, lb, trans)`: `true` iff `conducts(la, lb) == Hard`
    /// and the geometric predicate holds with `trans` applied to `b`. A soft
    /// connection never causes this to return `true` — it is never union-
    /// triggering, at any level of the hierarchy; see [`Conducts::SoftFromAToB`].
    /// Cheap when the layers never conduct, per §4.1.
    pub fn interacts<C: CoordinateType, S: ShapeVariant<C>>(
        &self,
        a: &S,
        la: LayerId,
        b: &S,
        lb: LayerId,
        trans: &crate::geometry::Transform<C>,
    ) -> bool {
        if self.conducts(la, lb) != Conducts::Hard {
            return false;
        }
        let b_placed = b.transformed_by(trans);
        a.interacts(&b_placed, self.edge_mode)
    }

    /// `true` iff `conducts(la, lb) == SoftFromAToB` and the geometric
    /// predicate holds — the soft counterpart of [`Connectivity::interacts`],
    /// used to detect upward-connection annotations (§9 Design Notes) without
    /// ever driving a union.
    pub fn soft_interacts<C: CoordinateType, S: ShapeVariant<C>>(
        &self,
        a: &S,
        la: LayerId,
        b: &S,
        lb: LayerId,
        trans: &crate::geometry::Transform<C>,
    ) -> bool {
        if self.conducts(la, lb) != Conducts::SoftFromAToB {
            return false;
        }
        let b_placed = b.transformed_by(trans);
        a.interacts(&b_placed, self.edge_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexGenerator;

    #[test]
    fn hard_connect_is_symmetric() {
        let mut gen = IndexGenerator::<LayerMarker>::default();
        let l1 = gen.next();
        let l2 = gen.next();
        let mut c = Connectivity::default();
        c.connect_hard(l1, l2);
        assert_eq!(c.conducts(l1, l2), Conducts::Hard);
        assert_eq!(c.conducts(l2, l1), Conducts::Hard);
    }

    #[test]
    fn soft_connect_is_directional() {
        let mut gen = IndexGenerator::<LayerMarker>::default();
        let l1 = gen.next();
        let l2 = gen.next();
        let mut c = Connectivity::default();
        c.connect_soft(l1, l2);
        assert_eq!(c.conducts(l1, l2), Conducts::SoftFromAToB);
        assert_eq!(c.conducts(l2, l1), Conducts::None);
    }

    #[test]
    fn unregistered_pair_does_not_conduct() {
        let mut gen = IndexGenerator::<LayerMarker>::default();
        let l1 = gen.next();
        let l2 = gen.next();
        let c = Connectivity::default();
        assert_eq!(c.conducts(l1, l2), Conducts::None);
    }
}
