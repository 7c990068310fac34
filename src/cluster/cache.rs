// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Interaction caches (C8): the instance-to-instance cluster-pair cache, local
//! to one `build` and bounded in size (§5 "the instance-to-instance cache
//! drops entries whose cluster-pair list exceeds ≈10 000 pairs"). Shared by
//! both the instance-to-instance pass (§4.3 Step B) and the local-to-instance
//! pass (§4.3 Step C) — the latter treats the cell currently being processed
//! as one side of the pair, with the identity-normalized instance transform
//! standing in for a relative transform between two instances.

use crate::cluster::arena::ClusterId;
use crate::geometry::Transform;
use crate::layout_model::CellIndex;
use fnv::FnvHashMap;
use iron_shapes::CoordinateType;
use std::hash::Hash;

/// Keyed by `(cell_a, cell_b, normalized relative transform)`, reused across
/// every placement of the same sub-hierarchy pattern (§4.3 Step B.2).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstancePairKey<C> {
    /// The first cell in the pair.
    pub cell_a: CellIndex,
    /// The second cell in the pair.
    pub cell_b: CellIndex,
    /// The relative transform mapping `cell_b`'s frame into `cell_a`'s, normalized
    /// so that geometrically identical placements share one cache entry.
    pub normalized_transform: Transform<C>,
}

/// The instance-to-instance cluster-pair cache, local to one `build` invocation.
pub struct InteractionCaches<C> {
    instance_pairs: FnvHashMap<InstancePairKey<C>, Vec<(ClusterId, ClusterId)>>,
    size_threshold: usize,
    instance_hits: u64,
    instance_misses: u64,
}

impl<C: CoordinateType + Hash + Eq> InteractionCaches<C> {
    /// Create an empty cache. `size_threshold` bounds it: an entry whose
    /// result list is longer than this is computed but never stored.
    pub fn new(size_threshold: usize) -> Self {
        InteractionCaches { instance_pairs: FnvHashMap::default(), size_threshold, instance_hits: 0, instance_misses: 0 }
    }

    /// Look up the instance-to-instance cache.
    pub fn get_instance_pairs(&mut self, key: &InstancePairKey<C>) -> Option<&[(ClusterId, ClusterId)]> {
        let hit = self.instance_pairs.get(key).map(Vec::as_slice);
        if hit.is_some() {
            self.instance_hits += 1;
        } else {
            self.instance_misses += 1;
        }
        hit
    }

    /// Store an instance-to-instance result, unless it exceeds the configured
    /// size threshold (in which case the caller already computed it; it is
    /// simply not remembered, per §5).
    pub fn put_instance_pairs(&mut self, key: InstancePairKey<C>, pairs: Vec<(ClusterId, ClusterId)>) {
        if pairs.len() <= self.size_threshold {
            self.instance_pairs.insert(key, pairs);
        }
    }

    /// Hit/miss counters, logged at `info!` once `build` finishes.
    pub fn stats(&self) -> CacheStats {
        CacheStats { instance_hits: self.instance_hits, instance_misses: self.instance_misses }
    }

    /// Discard all cached entries and counters.
    pub fn clear(&mut self) {
        self.instance_pairs.clear();
        self.instance_hits = 0;
        self.instance_misses = 0;
    }
}

/// Cache hit/miss summary, logged at `info!` once the hierarchical pass finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Instance-to-instance cache hits.
    pub instance_hits: u64,
    /// Instance-to-instance cache misses.
    pub instance_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexGenerator;
    use iron_shapes::prelude::Point;

    #[test]
    fn oversized_results_are_not_cached() {
        let mut gen = IndexGenerator::<crate::layout_model::CellMarker>::default();
        let a = gen.next();
        let b = gen.next();
        let mut caches: InteractionCaches<i32> = InteractionCaches::new(1);
        let key = InstancePairKey { cell_a: a, cell_b: b, normalized_transform: Transform::identity() };
        let mut arena = crate::cluster::arena::ClusterArena::<()>::new();
        let c1 = arena.insert(());
        let c2 = arena.insert(());
        let c3 = arena.insert(());
        caches.put_instance_pairs(key.clone(), vec![(c1, c2), (c1, c3)]);
        assert!(caches.get_instance_pairs(&key).is_none());
    }

    #[test]
    fn cache_hit_after_put() {
        let mut gen = IndexGenerator::<crate::layout_model::CellMarker>::default();
        let a = gen.next();
        let b = gen.next();
        let mut caches: InteractionCaches<i32> = InteractionCaches::new(100);
        let key = InstancePairKey { cell_a: a, cell_b: b, normalized_transform: Transform::displacement(Point::from((1, 1))) };
        let mut arena = crate::cluster::arena::ClusterArena::<()>::new();
        let c1 = arena.insert(());
        let c2 = arena.insert(());
        caches.put_instance_pairs(key.clone(), vec![(c1, c2)]);
        assert_eq!(caches.get_instance_pairs(&key), Some(&[(c1, c2)][..]));
        let stats = caches.stats();
        assert_eq!(stats.instance_hits, 1);
    }
}
