// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! A 2-D box scanner: given a set of keyed boxes, emits every pair whose bounds
//! touch (closed overlap). Backed by `rstar::RTree`, the same spatial index the
//! teacher uses in `src/region_search.rs` for shape and cell-instance region
//! queries. Shared by the local clustering builder (C5) and the hierarchical
//! builder's instance-to-instance and local-to-instance passes (C9).

use iron_shapes::prelude::Rect;
use iron_shapes::CoordinateType;
use rstar::{RTree, RTreeObject, AABB};

struct Entry<K, C> {
    key: K,
    bbox: Rect<C>,
}

impl<K, C: CoordinateType> RTreeObject for Entry<K, C> {
    type Envelope = AABB<[C; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.lower_left().into(), self.bbox.upper_right().into())
    }
}

/// A box scanner over a fixed set of `(key, bbox)` entries, keyed by an
/// arbitrary `Copy` key (shape handle, cluster id, instance index...).
pub struct BoxScanner<K, C: CoordinateType> {
    tree: RTree<Entry<K, C>>,
}

impl<K: Copy, C: CoordinateType> BoxScanner<K, C> {
    /// Bulk-build a scanner from an iterator of `(key, bbox)` pairs.
    pub fn build(entries: impl IntoIterator<Item = (K, Rect<C>)>) -> Self {
        let entries: Vec<Entry<K, C>> = entries.into_iter().map(|(key, bbox)| Entry { key, bbox }).collect();
        BoxScanner { tree: RTree::bulk_load(entries) }
    }

    /// All keys whose box touches `bbox`.
    pub fn touching(&self, bbox: Rect<C>) -> impl Iterator<Item = K> + '_ {
        let envelope = AABB::from_corners(bbox.lower_left().into(), bbox.upper_right().into());
        self.tree.locate_in_envelope_intersecting(&envelope).map(|e| e.key)
    }

    /// Every unordered pair of distinct entries whose boxes touch, emitted in a
    /// deterministic order derived from insertion order (§5 "Ordering guarantees"):
    /// entries are visited in the order they were built, and for each entry only
    /// pairs with later-indexed entries are reported, which avoids duplicate pairs
    /// without needing a seen-set.
    pub fn touching_pairs(&self) -> Vec<(K, K)>
    where
        K: PartialEq,
    {
        let all: Vec<&Entry<K, C>> = self.tree.iter().collect();
        let mut pairs = Vec::new();
        for (i, a) in all.iter().enumerate() {
            let envelope = AABB::from_corners(a.bbox.lower_left().into(), a.bbox.upper_right().into());
            for b in self.tree.locate_in_envelope_intersecting(&envelope) {
                let j = all.iter().position(|e| std::ptr::eq(*e, b)).unwrap();
                if j > i {
                    pairs.push((a.key, b.key));
                }
            }
        }
        pairs
    }

    /// Number of entries in the scanner.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// `true` if the scanner holds no entries.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iron_shapes::prelude::Point;

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Rect<i32> {
        Rect::new(Point::from((x0, y0)), Point::from((x1, y1)))
    }

    #[test]
    fn touching_finds_overlapping_boxes() {
        let scanner = BoxScanner::build([(0u32, rect(0, 0, 10, 10)), (1u32, rect(5, 5, 15, 15)), (2u32, rect(100, 100, 110, 110))]);
        let hits: Vec<u32> = scanner.touching(rect(0, 0, 10, 10)).collect();
        assert!(hits.contains(&0));
        assert!(hits.contains(&1));
        assert!(!hits.contains(&2));
    }

    #[test]
    fn touching_pairs_reports_each_pair_once() {
        let scanner = BoxScanner::build([(0u32, rect(0, 0, 10, 10)), (1u32, rect(5, 5, 15, 15)), (2u32, rect(100, 100, 110, 110))]);
        let pairs = scanner.touching_pairs();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0] == (0, 1) || pairs[0] == (1, 0));
    }

    #[test]
    fn edge_touching_boxes_count_as_touching() {
        let scanner = BoxScanner::build([(0u32, rect(0, 0, 10, 10)), (1u32, rect(10, 0, 20, 10))]);
        assert_eq!(scanner.touching_pairs().len(), 1);
    }
}
