// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shape repository (C2): interns polygon hulls so that identical polygons
//! share one heap allocation, grounded on
//! `original_source/src/db/db/dbShapeRepository.h`'s `PolygonRef`/`PolygonRefData`
//! sharing scheme ("as many duplicate polygons as possible share one heap
//! allocation").

use fnv::FnvHashMap;
use iron_shapes::prelude::Point;
use iron_shapes::CoordinateType;
use std::hash::Hash;
use std::rc::Rc;

/// Interns polygon hulls by structural equality of their point sequence.
/// Downstream code can use `Rc::ptr_eq` on two hulls handed out by the same
/// repository as a fast pre-check before falling back to full geometric
/// equality, since equal hulls are always backed by the same allocation.
pub struct ShapeRepository<C: Hash + Eq> {
    hulls: FnvHashMap<Vec<C>, Rc<Vec<Point<C>>>>,
}

impl<C: CoordinateType + Hash + Eq> Default for ShapeRepository<C> {
    fn default() -> Self {
        ShapeRepository { hulls: FnvHashMap::default() }
    }
}

impl<C: CoordinateType + Hash + Eq> ShapeRepository<C> {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a hull, returning a shared handle. If an equal hull was already
    /// interned, the existing allocation is reused.
    pub fn intern_hull(&mut self, hull: Vec<Point<C>>) -> Rc<Vec<Point<C>>> {
        let key = flatten(&hull);
        if let Some(existing) = self.hulls.get(&key) {
            return existing.clone();
        }
        let rc = Rc::new(hull);
        self.hulls.insert(key, rc.clone());
        rc
    }

    /// The number of distinct hulls currently interned.
    pub fn len(&self) -> usize {
        self.hulls.len()
    }

    /// `true` if no hulls are interned.
    pub fn is_empty(&self) -> bool {
        self.hulls.is_empty()
    }

    /// Drop all interned hulls, e.g. before a fresh `build`.
    pub fn clear(&mut self) {
        self.hulls.clear();
    }
}

fn flatten<C: CoordinateType + Hash + Eq>(hull: &[Point<C>]) -> Vec<C> {
    hull.iter()
        .flat_map(|&p| {
            let [x, y]: [C; 2] = p.into();
            [x, y]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_hulls_share_one_allocation() {
        let mut repo: ShapeRepository<i32> = ShapeRepository::new();
        let a = repo.intern_hull(vec![Point::from((0, 0)), Point::from((10, 0)), Point::from((10, 10))]);
        let b = repo.intern_hull(vec![Point::from((0, 0)), Point::from((10, 0)), Point::from((10, 10))]);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn distinct_hulls_get_distinct_allocations() {
        let mut repo: ShapeRepository<i32> = ShapeRepository::new();
        let a = repo.intern_hull(vec![Point::from((0, 0)), Point::from((10, 0)), Point::from((10, 10))]);
        let b = repo.intern_hull(vec![Point::from((0, 0)), Point::from((20, 0)), Point::from((20, 20))]);
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(repo.len(), 2);
    }
}
