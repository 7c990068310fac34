// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Weighted union-find (disjoint-set), used by the local clustering builder
//! (§4.2) and by the hierarchical builder's pending-merge resolution (§4.3 Step D.3).
//! Per §9 Design Notes: "an arena + parent-pointer DSU with path halving is
//! equivalent and simpler" than the source's move-list-of-pointers approach.

/// A disjoint-set over `0..n` elements with union-by-size and path halving.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    /// Create a union-find with `n` singleton sets.
    pub fn new(n: usize) -> Self {
        UnionFind { parent: (0..n).collect(), size: vec![1; n] }
    }

    /// Add one more singleton set, returning its index.
    pub fn push(&mut self) -> usize {
        let i = self.parent.len();
        self.parent.push(i);
        self.size.push(1);
        i
    }

    /// Find the representative of `x`'s set, halving the path as it walks up.
    pub fn find(&mut self, x: usize) -> usize {
        let mut x = x;
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Union the sets containing `a` and `b`, merging the smaller into the
    /// larger (weighted union, per §4.2 "always merge the smaller list into
    /// the larger"). Returns the representative of the merged set.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        big
    }

    /// `true` iff `a` and `b` are currently in the same set.
    pub fn same_set(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// The number of elements tracked.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// `true` if no elements have been added.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_merges_sets() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(1, 2);
        assert!(uf.same_set(0, 2));
        assert!(!uf.same_set(0, 3));
    }

    #[test]
    fn weighted_union_keeps_larger_root() {
        let mut uf = UnionFind::new(4);
        uf.union(0, 1);
        uf.union(0, 2);
        let big_root = uf.find(0);
        uf.union(big_root, 3);
        assert!(uf.same_set(0, 3));
        assert!(uf.same_set(1, 3));
    }
}
