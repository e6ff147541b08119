use std::collections::HashMap;
use std::hash::Hash;

/// Disjoint sets with path compression and union by rank. Elements are added on first use.
#[derive(Debug)]
pub(crate) struct UnionFind<T> {
    parent: HashMap<T, T>,
    rank: HashMap<T, u32>,
}

impl<T: Copy + Eq + Hash> UnionFind<T> {
    pub(crate) fn new() -> Self {
        Self {
            parent: HashMap::new(),
            rank: HashMap::new(),
        }
    }

    pub(crate) fn find(&mut self, x: T) -> T {
        let mut root = x;
        loop {
            match self.parent.get(&root) {
                Some(&parent) if parent != root => root = parent,
                Some(_) => break,
                None => {
                    self.parent.insert(x, x);
                    self.rank.insert(x, 0);
                    return x;
                }
            }
        }
        let mut node = x;
        while node != root {
            let next = self.parent[&node];
            self.parent.insert(node, root);
            node = next;
        }
        root
    }

    pub(crate) fn union(&mut self, x: T, y: T) -> bool {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return false;
        }

        let rank_x = self.rank[&root_x];
        let rank_y = self.rank[&root_y];
        if rank_x < rank_y {
            self.parent.insert(root_x, root_y);
        } else if rank_x > rank_y {
            self.parent.insert(root_y, root_x);
        } else {
            self.parent.insert(root_y, root_x);
            self.rank.insert(root_x, rank_x + 1);
        }
        true
    }

    /// Every element seen so far.
    pub(crate) fn elements(&self) -> Vec<T> {
        self.parent.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_transitively() {
        let mut sets = UnionFind::new();
        assert!(sets.union(1, 2));
        assert!(sets.union(3, 4));
        assert!(!sets.union(2, 1));
        assert_ne!(sets.find(1), sets.find(3));
        assert!(sets.union(2, 4));
        assert_eq!(sets.find(1), sets.find(3));
        assert_eq!(sets.find(9), 9);
        assert_eq!(sets.elements().len(), 5);
    }
}
