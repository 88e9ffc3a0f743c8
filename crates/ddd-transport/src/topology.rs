//! Spanning tree used by Concentrate and Spread.

use ddd_core::Rank;

/// One rank's view of the spanning tree over all ranks.
///
/// The tree is a complete k-ary tree in rank order rooted at rank 0: the
/// children of rank `r` are `k*r + 1 ..= k*r + k`, restricted to the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeTopology {
    rank: Rank,
    size: usize,
    parent: Option<Rank>,
    children: Vec<Rank>,
}

impl TreeTopology {
    /// Complete tree with `arity` children per internal node.
    ///
    /// # Panics
    /// If `arity` is zero or `rank` is not part of the run.
    pub fn with_arity(rank: Rank, size: usize, arity: usize) -> Self {
        assert!(arity > 0, "tree arity must be positive");
        assert!(
            rank.index() < size,
            "rank {rank} not part of a run of {size} ranks"
        );

        let r = rank.index();
        let parent = if r == 0 {
            None
        } else {
            Some(Rank(((r - 1) / arity) as u32))
        };
        let first = r * arity + 1;
        let children = (first..first + arity)
            .filter(|&c| c < size)
            .map(|c| Rank(c as u32))
            .collect();

        Self {
            rank,
            size,
            parent,
            children,
        }
    }

    /// This rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of ranks in the run.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Parent rank, `None` at the root.
    pub fn parent(&self) -> Option<Rank> {
        self.parent
    }

    /// Child ranks in ascending order.
    pub fn children(&self) -> &[Rank] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_rank() {
        let tree = TreeTopology::with_arity(Rank(0), 1, 2);
        assert!(tree.is_root());
        assert!(tree.children().is_empty());
    }

    #[test]
    fn test_binary_shape() {
        let root = TreeTopology::with_arity(Rank(0), 6, 2);
        assert_eq!(root.children(), &[Rank(1), Rank(2)]);

        let mid = TreeTopology::with_arity(Rank(2), 6, 2);
        assert_eq!(mid.parent(), Some(Rank(0)));
        assert_eq!(mid.children(), &[Rank(5)]);

        let leaf = TreeTopology::with_arity(Rank(4), 6, 2);
        assert_eq!(leaf.parent(), Some(Rank(1)));
        assert!(leaf.children().is_empty());
    }

    #[test]
    fn test_every_rank_has_one_parent() {
        for size in 1..20 {
            for arity in 1..4 {
                let mut seen = vec![0usize; size];
                for rank in Rank::all(size) {
                    for child in TreeTopology::with_arity(rank, size, arity).children() {
                        seen[child.index()] += 1;
                        assert_eq!(
                            TreeTopology::with_arity(*child, size, arity).parent(),
                            Some(rank)
                        );
                    }
                }
                assert_eq!(seen[0], 0);
                assert!(seen[1..].iter().all(|&n| n == 1));
            }
        }
    }

    proptest! {
        #[test]
        fn every_rank_reaches_the_root(
            size in 1usize..200,
            arity in 1usize..5,
            pick in any::<prop::sample::Index>(),
        ) {
            let mut rank = Rank(pick.index(size) as u32);
            let mut hops = 0;
            while let Some(parent) = TreeTopology::with_arity(rank, size, arity).parent() {
                prop_assert!(parent.index() < rank.index());
                rank = parent;
                hops += 1;
            }
            prop_assert_eq!(rank, Rank(0));
            prop_assert!(hops < size);
        }
    }
}
