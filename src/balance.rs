//! Rebalancing primitives shared by concat, split and replace.
//!
//! All of these take nodes that are about to change and go through
//! [`Node::unique`], so shared storage is cloned before it is touched. None of
//! them refresh the header of the parent that holds the nodes; callers edit
//! children through `children_mut` and refresh the parent afterwards.

use crate::context::{Capacity, Tracker};
use crate::node::Node;
use crate::summary::Summary;

/// How slots are shared out between two siblings that do not fit in one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Partition {
    /// The first node keeps the larger half.
    Even,
    /// The first node is filled to capacity, unless that would leave the
    /// second one underflowing.
    Compact,
}

impl Partition {
    /// Number of slots the first node keeps out of `total`.
    pub(crate) fn first_share(self, total: usize, capacity: usize) -> usize {
        let even = total.div_ceil(2);
        match self {
            Partition::Even => return even,
            Partition::Compact => {
                if total >= capacity + capacity / 2 {
                    return capacity;
                }
                return even;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Merge {
    /// Every slot moved into the first node; the second is empty and must be
    /// removed (and forgotten) by the caller.
    Merged,
    /// Both nodes are non-empty and hold a legal number of slots.
    Distributed,
}

/// Merge `b` into `a` if they fit in one node, otherwise move slots across the
/// boundary so that `a` holds its `policy` share.
pub(crate) fn merge_or_distribute<S: Summary, X: Tracker<S>>(
    a: &mut Node<S>,
    b: &mut Node<S>,
    policy: Partition,
    capacity: &Capacity,
    tracker: &mut X,
) -> Merge {
    debug_assert_eq!(a.height(), b.height(), "only siblings can be merged");
    let limit = capacity.slots_at(a.height());
    let total = a.slot_count() + b.slot_count();

    if total <= limit {
        let slots = b.unique(tracker).take_all();
        a.unique(tracker).append(slots);
        tracker.adopt(a);
        return Merge::Merged;
    }

    let keep = policy.first_share(total, limit);
    let have = a.slot_count();
    if keep > have {
        let moved = b.unique(tracker).take_front(keep - have);
        a.unique(tracker).append(moved);
        tracker.adopt(a);
    } else if keep < have {
        let moved = a.unique(tracker).split_off(keep);
        b.unique(tracker).prepend(moved);
        tracker.adopt(b);
    }
    return Merge::Distributed;
}

/// Move the upper half of an overfull node into a new right sibling.
pub(crate) fn split_evenly<S: Summary, X: Tracker<S>>(
    node: &mut Node<S>,
    tracker: &mut X,
) -> Node<S> {
    let keep = node.slot_count().div_ceil(2);
    let tail = node.unique(tracker).split_off(keep);
    let sibling = Node::from_slots(tail);
    tracker.adopt(&sibling);
    return sibling;
}

/// Replace an inner root with its only child until the root has two or more
/// children or is a leaf.
pub(crate) fn pull_up_singular_nodes<S: Summary, X: Tracker<S>>(
    root: &mut Node<S>,
    tracker: &mut X,
) {
    while !root.is_leaf() && root.slot_count() == 1 {
        let child = root.children()[0].clone();
        tracker.forget(root);
        tracker.forget(&child);
        *root = child;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{IdIndex, Untracked};
    use crate::fixtures::{TagSummary, tags};

    fn capacity() -> Capacity {
        return Capacity::new(8, 4);
    }

    fn ids(node: &Node<TagSummary>) -> Vec<u32> {
        return node.elements().iter().map(|tag| tag.0).collect();
    }

    #[test]
    fn even_and_compact_shares() {
        assert_eq!(Partition::Even.first_share(9, 8), 5);
        assert_eq!(Partition::Even.first_share(10, 8), 5);
        assert_eq!(Partition::Compact.first_share(12, 8), 8);
        // Filling the first node would leave 2 of 8, below the threshold.
        assert_eq!(Partition::Compact.first_share(10, 8), 5);
    }

    #[test]
    fn merges_when_both_fit() {
        let mut a = Node::<TagSummary>::leaf(tags(0..3));
        let mut b = Node::<TagSummary>::leaf(tags(3..7));
        let merge = merge_or_distribute(&mut a, &mut b, Partition::Even, &capacity(), &mut Untracked);
        assert_eq!(merge, Merge::Merged);
        assert_eq!(ids(&a), (0..7).collect::<Vec<_>>());
        assert!(b.is_empty());
    }

    #[test]
    fn distributes_evenly_from_the_right() {
        let mut a = Node::<TagSummary>::leaf(tags(0..2));
        let mut b = Node::<TagSummary>::leaf(tags(2..10));
        let merge = merge_or_distribute(&mut a, &mut b, Partition::Even, &capacity(), &mut Untracked);
        assert_eq!(merge, Merge::Distributed);
        assert_eq!(ids(&a), (0..5).collect::<Vec<_>>());
        assert_eq!(ids(&b), (5..10).collect::<Vec<_>>());
        assert_eq!(a.summary().total, (0..5).sum::<u64>());
    }

    #[test]
    fn compact_fills_the_left_node() {
        let mut a = Node::<TagSummary>::leaf(tags(0..6));
        let mut b = Node::<TagSummary>::leaf(tags(6..12));
        merge_or_distribute(&mut a, &mut b, Partition::Compact, &capacity(), &mut Untracked);
        assert_eq!(a.len(), 8);
        assert_eq!(ids(&b), vec![8, 9, 10, 11]);
    }

    #[test]
    fn distributing_to_the_right_keeps_order() {
        let mut a = Node::<TagSummary>::leaf(tags(0..8));
        let mut b = Node::<TagSummary>::leaf(tags(8..10));
        merge_or_distribute(&mut a, &mut b, Partition::Even, &capacity(), &mut Untracked);
        assert_eq!(ids(&a), (0..5).collect::<Vec<_>>());
        assert_eq!(ids(&b), (5..10).collect::<Vec<_>>());
    }

    #[test]
    fn split_evenly_keeps_the_larger_half() {
        let mut node = Node::<TagSummary>::leaf(tags(0..9));
        let sibling = split_evenly(&mut node, &mut Untracked);
        assert_eq!(node.len(), 5);
        assert_eq!(ids(&sibling), vec![5, 6, 7, 8]);
    }

    #[test]
    fn pull_up_collapses_chains() {
        let leaf = Node::<TagSummary>::leaf(tags(0..3));
        let leaf_id = leaf.id();
        let mut root = Node::inner(vec![Node::inner(vec![leaf])]);
        let mut index = IdIndex::<u32>::default();
        Tracker::<TagSummary>::rebuild(&mut index, &root);

        pull_up_singular_nodes(&mut root, &mut index);

        assert!(root.is_leaf());
        assert_eq!(root.id(), leaf_id);
        assert_eq!(Tracker::<TagSummary>::check(&index, &root), Ok(()));
    }
}
