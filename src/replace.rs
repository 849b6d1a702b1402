//! Range replacement.
//!
//! Edits that stay inside one leaf and bring at most a leaf's worth of new
//! elements are done in place: the leaf is spliced, an overfull leaf is split
//! in half and the new sibling handed to the parent, an underfull one is
//! merged with or topped up from a neighbour. Either outcome can repeat one
//! level up. Anything larger is done by splitting out the range, building the
//! replacement separately and concatenating the three pieces.

use std::ops::Range;

use crate::balance::{
    Merge, Partition, merge_or_distribute, pull_up_singular_nodes, split_evenly,
};
use crate::builder::Builder;
use crate::concat::concat;
use crate::context::{Context, Tracker};
use crate::node::Node;
use crate::split::split;
use crate::summary::Summary;

/// What a replacement took out of the tree.
pub(crate) enum Removed<S: Summary> {
    Elements(Vec<S::Element>),
    Tree(Node<S>),
}

/// How a node came out of an in-place edit.
enum Outcome<S: Summary> {
    Fits,
    Underflow,
    /// The node was split; this is its new right sibling.
    Overflow(Node<S>),
}

/// Replace the elements in `range` with `elements`.
pub(crate) fn replace<S: Summary, X: Tracker<S>>(
    root: &mut Node<S>,
    range: Range<usize>,
    elements: Vec<S::Element>,
    cx: &mut Context<X>,
) -> Removed<S> {
    assert!(
        range.start <= range.end && range.end <= root.len(),
        "range {:?} out of bounds for length {}",
        range,
        root.len()
    );

    if elements.len() <= cx.capacity.leaf && within_one_leaf(root, &range) {
        let (removed, outcome) = replace_in_node(root, range, elements, true, cx);
        if let Outcome::Overflow(sibling) = outcome {
            let left = std::mem::replace(root, Node::empty_leaf(&cx.capacity));
            *root = Node::inner(vec![left, sibling]);
            cx.tracker.adopt(root);
            tracing::trace!(height = root.height(), "replace grew the tree");
        }
        pull_up_singular_nodes(root, &mut cx.tracker);
        return Removed::Elements(removed);
    }

    tracing::trace!(
        start = range.start,
        end = range.end,
        inserted = elements.len(),
        "replacing through split and concat"
    );
    let whole = std::mem::replace(root, Node::empty_leaf(&cx.capacity));
    let (rest, suffix) = split(whole, range.end, cx);
    let (prefix, middle) = split(rest, range.start, cx);
    cx.tracker.forget_subtree(&middle);

    let mut builder = Builder::<S, X>::new(cx.capacity);
    builder.extend(elements);
    let (mut replacement, built) = builder.build();
    cx.tracker.absorb(built.tracker);

    concat(&mut replacement, suffix, cx);
    let mut result = prefix;
    concat(&mut result, replacement, cx);
    *root = result;
    return Removed::Tree(middle);
}

/// The child of `node` that holds all of `range`, with its element offset.
///
/// An empty range on a boundary between two children belongs to the left one.
fn owning_child<S: Summary>(node: &Node<S>, range: &Range<usize>) -> Option<(usize, usize)> {
    let mut offset = 0;
    for (k, child) in node.children().iter().enumerate() {
        let end = offset + child.len();
        if range.start >= offset && range.end <= end {
            return Some((k, offset));
        }
        if range.start < end {
            return None;
        }
        offset = end;
    }
    return None;
}

fn within_one_leaf<S: Summary>(root: &Node<S>, range: &Range<usize>) -> bool {
    let mut node = root;
    let mut range = range.clone();
    while !node.is_leaf() {
        let Some((k, offset)) = owning_child(node, &range) else {
            return false;
        };
        node = &node.children()[k];
        range = (range.start - offset)..(range.end - offset);
    }
    return true;
}

fn replace_in_node<S: Summary, X: Tracker<S>>(
    node: &mut Node<S>,
    range: Range<usize>,
    elements: Vec<S::Element>,
    is_root: bool,
    cx: &mut Context<X>,
) -> (Vec<S::Element>, Outcome<S>) {
    if node.is_leaf() {
        let removed = node.unique(&mut cx.tracker).splice_elements(range, elements);
        cx.tracker.forget_elements(&removed);
        cx.tracker.adopt(node);
        return (removed, settle(node, is_root, cx));
    }

    let Some((k, offset)) = owning_child(node, &range) else {
        panic!("range {:?} is not inside a single leaf", range);
    };
    let inner = (range.start - offset)..(range.end - offset);
    let raw = node.unique(&mut cx.tracker);
    let (removed, outcome) = replace_in_node(&mut raw.children_mut()[k], inner, elements, false, cx);

    match outcome {
        Outcome::Fits => raw.refresh(),
        Outcome::Overflow(sibling) => {
            raw.insert_child(k + 1, sibling);
            cx.tracker.adopt(node);
        }
        Outcome::Underflow => {
            let children = raw.children_mut();
            let (left, right) = if k > 0 { (k - 1, k) } else { (k, k + 1) };
            let (front, back) = children.split_at_mut(right);
            let merge = merge_or_distribute(
                &mut front[left],
                &mut back[0],
                Partition::Even,
                &cx.capacity,
                &mut cx.tracker,
            );
            if merge == Merge::Merged {
                let gone = raw.remove_child(right);
                cx.tracker.forget(&gone);
            } else {
                raw.refresh();
            }
        }
    }
    return (removed, settle(node, is_root, cx));
}

/// Split an overfull node, or report an underfull non-root one.
fn settle<S: Summary, X: Tracker<S>>(
    node: &mut Node<S>,
    is_root: bool,
    cx: &mut Context<X>,
) -> Outcome<S> {
    let height = node.height();
    if node.slot_count() > cx.capacity.slots_at(height) {
        return Outcome::Overflow(split_evenly(node, &mut cx.tracker));
    }
    if !is_root && node.slot_count() < cx.capacity.minimum_at(height) {
        return Outcome::Underflow;
    }
    return Outcome::Fits;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Capacity, IdIndex};
    use crate::fixtures::{TagSummary, Tagged, tags};

    type Cx = Context<IdIndex<u32>>;

    fn build(count: u32) -> (Node<TagSummary>, Cx) {
        let mut builder = Builder::<TagSummary, IdIndex<u32>>::new(Capacity::new(4, 4));
        builder.extend(tags(0..count));
        return builder.build();
    }

    fn ids(root: &Node<TagSummary>) -> Vec<u32> {
        return (0..root.len()).filter_map(|i| root.get(i)).map(|tag| tag.0).collect();
    }

    fn assert_valid(root: &Node<TagSummary>, cx: &Cx) {
        assert_eq!(root.check(&cx.capacity, true), Ok(()));
        assert_eq!(cx.tracker.check(root), Ok(()));
    }

    #[test]
    fn owning_child_prefers_the_left_on_boundaries() {
        let (root, _) = build(16);
        assert_eq!(owning_child(&root, &(4..4)), Some((0, 0)));
        assert_eq!(owning_child(&root, &(4..5)), Some((1, 4)));
        assert_eq!(owning_child(&root, &(3..5)), None);
    }

    #[test]
    fn small_edits_stay_in_place() {
        let (mut root, mut cx) = build(40);
        let removed = replace(&mut root, 5..7, vec![Tagged(100)], &mut cx);
        let Removed::Elements(removed) = removed else {
            panic!("expected the in-place path");
        };
        assert_eq!(removed, tags(5..7));

        let mut expected: Vec<u32> = (0..40).collect();
        expected.splice(5..7, [100]);
        assert_eq!(ids(&root), expected);
        assert_valid(&root, &cx);
    }

    #[test]
    fn repeated_inserts_split_leaves_upwards() {
        let (mut root, mut cx) = build(0);
        for i in 0..200 {
            let at = (i * 7) as usize % (root.len() + 1);
            replace(&mut root, at..at, vec![Tagged(i)], &mut cx);
            assert_valid(&root, &cx);
        }
        assert_eq!(root.len(), 200);
    }

    #[test]
    fn repeated_removals_merge_leaves_downwards() {
        let (mut root, mut cx) = build(120);
        while !root.is_empty() {
            let at = root.len() / 3;
            replace(&mut root, at..at + 1, Vec::new(), &mut cx);
            assert_valid(&root, &cx);
        }
        assert!(root.is_leaf());
    }

    #[test]
    fn large_edits_go_through_split_and_concat() {
        let (mut root, mut cx) = build(60);
        let removed = replace(&mut root, 10..50, tags(100..110), &mut cx);
        let Removed::Tree(middle) = removed else {
            panic!("expected the general path");
        };
        assert_eq!(ids(&middle), (10..50).collect::<Vec<_>>());

        let mut expected: Vec<u32> = (0..60).collect();
        expected.splice(10..50, 100..110);
        assert_eq!(ids(&root), expected);
        assert_valid(&root, &cx);
    }

    #[test]
    fn replacing_with_the_same_ids_keeps_them_indexed() {
        let (mut root, mut cx) = build(30);
        replace(&mut root, 0..30, tags(0..30), &mut cx);
        assert_valid(&root, &cx);
        replace(&mut root, 3..4, vec![Tagged(3)], &mut cx);
        assert_valid(&root, &cx);
    }
}
