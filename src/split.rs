//! Splitting.
//!
//! A split cuts every node on the path to the split position in two. Cuts
//! that fall between children just slice the child array; cuts inside a child
//! recurse and reassemble. The two results are then repaired along the cut:
//! the left tree's right spine and the right tree's left spine may hold
//! underfull nodes, which are merged with or topped up from their inner
//! neighbour in top-down passes, before single-child roots are collapsed.

use crate::balance::{Merge, Partition, merge_or_distribute, pull_up_singular_nodes};
use crate::context::{Capacity, Context, Tracker};
use crate::node::Node;
use crate::summary::Summary;

/// Split the tree under `root` into the elements before `at` and the rest.
pub(crate) fn split<S: Summary, X: Tracker<S>>(
    root: Node<S>,
    at: usize,
    cx: &mut Context<X>,
) -> (Node<S>, Node<S>) {
    assert!(at <= root.len(), "split position {} out of range for length {}", at, root.len());
    if at == 0 {
        return (Node::empty_leaf(&cx.capacity), root);
    }
    if at == root.len() {
        return (root, Node::empty_leaf(&cx.capacity));
    }

    let mut left = root;
    let mut right = split_node(&mut left, at, cx);

    // A merge below can leave an already fixed spine node short, so repeat
    // until a pass finds nothing to do. Every extra pass merges away a node.
    while !right_spine_sound(&left, &cx.capacity) {
        zip_fix_right(&mut left, cx);
    }
    pull_up_singular_nodes(&mut left, &mut cx.tracker);
    while !left_spine_sound(&right, &cx.capacity) {
        zip_fix_left(&mut right, cx);
    }
    pull_up_singular_nodes(&mut right, &mut cx.tracker);

    tracing::trace!(at, left = left.height(), right = right.height(), "split tree");
    return (left, right);
}

/// Cut `node` at `at` (strictly inside it), returning the right part.
fn split_node<S: Summary, X: Tracker<S>>(
    node: &mut Node<S>,
    at: usize,
    cx: &mut Context<X>,
) -> Node<S> {
    if node.is_leaf() {
        let tail = node.unique(&mut cx.tracker).split_off(at);
        let right = Node::from_slots(tail);
        cx.tracker.adopt(&right);
        return right;
    }

    let mut offset = 0;
    let mut k = 0;
    for (i, child) in node.children().iter().enumerate() {
        k = i;
        if at <= offset + child.len() {
            break;
        }
        offset += child.len();
    }
    let within = at - offset;

    let raw = node.unique(&mut cx.tracker);
    let tail = if within == raw.children_mut()[k].len() {
        raw.split_off_children(k + 1)
    } else {
        let right_k = split_node(&mut raw.children_mut()[k], within, cx);
        let mut tail = raw.split_off_children(k + 1);
        tail.insert(0, right_k);
        tail
    };

    let right = Node::inner(tail);
    cx.tracker.adopt(&right);
    return right;
}

/// Whether no node on the right spine below `node` underflows where it has a
/// left sibling to borrow from.
fn right_spine_sound<S: Summary>(node: &Node<S>, capacity: &Capacity) -> bool {
    let mut node = node;
    while let Some(last) = node.children().last() {
        if node.slot_count() >= 2 && last.slot_count() < capacity.minimum_at(last.height()) {
            return false;
        }
        node = last;
    }
    return true;
}

fn left_spine_sound<S: Summary>(node: &Node<S>, capacity: &Capacity) -> bool {
    let mut node = node;
    while let Some(first) = node.children().first() {
        if node.slot_count() >= 2 && first.slot_count() < capacity.minimum_at(first.height()) {
            return false;
        }
        node = first;
    }
    return true;
}

fn zip_fix_right<S: Summary, X: Tracker<S>>(node: &mut Node<S>, cx: &mut Context<X>) {
    if right_spine_sound(node, &cx.capacity) {
        return;
    }
    let raw = node.unique(&mut cx.tracker);
    let children = raw.children_mut();
    let count = children.len();
    if count >= 2 {
        let last = &children[count - 1];
        if last.slot_count() < cx.capacity.minimum_at(last.height()) {
            let (front, back) = children.split_at_mut(count - 1);
            let merge = merge_or_distribute(
                &mut front[count - 2],
                &mut back[0],
                Partition::Compact,
                &cx.capacity,
                &mut cx.tracker,
            );
            if merge == Merge::Merged {
                let gone = raw.remove_child(count - 1);
                cx.tracker.forget(&gone);
            }
        }
    }
    raw.refresh();
    let children = raw.children_mut();
    let last = children.len() - 1;
    zip_fix_right(&mut children[last], cx);
}

fn zip_fix_left<S: Summary, X: Tracker<S>>(node: &mut Node<S>, cx: &mut Context<X>) {
    if left_spine_sound(node, &cx.capacity) {
        return;
    }
    let raw = node.unique(&mut cx.tracker);
    let children = raw.children_mut();
    if children.len() >= 2 {
        let first = &children[0];
        if first.slot_count() < cx.capacity.minimum_at(first.height()) {
            let (front, back) = children.split_at_mut(1);
            let merge = merge_or_distribute(
                &mut front[0],
                &mut back[0],
                Partition::Even,
                &cx.capacity,
                &mut cx.tracker,
            );
            if merge == Merge::Merged {
                let gone = raw.remove_child(1);
                cx.tracker.forget(&gone);
            }
        }
    }
    raw.refresh();
    zip_fix_left(&mut raw.children_mut()[0], cx);
}
