//! Concatenation.
//!
//! The shorter operand is attached at the matching depth of the taller one's
//! outer spine. Overflow bubbles up as new right siblings; a sibling that
//! reaches the top grows the tree by one level. When the right operand is the
//! taller one, its children are fed in one at a time instead.

use crate::balance::{Merge, Partition, merge_or_distribute, pull_up_singular_nodes, split_evenly};
use crate::context::{Context, Tracker};
use crate::node::{Node, Slots};
use crate::summary::Summary;

/// Append the tree under `other` after the tree under `root`.
pub(crate) fn concat<S: Summary, X: Tracker<S>>(
    root: &mut Node<S>,
    other: Node<S>,
    cx: &mut Context<X>,
) {
    if other.is_empty() {
        return;
    }
    if root.is_empty() {
        cx.tracker.forget(&other);
        *root = other;
        return;
    }

    if other.height() > root.height() {
        cx.tracker.forget(&other);
        if let Slots::Inner(children) = other.into_slots() {
            for child in children {
                concat(root, child, cx);
            }
        }
        return;
    }

    if let Some(sibling) = append_at_depth(root, other, cx) {
        let left = std::mem::replace(root, Node::empty_leaf(&cx.capacity));
        *root = Node::inner(vec![left, sibling]);
        cx.tracker.adopt(root);
        tracing::trace!(height = root.height(), len = root.len(), "concat grew the tree");
    }
    pull_up_singular_nodes(root, &mut cx.tracker);
}

/// Attach `other` as the last subtree at its own height under `node`.
///
/// Returns a new right sibling for `node` if it overflowed.
fn append_at_depth<S: Summary, X: Tracker<S>>(
    node: &mut Node<S>,
    other: Node<S>,
    cx: &mut Context<X>,
) -> Option<Node<S>> {
    if node.height() == other.height() {
        return join_siblings(node, other, cx);
    }

    let raw = node.unique(&mut cx.tracker);
    let children = raw.children_mut();
    let last = children.len() - 1;
    match append_at_depth(&mut children[last], other, cx) {
        Some(overflow) => {
            raw.insert_child(last + 1, overflow);
            cx.tracker.adopt(node);
        }
        None => {
            raw.refresh();
            return None;
        }
    }

    if node.slot_count() > cx.capacity.inner {
        return Some(split_evenly(node, &mut cx.tracker));
    }
    return None;
}

/// Put `b` after `a`, merging them if they fit and evening them out if
/// either is underfull. Returns `b` when it still has to be attached.
fn join_siblings<S: Summary, X: Tracker<S>>(
    a: &mut Node<S>,
    b: Node<S>,
    cx: &mut Context<X>,
) -> Option<Node<S>> {
    let mut b = b;
    let limit = cx.capacity.slots_at(a.height());
    let minimum = limit / 2;
    let fits = a.slot_count() + b.slot_count() <= limit;
    if fits || a.slot_count() <= minimum || b.slot_count() <= minimum {
        let merge = merge_or_distribute(a, &mut b, Partition::Even, &cx.capacity, &mut cx.tracker);
        if merge == Merge::Merged {
            cx.tracker.forget(&b);
            return None;
        }
    }
    return Some(b);
}
