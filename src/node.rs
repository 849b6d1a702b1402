//! Node storage.
//!
//! A tree is made of [`Node`]s: cheap `Arc` handles to raw storage holding
//! either child nodes (inner) or elements (leaf), plus a cached header:
//!
//! - `height`: 0 for leaves, `child.height + 1` for inner nodes
//! - `len`: number of elements in the subtree
//! - `summary`: aggregate summary of the subtree
//!
//! Storage is copy-on-write. Handles are shared freely between trees produced
//! by split, concat and replace; before any in-place edit the editing code
//! calls [`Node::unique`], which clones the storage when it is referenced
//! elsewhere. A clone is a different storage and gets a fresh [`NodeId`]; the
//! identity tracker is told about it before the caller sees the clone.
//!
//! Leaf header updates are incremental (add what was inserted, subtract what
//! was removed). Inner header updates re-scan the child array, which is small.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::{Capacity, Tracker};
use crate::error::InvariantError;
use crate::summary::Summary;

/// Process-unique identity of one node storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    fn fresh() -> NodeId {
        return NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed));
    }
}

/// The slots of a node: exactly one of children or elements.
pub(crate) enum Slots<S: Summary> {
    Inner(Vec<Node<S>>),
    Leaf(Vec<S::Element>),
}

impl<S: Summary> Slots<S> {
    pub(crate) fn len(&self) -> usize {
        match self {
            Slots::Inner(children) => return children.len(),
            Slots::Leaf(elements) => return elements.len(),
        }
    }
}

impl<S: Summary> Clone for Slots<S> {
    fn clone(&self) -> Slots<S> {
        match self {
            Slots::Inner(children) => return Slots::Inner(children.clone()),
            Slots::Leaf(elements) => return Slots::Leaf(elements.clone()),
        }
    }
}

/// Node storage behind the `Arc`.
pub(crate) struct RawNode<S: Summary> {
    pub(crate) id: NodeId,
    pub(crate) height: u8,
    pub(crate) len: usize,
    pub(crate) summary: S,
    pub(crate) slots: Slots<S>,
}

impl<S: Summary> Clone for RawNode<S> {
    /// A clone is a different storage, so it gets its own identity.
    fn clone(&self) -> RawNode<S> {
        return RawNode {
            id: NodeId::fresh(),
            height: self.height,
            len: self.len,
            summary: self.summary.clone(),
            slots: self.slots.clone(),
        };
    }
}

impl<S: Summary> RawNode<S> {
    fn new(slots: Slots<S>) -> RawNode<S> {
        let mut raw = RawNode {
            id: NodeId::fresh(),
            height: 0,
            len: 0,
            summary: S::zero(),
            slots,
        };
        raw.refresh();
        return raw;
    }

    /// Recompute the whole header from the slots.
    pub(crate) fn refresh(&mut self) {
        match &self.slots {
            Slots::Leaf(elements) => {
                self.height = 0;
                self.len = elements.len();
                self.summary = S::summarize(elements);
            }
            Slots::Inner(children) => {
                self.height = children.first().map_or(1, |child| child.raw.height + 1);
                self.len = children.iter().map(|child| child.len()).sum();
                self.summary = S::sum(children.iter().map(|child| child.summary()));
            }
        }
    }

    #[inline(always)]
    pub(crate) fn slot_count(&self) -> usize {
        return self.slots.len();
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Node<S>> {
        match &mut self.slots {
            Slots::Inner(children) => return children,
            Slots::Leaf(_) => panic!("leaf nodes have no children"),
        }
    }

    fn elements_mut(&mut self) -> &mut Vec<S::Element> {
        match &mut self.slots {
            Slots::Leaf(elements) => return elements,
            Slots::Inner(_) => panic!("inner nodes have no elements"),
        }
    }

    /// Replace `range` of a leaf's elements, returning what was removed.
    pub(crate) fn splice_elements(
        &mut self,
        range: Range<usize>,
        replacement: Vec<S::Element>,
    ) -> Vec<S::Element> {
        let added = S::summarize(&replacement);
        let inserted = replacement.len();
        let removed: Vec<S::Element> = self.elements_mut().splice(range, replacement).collect();
        self.summary.add_summary(&added);
        self.summary.subtract_summary(&S::summarize(&removed));
        self.len = self.len + inserted - removed.len();
        return removed;
    }

    /// Split off the slots from `at` onwards.
    pub(crate) fn split_off(&mut self, at: usize) -> Slots<S> {
        match &mut self.slots {
            Slots::Leaf(elements) => {
                let tail = elements.split_off(at);
                self.summary.subtract_summary(&S::summarize(&tail));
                self.len -= tail.len();
                return Slots::Leaf(tail);
            }
            Slots::Inner(children) => {
                let tail = children.split_off(at);
                self.refresh();
                return Slots::Inner(tail);
            }
        }
    }

    /// Remove the first `count` slots.
    pub(crate) fn take_front(&mut self, count: usize) -> Slots<S> {
        match &mut self.slots {
            Slots::Leaf(elements) => {
                let front: Vec<S::Element> = elements.drain(..count).collect();
                self.summary.subtract_summary(&S::summarize(&front));
                self.len -= front.len();
                return Slots::Leaf(front);
            }
            Slots::Inner(children) => {
                let front: Vec<Node<S>> = children.drain(..count).collect();
                self.refresh();
                return Slots::Inner(front);
            }
        }
    }

    /// Remove every slot.
    pub(crate) fn take_all(&mut self) -> Slots<S> {
        return self.split_off(0);
    }

    /// Append slots of the same kind after the existing ones.
    pub(crate) fn append(&mut self, slots: Slots<S>) {
        match slots {
            Slots::Leaf(mut more) => {
                let added = S::summarize(&more);
                let count = more.len();
                self.elements_mut().append(&mut more);
                self.summary.add_summary(&added);
                self.len += count;
            }
            Slots::Inner(mut more) => {
                self.children_mut().append(&mut more);
                self.refresh();
            }
        }
    }

    /// Insert slots of the same kind before the existing ones.
    pub(crate) fn prepend(&mut self, slots: Slots<S>) {
        match slots {
            Slots::Leaf(mut front) => {
                let added = S::summarize(&front);
                let count = front.len();
                let elements = self.elements_mut();
                front.append(elements);
                *elements = front;
                self.summary.add_summary(&added);
                self.len += count;
            }
            Slots::Inner(mut front) => {
                let children = self.children_mut();
                front.append(children);
                *children = front;
                self.refresh();
            }
        }
    }

    pub(crate) fn split_off_children(&mut self, at: usize) -> Vec<Node<S>> {
        let tail = self.children_mut().split_off(at);
        self.refresh();
        return tail;
    }

    pub(crate) fn insert_child(&mut self, at: usize, child: Node<S>) {
        self.children_mut().insert(at, child);
        self.refresh();
    }

    pub(crate) fn remove_child(&mut self, at: usize) -> Node<S> {
        let child = self.children_mut().remove(at);
        self.refresh();
        return child;
    }
}

/// A handle to a node of a summarized tree.
pub struct Node<S: Summary> {
    raw: Arc<RawNode<S>>,
}

impl<S: Summary> Clone for Node<S> {
    fn clone(&self) -> Node<S> {
        return Node {
            raw: Arc::clone(&self.raw),
        };
    }
}

impl<S: Summary> Node<S> {
    pub(crate) fn from_slots(slots: Slots<S>) -> Node<S> {
        return Node {
            raw: Arc::new(RawNode::new(slots)),
        };
    }

    pub(crate) fn empty_leaf(capacity: &Capacity) -> Node<S> {
        return Node::from_slots(Slots::Leaf(Vec::with_capacity(capacity.leaf)));
    }

    pub(crate) fn leaf(elements: Vec<S::Element>) -> Node<S> {
        return Node::from_slots(Slots::Leaf(elements));
    }

    pub(crate) fn inner(children: Vec<Node<S>>) -> Node<S> {
        debug_assert!(!children.is_empty(), "inner nodes need at least one child");
        debug_assert!(
            children.windows(2).all(|pair| pair[0].height() == pair[1].height()),
            "siblings must have equal heights"
        );
        return Node::from_slots(Slots::Inner(children));
    }

    #[inline(always)]
    pub fn id(&self) -> NodeId {
        return self.raw.id;
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        return self.raw.height as usize;
    }

    /// Number of elements in this subtree.
    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.raw.len;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.raw.len == 0;
    }

    #[inline(always)]
    pub fn summary(&self) -> &S {
        return &self.raw.summary;
    }

    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        return matches!(self.raw.slots, Slots::Leaf(_));
    }

    /// Number of children (inner) or elements (leaf).
    #[inline(always)]
    pub fn slot_count(&self) -> usize {
        return self.raw.slot_count();
    }

    /// Children of an inner node; empty for a leaf.
    pub fn children(&self) -> &[Node<S>] {
        match &self.raw.slots {
            Slots::Inner(children) => return children,
            Slots::Leaf(_) => return &[],
        }
    }

    /// Elements of a leaf; empty for an inner node.
    pub fn elements(&self) -> &[S::Element] {
        match &self.raw.slots {
            Slots::Leaf(elements) => return elements,
            Slots::Inner(_) => return &[],
        }
    }

    /// Whether this storage is referenced from more than one handle.
    pub fn is_shared(&self) -> bool {
        return Arc::strong_count(&self.raw) > 1;
    }

    /// Element at `position` within this subtree.
    pub fn get(&self, position: usize) -> Option<&S::Element> {
        let mut node = self;
        let mut position = position;
        loop {
            match &node.raw.slots {
                Slots::Leaf(elements) => return elements.get(position),
                Slots::Inner(children) => {
                    let mut next = None;
                    for child in children {
                        if position < child.len() {
                            next = Some(child);
                            break;
                        }
                        position -= child.len();
                    }
                    node = next?;
                }
            }
        }
    }

    /// Exclusive access to the storage, cloning it first if it is shared.
    ///
    /// The clone gets a fresh id, and `tracker` is told about the swap before
    /// this returns.
    pub(crate) fn unique<X: Tracker<S>>(&mut self, tracker: &mut X) -> &mut RawNode<S> {
        if Arc::get_mut(&mut self.raw).is_none() {
            let old = self.raw.id;
            let copy = RawNode::clone(&self.raw);
            self.raw = Arc::new(copy);
            tracker.cloned(old, self);
        }
        return Arc::make_mut(&mut self.raw);
    }

    /// Take the slots out of this node, copying them if the storage is shared.
    pub(crate) fn into_slots(self) -> Slots<S> {
        match Arc::try_unwrap(self.raw) {
            Ok(raw) => return raw.slots,
            Err(shared) => return shared.slots.clone(),
        }
    }

    /// Recompute every header in this subtree and compare with the cache.
    pub(crate) fn check(&self, capacity: &Capacity, is_root: bool) -> Result<(), InvariantError> {
        let raw = &*self.raw;
        let slots = raw.slot_count();
        let limit = capacity.slots_at(self.height());
        if slots > limit {
            return Err(InvariantError::Overflow {
                node: raw.id,
                slots,
                capacity: limit,
            });
        }
        if !is_root && slots < capacity.minimum_at(self.height()) {
            return Err(InvariantError::Underflow {
                node: raw.id,
                slots,
                minimum: capacity.minimum_at(self.height()),
            });
        }

        match &raw.slots {
            Slots::Leaf(elements) => {
                if raw.height != 0 {
                    return Err(InvariantError::Height {
                        node: raw.id,
                        cached: raw.height as usize,
                        actual: 0,
                    });
                }
                if raw.len != elements.len() {
                    return Err(InvariantError::Length {
                        node: raw.id,
                        cached: raw.len,
                        actual: elements.len(),
                    });
                }
                if raw.summary != S::summarize(elements) {
                    return Err(InvariantError::Summary { node: raw.id });
                }
            }
            Slots::Inner(children) => {
                if children.is_empty() {
                    return Err(InvariantError::EmptyInner { node: raw.id });
                }
                if is_root && children.len() == 1 {
                    return Err(InvariantError::SingularRoot { node: raw.id });
                }
                for child in children {
                    if child.height() + 1 != raw.height as usize {
                        return Err(InvariantError::Height {
                            node: raw.id,
                            cached: raw.height as usize,
                            actual: child.height() + 1,
                        });
                    }
                    child.check(capacity, false)?;
                }
                let len: usize = children.iter().map(|child| child.len()).sum();
                if len != raw.len {
                    return Err(InvariantError::Length {
                        node: raw.id,
                        cached: raw.len,
                        actual: len,
                    });
                }
                if raw.summary != S::sum(children.iter().map(|child| child.summary())) {
                    return Err(InvariantError::Summary { node: raw.id });
                }
            }
        }
        return Ok(());
    }
}

impl<S: Summary> fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Node")
            .field("id", &self.raw.id)
            .field("height", &self.raw.height)
            .field("len", &self.raw.len)
            .field("slots", &self.raw.slot_count())
            .field("summary", &self.raw.summary)
            .finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Untracked;
    use crate::fixtures::{Row, RowSummary};

    fn rows(count: u64) -> Vec<Row> {
        return (0..count).map(|i| Row::new(i, 1)).collect();
    }

    #[test]
    fn leaf_header_matches_elements() {
        let leaf: Node<RowSummary> = Node::leaf(rows(3));
        assert!(leaf.is_leaf());
        assert_eq!(leaf.height(), 0);
        assert_eq!(leaf.len(), 3);
        assert_eq!(leaf.summary().height, 3);
        assert_eq!(leaf.summary().chars, 3);
    }

    #[test]
    fn inner_header_sums_children() {
        let a: Node<RowSummary> = Node::leaf(rows(2));
        let b: Node<RowSummary> = Node::leaf(rows(3));
        let inner = Node::inner(vec![a, b]);
        assert_eq!(inner.height(), 1);
        assert_eq!(inner.len(), 5);
        assert_eq!(inner.summary().height, 1 + 3);
        assert_eq!(inner.slot_count(), 2);
        assert_eq!(inner.get(3), Some(&Row::new(1, 1)));
        assert_eq!(inner.get(5), None);
    }

    #[test]
    fn splice_updates_header_incrementally() {
        let mut leaf: Node<RowSummary> = Node::leaf(rows(4));
        let removed = leaf
            .unique(&mut Untracked)
            .splice_elements(1..3, vec![Row::new(10, 5)]);
        assert_eq!(removed, vec![Row::new(1, 1), Row::new(2, 1)]);
        assert_eq!(leaf.len(), 3);
        assert_eq!(leaf.summary(), &RowSummary::summarize(leaf.elements()));
        assert_eq!(leaf.check(&Capacity::new(4, 4), true), Ok(()));
    }

    #[test]
    fn unique_clones_shared_storage() {
        let mut leaf: Node<RowSummary> = Node::leaf(rows(2));
        let original = leaf.clone();
        assert!(leaf.is_shared());

        leaf.unique(&mut Untracked).append(Slots::Leaf(vec![Row::new(7, 7)]));

        assert_ne!(leaf.id(), original.id());
        assert_eq!(original.len(), 2);
        assert_eq!(leaf.len(), 3);
        assert!(!original.is_shared());
    }

    #[test]
    fn unique_keeps_identity_when_not_shared() {
        let mut leaf: Node<RowSummary> = Node::leaf(rows(2));
        let id = leaf.id();
        leaf.unique(&mut Untracked).take_front(1);
        assert_eq!(leaf.id(), id);
        assert_eq!(leaf.elements(), &[Row::new(1, 1)]);
    }

    #[test]
    fn slots_move_between_nodes() {
        let mut a: Node<RowSummary> = Node::leaf(rows(4));
        let mut b: Node<RowSummary> = Node::leaf(vec![Row::new(9, 9)]);
        let tail = a.unique(&mut Untracked).split_off(2);
        b.unique(&mut Untracked).prepend(tail);
        assert_eq!(a.len(), 2);
        assert_eq!(b.elements(), &[Row::new(2, 1), Row::new(3, 1), Row::new(9, 9)]);
        assert_eq!(b.summary(), &RowSummary::summarize(b.elements()));
    }

    #[test]
    fn check_reports_overflow_and_underflow() {
        let capacity = Capacity::new(4, 4);
        let big: Node<RowSummary> = Node::leaf(rows(5));
        assert!(matches!(
            big.check(&capacity, true),
            Err(InvariantError::Overflow { slots: 5, .. })
        ));

        let tiny: Node<RowSummary> = Node::leaf(rows(1));
        let full: Node<RowSummary> = Node::leaf(rows(4));
        let inner = Node::inner(vec![full, tiny]);
        assert!(matches!(
            inner.check(&capacity, true),
            Err(InvariantError::Underflow { slots: 1, .. })
        ));
    }

    #[test]
    fn check_rejects_singular_root() {
        let inner: Node<RowSummary> = Node::inner(vec![Node::leaf(rows(3))]);
        assert!(matches!(
            inner.check(&Capacity::new(4, 4), true),
            Err(InvariantError::SingularRoot { .. })
        ));
    }
}
