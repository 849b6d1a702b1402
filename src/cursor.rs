//! Cursors and indices.
//!
//! A [`Cursor`] is a path from the root to one leaf, kept as a stack of
//! frames. Every frame records the summary and element position at the start
//! of its node, so the running prefix at the cursor can be recovered from the
//! leaf frame alone. Stepping is incremental; seeking first climbs the stack to
//! the lowest frame that still covers the target and only then descends, so
//! seeks near the current position touch few nodes.
//!
//! Seeking by a dimension lands on the leftmost position whose running measure
//! reaches the target. A position at the very end of a leaf is normalized to
//! the start of the next leaf, so the cursor sits on an element whenever the
//! position is below the tree's length.
//!
//! A new cursor is already on the first element (or at the end of an empty
//! tree), with its frames filled. `BeforeStart` is only reached by stepping
//! back from position 0, and the next step forward returns to the first
//! element.

use std::fmt;
use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::node::Node;
use crate::summary::{CollectionPoint, Dimension, Summary};

/// Where a cursor is relative to the elements of its tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorState {
    /// Moved before the first element.
    BeforeStart,
    /// On an element.
    InLeaf,
    /// At the position just past the last element.
    AtEnd,
    /// Moved past the end position.
    AfterEnd,
}

/// A validated position in one state of a tree.
///
/// Indices order by position. They are only meaningful for the tree version
/// that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Index {
    position: usize,
    version: u64,
}

impl Index {
    pub(crate) fn new(position: usize, version: u64) -> Index {
        return Index { position, version };
    }

    pub fn position(&self) -> usize {
        return self.position;
    }

    pub fn version(&self) -> u64 {
        return self.version;
    }
}

#[derive(Clone)]
struct Frame<'a, S: Summary> {
    node: &'a Node<S>,
    /// Child index for inner frames, element offset for the leaf frame.
    index: usize,
    start: S,
    position: usize,
}

/// Something a cursor can seek by: element positions or a dimension.
trait Metric<S: Summary> {
    type Value: Copy + Ord;

    fn measure(summary: &S, position: usize) -> Self::Value;

    /// Offset inside a leaf starting at `base` where the seek stops.
    fn leaf_index(elements: &[S::Element], base: Self::Value, target: Self::Value, strict: bool)
    -> usize;
}

struct Positions;

impl<S: Summary> Metric<S> for Positions {
    type Value = usize;

    fn measure(_summary: &S, position: usize) -> usize {
        return position;
    }

    fn leaf_index(elements: &[S::Element], base: usize, target: usize, strict: bool) -> usize {
        let offset = target - base;
        if strict {
            return (offset + 1).min(elements.len());
        }
        return offset.min(elements.len());
    }
}

struct Measured<D>(PhantomData<D>);

impl<S: Summary, D: Dimension<S>> Metric<S> for Measured<D> {
    type Value = D;

    fn measure(summary: &S, _position: usize) -> D {
        return D::measure(summary);
    }

    fn leaf_index(elements: &[S::Element], base: D, target: D, strict: bool) -> usize {
        if strict {
            return D::index_past(elements, target - base);
        }
        return D::index_in(elements, target - base);
    }
}

/// A read-only position in a tree.
#[derive(Clone)]
pub struct Cursor<'a, S: Summary> {
    root: &'a Node<S>,
    version: u64,
    stack: SmallVec<[Frame<'a, S>; 8]>,
    prefix: S,
    position: usize,
    state: CursorState,
}

impl<'a, S: Summary> Cursor<'a, S> {
    /// A cursor at the first element of `root`.
    pub(crate) fn new(root: &'a Node<S>, version: u64) -> Cursor<'a, S> {
        let mut cursor = Cursor {
            root,
            version,
            stack: SmallVec::new(),
            prefix: S::zero(),
            position: 0,
            state: CursorState::AtEnd,
        };
        cursor.reset_to_start();
        return cursor;
    }

    pub fn version(&self) -> u64 {
        return self.version;
    }

    pub fn state(&self) -> CursorState {
        return self.state;
    }

    /// Element position of the cursor.
    ///
    /// Shadows `Iterator::position`; call that one as
    /// `Iterator::position(&mut cursor, predicate)`.
    pub fn position(&self) -> usize {
        return self.position;
    }

    /// Summary of every element before the cursor.
    pub fn summary(&self) -> &S {
        return &self.prefix;
    }

    /// Running `D` measure at the cursor.
    pub fn extent<D: Dimension<S>>(&self) -> D {
        return D::measure(&self.prefix);
    }

    pub fn index(&self) -> Index {
        return Index::new(self.position, self.version);
    }

    /// The element under the cursor.
    pub fn element(&self) -> Option<&'a S::Element> {
        if self.state != CursorState::InLeaf {
            return None;
        }
        let frame = self.stack.last()?;
        let node: &'a Node<S> = frame.node;
        return node.elements().get(frame.index);
    }

    /// Move to the first element (or the end of an empty tree).
    pub fn reset_to_start(&mut self) {
        self.stack.clear();
        self.prefix = S::zero();
        self.position = 0;
        self.descend_first(self.root, S::zero(), 0);
        self.state = if self.root.is_empty() {
            CursorState::AtEnd
        } else {
            CursorState::InLeaf
        };
    }

    /// Move to the position just past the last element.
    pub fn seek_end(&mut self) {
        self.stack.clear();
        self.descend_last(self.root, S::zero(), 0);
        self.prefix = self.root.summary().clone();
        self.position = self.root.len();
        self.state = CursorState::AtEnd;
    }

    pub fn move_next(&mut self) {
        match self.state {
            CursorState::BeforeStart => self.reset_to_start(),
            CursorState::AtEnd => self.state = CursorState::AfterEnd,
            CursorState::AfterEnd => {}
            CursorState::InLeaf => {
                let Some(element) = self.element() else {
                    return;
                };
                self.prefix.add_summary(&S::of(element));
                self.position += 1;
                let Some(leaf) = self.stack.last_mut() else {
                    return;
                };
                leaf.index += 1;
                if leaf.index == leaf.node.len() && !self.next_leaf() {
                    self.state = CursorState::AtEnd;
                }
            }
        }
    }

    pub fn move_prev(&mut self) {
        match self.state {
            CursorState::BeforeStart => {}
            CursorState::AfterEnd => self.state = CursorState::AtEnd,
            CursorState::InLeaf | CursorState::AtEnd => {
                if self.position == 0 {
                    self.state = CursorState::BeforeStart;
                    return;
                }
                let at_leaf_start = self.stack.last().is_some_and(|leaf| leaf.index == 0);
                if at_leaf_start && !self.prev_leaf() {
                    return;
                }
                let Some(leaf) = self.stack.last_mut() else {
                    return;
                };
                leaf.index -= 1;
                let node: &'a Node<S> = leaf.node;
                self.prefix.subtract_summary(&S::of(&node.elements()[leaf.index]));
                self.position -= 1;
                self.state = CursorState::InLeaf;
            }
        }
    }

    /// Move to the leftmost position whose running `D` measure reaches
    /// `target`. Targets past the total saturate to the end.
    pub fn seek<D: Dimension<S>>(&mut self, target: D) {
        self.seek_by::<Measured<D>>(target, false);
    }

    /// Move to element position `position`.
    pub fn seek_position(&mut self, position: usize) {
        assert!(
            position <= self.root.len(),
            "position {} out of range for length {}",
            position,
            self.root.len()
        );
        self.seek_by::<Positions>(position, false);
    }

    /// Move to the next `D` boundary after the cursor.
    ///
    /// Returns `false`, leaving the cursor at the end, when no boundary
    /// follows.
    pub fn seek_next<D: Dimension<S>>(&mut self) -> bool {
        let current = D::measure(&self.prefix);
        return self.seek_by::<Measured<D>>(current, true);
    }

    /// The cursor's position as a `B` boundary plus an `O` offset.
    pub fn point<B: Dimension<S>, O: Dimension<S>>(&self) -> CollectionPoint<B, O> {
        let base = B::measure(&self.prefix);
        let mut anchor = self.clone();
        anchor.seek::<B>(base);
        let offset = O::measure(&self.prefix) - O::measure(&anchor.prefix);
        return CollectionPoint::new(base, offset);
    }

    pub fn seek_point<B: Dimension<S>, O: Dimension<S>>(&mut self, point: CollectionPoint<B, O>) {
        self.seek::<B>(point.base);
        let anchor = O::measure(&self.prefix);
        self.seek::<O>(anchor + point.offset);
    }

    fn seek_by<M: Metric<S>>(&mut self, target: M::Value, strict: bool) -> bool {
        let total = M::measure(self.root.summary(), self.root.len());
        if strict {
            if target >= total {
                self.seek_end();
                return false;
            }
        } else {
            if target <= M::measure(&S::zero(), 0) {
                self.reset_to_start();
                return true;
            }
            if target > total {
                self.seek_end();
                return true;
            }
        }

        let covers = |start: M::Value, end: M::Value| {
            if strict {
                return start <= target && target < end;
            }
            return start < target && target <= end;
        };

        while let Some(frame) = self.stack.last() {
            let start = M::measure(&frame.start, frame.position);
            let mut end_summary = frame.start.clone();
            end_summary.add_summary(frame.node.summary());
            let end = M::measure(&end_summary, frame.position + frame.node.len());
            if covers(start, end) {
                break;
            }
            self.stack.pop();
        }
        if self.stack.is_empty() {
            self.stack.push(Frame {
                node: self.root,
                index: 0,
                start: S::zero(),
                position: 0,
            });
        }

        loop {
            let depth = self.stack.len() - 1;
            let frame = &self.stack[depth];
            let node: &'a Node<S> = frame.node;

            if node.is_leaf() {
                let base = M::measure(&frame.start, frame.position);
                let offset = M::leaf_index(node.elements(), base, target, strict);
                let mut prefix = frame.start.clone();
                for element in &node.elements()[..offset] {
                    prefix.add_summary(&S::of(element));
                }
                self.position = frame.position + offset;
                self.prefix = prefix;
                self.stack[depth].index = offset;
                break;
            }

            let children = node.children();
            let last = children.len() - 1;
            let mut start = frame.start.clone();
            let mut position = frame.position;
            let mut chosen = last;
            for (i, child) in children.iter().enumerate() {
                if i == last {
                    break;
                }
                let mut end = start.clone();
                end.add_summary(child.summary());
                let end_position = position + child.len();
                let value = M::measure(&end, end_position);
                let reached = if strict { value > target } else { value >= target };
                if reached {
                    chosen = i;
                    break;
                }
                start = end;
                position = end_position;
            }
            self.stack[depth].index = chosen;
            self.stack.push(Frame {
                node: &children[chosen],
                index: 0,
                start,
                position,
            });
        }

        self.normalize();
        return true;
    }

    /// Settle the state after a seek, moving off the end of a non-last leaf.
    fn normalize(&mut self) {
        if self.position == self.root.len() {
            self.state = CursorState::AtEnd;
            return;
        }
        let at_leaf_end = self
            .stack
            .last()
            .is_some_and(|leaf| leaf.index == leaf.node.len());
        if at_leaf_end {
            self.next_leaf();
        }
        self.state = CursorState::InLeaf;
    }

    /// Move to offset 0 of the following leaf. The prefix is unchanged.
    fn next_leaf(&mut self) -> bool {
        let mut depth = self.stack.len() - 1;
        while depth > 0 {
            depth -= 1;
            let frame = &self.stack[depth];
            if frame.index + 1 < frame.node.slot_count() {
                let node: &'a Node<S> = frame.node;
                let index = frame.index + 1;
                self.stack.truncate(depth + 1);
                self.stack[depth].index = index;
                self.descend_first(&node.children()[index], self.prefix.clone(), self.position);
                return true;
            }
        }
        return false;
    }

    /// Move to the end of the preceding leaf. The prefix is unchanged.
    fn prev_leaf(&mut self) -> bool {
        let mut depth = self.stack.len() - 1;
        while depth > 0 {
            depth -= 1;
            let frame = &self.stack[depth];
            if frame.index > 0 {
                let node: &'a Node<S> = frame.node;
                let index = frame.index - 1;
                self.stack.truncate(depth + 1);
                self.stack[depth].index = index;
                let child = &node.children()[index];
                let mut start = self.prefix.clone();
                start.subtract_summary(child.summary());
                self.descend_last(child, start, self.position - child.len());
                return true;
            }
        }
        return false;
    }

    fn descend_first(&mut self, node: &'a Node<S>, start: S, position: usize) {
        let mut node = node;
        loop {
            self.stack.push(Frame {
                node,
                index: 0,
                start: start.clone(),
                position,
            });
            if node.is_leaf() {
                return;
            }
            node = &node.children()[0];
        }
    }

    fn descend_last(&mut self, node: &'a Node<S>, start: S, position: usize) {
        let mut node = node;
        let mut start = start;
        let mut position = position;
        loop {
            if node.is_leaf() {
                self.stack.push(Frame {
                    node,
                    index: node.len(),
                    start,
                    position,
                });
                return;
            }
            let children = node.children();
            let last = children.len() - 1;
            let child = &children[last];
            let mut child_start = start.clone();
            child_start.add_summary(node.summary());
            child_start.subtract_summary(child.summary());
            let child_position = position + node.len() - child.len();
            self.stack.push(Frame {
                node,
                index: last,
                start,
                position,
            });
            node = child;
            start = child_start;
            position = child_position;
        }
    }
}

impl<'a, S: Summary> Iterator for Cursor<'a, S> {
    type Item = &'a S::Element;

    fn next(&mut self) -> Option<&'a S::Element> {
        if self.state == CursorState::BeforeStart {
            self.reset_to_start();
        }
        match self.element() {
            Some(element) => {
                self.move_next();
                return Some(element);
            }
            None => {
                if self.state == CursorState::AtEnd {
                    self.state = CursorState::AfterEnd;
                }
                return None;
            }
        }
    }
}

impl<S: Summary> fmt::Debug for Cursor<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Cursor")
            .field("position", &self.position)
            .field("state", &self.state)
            .field("depth", &self.stack.len())
            .field("prefix", &self.prefix)
            .finish();
    }
}
