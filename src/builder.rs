//! Bulk construction.
//!
//! Elements are packed into full leaves, full leaves into full inner nodes,
//! and so on up: every level keeps one pending list of siblings, and a list
//! that reaches the inner capacity is wrapped into a parent one level up. At
//! the end the pending lists are concatenated, tallest first, followed by the
//! last partial leaf.

use crate::concat::concat;
use crate::context::{Capacity, Context, Tracker, Untracked};
use crate::node::Node;
use crate::summary::Summary;
use crate::tree::SummarizedTree;

/// Builds a tree from elements in order.
pub struct Builder<S: Summary, X: Tracker<S> = Untracked> {
    context: Context<X>,
    leaf: Vec<S::Element>,
    levels: Vec<Vec<Node<S>>>,
}

impl<S: Summary, X: Tracker<S>> Builder<S, X> {
    pub fn new(capacity: Capacity) -> Builder<S, X> {
        return Builder {
            context: Context::new(capacity),
            leaf: Vec::with_capacity(capacity.leaf),
            levels: Vec::new(),
        };
    }

    pub fn push(&mut self, element: S::Element) {
        self.leaf.push(element);
        if self.leaf.len() == self.context.capacity.leaf {
            let fresh = Vec::with_capacity(self.context.capacity.leaf);
            let node = Node::leaf(std::mem::replace(&mut self.leaf, fresh));
            self.context.tracker.adopt(&node);
            self.push_node(0, node);
        }
    }

    fn push_node(&mut self, level: usize, node: Node<S>) {
        if self.levels.len() == level {
            self.levels.push(Vec::with_capacity(self.context.capacity.inner));
        }
        self.levels[level].push(node);
        if self.levels[level].len() == self.context.capacity.inner {
            let children = std::mem::take(&mut self.levels[level]);
            let parent = Node::inner(children);
            self.context.tracker.adopt(&parent);
            self.push_node(level + 1, parent);
        }
    }

    /// Assemble the pending nodes into one root.
    pub(crate) fn build(self) -> (Node<S>, Context<X>) {
        let Builder {
            mut context,
            leaf,
            levels,
        } = self;
        let mut root = Node::empty_leaf(&context.capacity);

        for mut level in levels.into_iter().rev() {
            let piece = match level.len() {
                0 => continue,
                1 => level.remove(0),
                _ => {
                    let parent = Node::inner(level);
                    context.tracker.adopt(&parent);
                    parent
                }
            };
            concat(&mut root, piece, &mut context);
        }
        if !leaf.is_empty() {
            let piece = Node::leaf(leaf);
            context.tracker.adopt(&piece);
            concat(&mut root, piece, &mut context);
        }

        tracing::trace!(len = root.len(), height = root.height(), "built tree");
        return (root, context);
    }

    pub fn finish(self) -> SummarizedTree<S, X> {
        let (root, context) = self.build();
        return SummarizedTree::from_parts(root, context);
    }
}

impl<S: Summary, X: Tracker<S>> Extend<S::Element> for Builder<S, X> {
    fn extend<I: IntoIterator<Item = S::Element>>(&mut self, elements: I) {
        for element in elements {
            self.push(element);
        }
    }
}
