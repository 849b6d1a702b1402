//! Per-tree context: capacity configuration and identity tracking.
//!
//! Every tree value owns one [`Context`]. It carries the node [`Capacity`] and
//! a [`Tracker`] that is told about every structural edit: nodes created or
//! refilled (`adopt`), storages cloned on write (`cloned`), nodes and elements
//! that leave the tree (`forget`, `forget_elements`, `forget_subtree`).
//!
//! [`Untracked`] ignores all of it. [`IdIndex`] keeps two non-owning maps,
//! element id to leaf and node to parent, so the position of an element can be
//! recovered in O(log n) by walking up to the root and back down.

use std::fmt::Debug;
use std::hash::Hash;
use std::mem::size_of;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::InvariantError;
use crate::node::{Node, NodeId};
use crate::summary::Summary;

/// Maximum slots per node.
///
/// Non-root nodes hold between half and all of their capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capacity {
    pub leaf: usize,
    pub inner: usize,
}

impl Capacity {
    /// Smallest capacity that keeps sibling merges possible.
    pub const MIN: usize = 4;

    const LEAF_BYTES: usize = 1024;
    const INNER_BYTES: usize = 512;

    pub fn new(leaf: usize, inner: usize) -> Capacity {
        assert!(
            leaf >= Self::MIN && inner >= Self::MIN,
            "capacity must be at least {} (got leaf {}, inner {})",
            Self::MIN,
            leaf,
            inner
        );
        return Capacity { leaf, inner };
    }

    /// Capacity derived from the element size.
    ///
    /// Debug builds use the minimum so that small test inputs exercise every
    /// rebalancing path.
    pub fn for_element<E>() -> Capacity {
        if cfg!(debug_assertions) {
            return Capacity::new(Self::MIN, Self::MIN);
        }
        let leaf = (Self::LEAF_BYTES / size_of::<E>().max(1)).clamp(16, 256);
        let inner = (Self::INNER_BYTES / size_of::<usize>()).clamp(16, 64);
        return Capacity::new(leaf, inner);
    }

    #[inline(always)]
    pub fn slots_at(&self, height: usize) -> usize {
        if height == 0 {
            return self.leaf;
        }
        return self.inner;
    }

    /// A non-root node with fewer slots than this has underflowed.
    #[inline(always)]
    pub fn minimum_at(&self, height: usize) -> usize {
        return self.slots_at(height) / 2;
    }
}

/// Capacity and tracker of one tree value.
#[derive(Clone, Debug)]
pub struct Context<X> {
    pub(crate) capacity: Capacity,
    pub(crate) tracker: X,
}

impl<X: Default> Context<X> {
    pub fn new(capacity: Capacity) -> Context<X> {
        return Context {
            capacity,
            tracker: X::default(),
        };
    }
}

impl<X> Context<X> {
    pub fn capacity(&self) -> Capacity {
        return self.capacity;
    }

    pub fn tracker(&self) -> &X {
        return &self.tracker;
    }
}

/// Observer of structural edits.
///
/// Every hook defaults to doing nothing.
pub trait Tracker<S: Summary>: Clone + Default {
    /// `node` was created or had slots moved into it: record its direct slots.
    fn adopt(&mut self, _node: &Node<S>) {}

    /// The storage `old` was cloned on write into `node`.
    fn cloned(&mut self, _old: NodeId, _node: &Node<S>) {}

    /// `node` is no longer a child of anything in this tree.
    fn forget(&mut self, _node: &Node<S>) {}

    /// `elements` were removed from the tree.
    fn forget_elements(&mut self, _elements: &[S::Element]) {}

    /// The whole subtree under `root` left the tree.
    fn forget_subtree(&mut self, _root: &Node<S>) {}

    /// Take over the records of another tree's tracker.
    fn absorb(&mut self, _other: Self) {}

    /// Discard every record and re-derive them from `root`.
    fn rebuild(&mut self, _root: &Node<S>) {}

    /// Compare the records against the tree under `root`.
    fn check(&self, _root: &Node<S>) -> Result<(), InvariantError> {
        return Ok(());
    }
}

/// The tracker that records nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Untracked;

impl<S: Summary> Tracker<S> for Untracked {}

/// Elements with a stable identity.
pub trait Identified {
    type Id: Clone + Eq + Hash + Debug;

    fn id(&self) -> Self::Id;
}

/// Trackers that can find an element by id.
pub trait Locate<S: Summary>: Tracker<S>
where
    S::Element: Identified,
{
    /// Whether `locate` answers at all. When false, callers scan.
    const TRACKS: bool;

    /// Position of the element `id` in the tree under `root`.
    fn locate(&self, root: &Node<S>, id: &<S::Element as Identified>::Id) -> Option<usize>;
}

impl<S: Summary> Locate<S> for Untracked
where
    S::Element: Identified,
{
    const TRACKS: bool = false;

    fn locate(&self, _root: &Node<S>, _id: &<S::Element as Identified>::Id) -> Option<usize> {
        return None;
    }
}

/// Identity index: element id to leaf, and node to parent.
///
/// Both maps are non-owning; they name nodes by [`NodeId`] only.
#[derive(Clone, Debug)]
pub struct IdIndex<I: Clone + Eq + Hash> {
    leaf_of: FxHashMap<I, NodeId>,
    parent_of: FxHashMap<NodeId, NodeId>,
}

impl<I: Clone + Eq + Hash> Default for IdIndex<I> {
    fn default() -> Self {
        return IdIndex {
            leaf_of: FxHashMap::default(),
            parent_of: FxHashMap::default(),
        };
    }
}

impl<I: Clone + Eq + Hash> IdIndex<I> {
    /// Number of indexed elements.
    pub fn len(&self) -> usize {
        return self.leaf_of.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.leaf_of.is_empty();
    }

    /// The leaf currently holding the element `id`.
    pub fn leaf_of(&self, id: &I) -> Option<NodeId> {
        return self.leaf_of.get(id).copied();
    }

    fn record<S>(&mut self, node: &Node<S>)
    where
        S: Summary,
        S::Element: Identified<Id = I>,
    {
        let id = node.id();
        for element in node.elements() {
            self.leaf_of.insert(element.id(), id);
        }
        for child in node.children() {
            self.parent_of.insert(child.id(), id);
        }
    }

    fn record_subtree<S>(&mut self, node: &Node<S>)
    where
        S: Summary,
        S::Element: Identified<Id = I>,
    {
        self.record(node);
        for child in node.children() {
            self.record_subtree(child);
        }
    }

    fn erase_subtree<S>(&mut self, node: &Node<S>)
    where
        S: Summary,
        S::Element: Identified<Id = I>,
    {
        self.parent_of.remove(&node.id());
        for element in node.elements() {
            self.leaf_of.remove(&element.id());
        }
        for child in node.children() {
            self.erase_subtree(child);
        }
    }

    fn check_node<S>(
        &self,
        node: &Node<S>,
        position: &mut usize,
        links: &mut usize,
    ) -> Result<(), InvariantError>
    where
        S: Summary,
        S::Element: Identified<Id = I>,
    {
        for element in node.elements() {
            let recorded = self.leaf_of(&element.id());
            if recorded != Some(node.id()) {
                return Err(InvariantError::StaleLeaf {
                    position: *position,
                    recorded,
                    actual: node.id(),
                });
            }
            *position += 1;
        }
        for child in node.children() {
            let recorded = self.parent_of.get(&child.id()).copied();
            if recorded != Some(node.id()) {
                return Err(InvariantError::StaleParent {
                    child: child.id(),
                    recorded,
                    actual: node.id(),
                });
            }
            *links += 1;
            self.check_node(child, position, links)?;
        }
        return Ok(());
    }
}

impl<S, I> Tracker<S> for IdIndex<I>
where
    S: Summary,
    S::Element: Identified<Id = I>,
    I: Clone + Eq + Hash + Debug,
{
    fn adopt(&mut self, node: &Node<S>) {
        self.record(node);
    }

    fn cloned(&mut self, old: NodeId, node: &Node<S>) {
        if let Some(parent) = self.parent_of.remove(&old) {
            self.parent_of.insert(node.id(), parent);
        }
        self.record(node);
    }

    fn forget(&mut self, node: &Node<S>) {
        self.parent_of.remove(&node.id());
    }

    fn forget_elements(&mut self, elements: &[S::Element]) {
        for element in elements {
            self.leaf_of.remove(&element.id());
        }
    }

    fn forget_subtree(&mut self, root: &Node<S>) {
        self.erase_subtree(root);
    }

    fn absorb(&mut self, mut other: Self) {
        if other.leaf_of.len() > self.leaf_of.len() {
            std::mem::swap(&mut self.leaf_of, &mut other.leaf_of);
        }
        if other.parent_of.len() > self.parent_of.len() {
            std::mem::swap(&mut self.parent_of, &mut other.parent_of);
        }
        self.leaf_of.extend(other.leaf_of);
        self.parent_of.extend(other.parent_of);
    }

    fn rebuild(&mut self, root: &Node<S>) {
        self.leaf_of.clear();
        self.parent_of.clear();
        self.record_subtree(root);
    }

    fn check(&self, root: &Node<S>) -> Result<(), InvariantError> {
        let mut position = 0;
        let mut links = 0;
        self.check_node(root, &mut position, &mut links)?;
        if self.leaf_of.len() != root.len() {
            return Err(InvariantError::IndexSize {
                indexed: self.leaf_of.len(),
                actual: root.len(),
            });
        }
        if self.parent_of.len() != links {
            return Err(InvariantError::ParentCount {
                indexed: self.parent_of.len(),
                actual: links,
            });
        }
        return Ok(());
    }
}

impl<S, I> Locate<S> for IdIndex<I>
where
    S: Summary,
    S::Element: Identified<Id = I>,
    I: Clone + Eq + Hash + Debug,
{
    const TRACKS: bool = true;

    fn locate(&self, root: &Node<S>, id: &I) -> Option<usize> {
        // Walk leaf to root, then come back down summing the lengths of the
        // siblings to the left of the chain.
        let mut chain: SmallVec<[NodeId; 8]> = SmallVec::new();
        let mut current = self.leaf_of(id)?;
        while current != root.id() {
            if chain.len() >= root.height() {
                return None;
            }
            chain.push(current);
            current = *self.parent_of.get(&current)?;
        }

        let mut node = root;
        let mut offset = 0;
        for &target in chain.iter().rev() {
            let mut found = None;
            for child in node.children() {
                if child.id() == target {
                    found = Some(child);
                    break;
                }
                offset += child.len();
            }
            node = found?;
        }

        let within = node.elements().iter().position(|element| element.id() == *id)?;
        return Some(offset + within);
    }
}
