//! Errors reported by tree validation.
//!
//! Operations on a well-formed tree never fail: misuse (an out-of-range
//! position, an index from another tree state) panics, and seeking past either
//! end saturates. The only recoverable error is the report produced by
//! [`SummarizedTree::ensure_valid`](crate::SummarizedTree::ensure_valid), which
//! external harnesses use to check the structural invariants.

use thiserror::Error;

use crate::node::NodeId;

/// The first broken invariant found while validating a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("node {node:?}: cached height {cached} but its slots imply {actual}")]
    Height {
        node: NodeId,
        cached: usize,
        actual: usize,
    },

    #[error("node {node:?}: cached length {cached} but its slots hold {actual} elements")]
    Length {
        node: NodeId,
        cached: usize,
        actual: usize,
    },

    #[error("node {node:?}: cached summary differs from a fresh recomputation")]
    Summary { node: NodeId },

    #[error("node {node:?}: {slots} slots exceeds the capacity of {capacity}")]
    Overflow {
        node: NodeId,
        slots: usize,
        capacity: usize,
    },

    #[error("node {node:?}: {slots} slots is below the underflow threshold of {minimum}")]
    Underflow {
        node: NodeId,
        slots: usize,
        minimum: usize,
    },

    #[error("inner node {node:?} has no children")]
    EmptyInner { node: NodeId },

    #[error("root {node:?} is an inner node with a single child")]
    SingularRoot { node: NodeId },

    #[error("element at {position} is recorded in leaf {recorded:?} but lives in leaf {actual:?}")]
    StaleLeaf {
        position: usize,
        recorded: Option<NodeId>,
        actual: NodeId,
    },

    #[error("node {child:?} records parent {recorded:?} but is a child of {actual:?}")]
    StaleParent {
        child: NodeId,
        recorded: Option<NodeId>,
        actual: NodeId,
    },

    #[error("identity index holds {indexed} elements but the tree holds {actual}")]
    IndexSize { indexed: usize, actual: usize },

    #[error("identity index holds {indexed} parent links but the tree has {actual}")]
    ParentCount { indexed: usize, actual: usize },
}
