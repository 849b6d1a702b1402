//! Summit - a persistent, copy-on-write summarized B-tree.
//!
//! A [`SummarizedTree`] is an ordered sequence of elements in which every node
//! caches a [`Summary`] of its subtree. Any number of [`Dimension`]s can be
//! projected out of the summary, and the tree can be cut, joined and searched
//! by each of them in logarithmic time.
//!
//! # Quick Start
//!
//! ```
//! use summit::{Dimension, SummarizedTree, Summary};
//!
//! // Lines of a document, each element being the line's height.
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Lines {
//!     count: usize,
//!     height: u64,
//! }
//!
//! impl Summary for Lines {
//!     type Element = u64;
//!
//!     fn zero() -> Lines {
//!         return Lines::default();
//!     }
//!
//!     fn of(height: &u64) -> Lines {
//!         return Lines { count: 1, height: *height };
//!     }
//!
//!     fn add_summary(&mut self, other: &Lines) {
//!         self.count += other.count;
//!         self.height += other.height;
//!     }
//!
//!     fn subtract_summary(&mut self, other: &Lines) {
//!         self.count -= other.count;
//!         self.height -= other.height;
//!     }
//! }
//!
//! #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
//! struct Height(u64);
//!
//! impl std::ops::Add for Height {
//!     type Output = Height;
//!     fn add(self, other: Height) -> Height {
//!         return Height(self.0 + other.0);
//!     }
//! }
//!
//! impl std::ops::Sub for Height {
//!     type Output = Height;
//!     fn sub(self, other: Height) -> Height {
//!         return Height(self.0 - other.0);
//!     }
//! }
//!
//! impl Dimension<Lines> for Height {
//!     fn measure(summary: &Lines) -> Height {
//!         return Height(summary.height);
//!     }
//! }
//!
//! let mut tree: SummarizedTree<Lines> = [10, 10, 0, 5].into_iter().collect();
//! assert_eq!(tree.extent::<Height>(), Height(25));
//!
//! // Two lines are needed to reach a height of 15.
//! assert_eq!(tree.cursor_at(Height(15)).position(), 2);
//!
//! let tail = tree.split_off(2);
//! assert_eq!(tail.to_vec(), vec![0, 5]);
//! assert_eq!(tree.extent::<Height>(), Height(20));
//! ```
//!
//! # Identity
//!
//! Trees whose elements implement [`Identified`] can carry an [`IdIndex`]
//! tracker, which keeps `offset_of(id)` logarithmic across every edit.

mod balance;
pub mod builder;
mod concat;
pub mod context;
pub mod cursor;
pub mod error;
pub mod node;
mod replace;
mod split;
pub mod summary;
pub mod tree;

#[cfg(test)]
mod fixtures;

pub use builder::Builder;
pub use context::{Capacity, Context, IdIndex, Identified, Locate, Tracker, Untracked};
pub use cursor::{Cursor, CursorState, Index};
pub use error::InvariantError;
pub use node::{Node, NodeId};
pub use summary::{CollectionPoint, Dimension, Summary};
pub use tree::SummarizedTree;
