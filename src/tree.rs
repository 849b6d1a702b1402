//! The tree value.
//!
//! A [`SummarizedTree`] owns a root node and the context it was built with.
//! Clones share all of their nodes; whichever side is edited first copies the
//! nodes on its edit path. Every edit stamps the tree with a fresh version
//! from a process-wide counter, so an [`Index`] taken before an edit is
//! recognisably stale afterwards.

use std::fmt;
use std::ops::{Bound, Range, RangeBounds};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::builder::Builder;
use crate::concat::concat;
use crate::context::{Capacity, Context, Identified, Locate, Tracker, Untracked};
use crate::cursor::{Cursor, Index};
use crate::error::InvariantError;
use crate::node::Node;
use crate::replace::{Removed, replace};
use crate::split::split;
use crate::summary::{CollectionPoint, Dimension, Summary};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_version() -> u64 {
    return NEXT_VERSION.fetch_add(1, Ordering::Relaxed);
}

/// A persistent sequence of elements, summarized at every node.
#[derive(Clone)]
pub struct SummarizedTree<S: Summary, X: Tracker<S> = Untracked> {
    root: Node<S>,
    context: Context<X>,
    version: u64,
}

impl<S: Summary, X: Tracker<S>> SummarizedTree<S, X> {
    pub fn new() -> SummarizedTree<S, X> {
        return SummarizedTree::with_capacity(Capacity::for_element::<S::Element>());
    }

    pub fn with_capacity(capacity: Capacity) -> SummarizedTree<S, X> {
        return SummarizedTree::from_parts(Node::empty_leaf(&capacity), Context::new(capacity));
    }

    pub fn from_elements<I: IntoIterator<Item = S::Element>>(elements: I) -> SummarizedTree<S, X> {
        return SummarizedTree::from_elements_with(Capacity::for_element::<S::Element>(), elements);
    }

    pub fn from_elements_with<I: IntoIterator<Item = S::Element>>(
        capacity: Capacity,
        elements: I,
    ) -> SummarizedTree<S, X> {
        let mut builder = Builder::new(capacity);
        builder.extend(elements);
        return builder.finish();
    }

    pub(crate) fn from_parts(root: Node<S>, context: Context<X>) -> SummarizedTree<S, X> {
        return SummarizedTree {
            root,
            context,
            version: next_version(),
        };
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.root.len();
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.root.is_empty();
    }

    /// Height of the root; 0 while the tree is a single leaf.
    pub fn height(&self) -> usize {
        return self.root.height();
    }

    pub fn summary(&self) -> &S {
        return self.root.summary();
    }

    /// Total `D` measure of the tree.
    pub fn extent<D: Dimension<S>>(&self) -> D {
        return D::measure(self.root.summary());
    }

    pub fn version(&self) -> u64 {
        return self.version;
    }

    pub fn capacity(&self) -> Capacity {
        return self.context.capacity;
    }

    pub fn tracker(&self) -> &X {
        return &self.context.tracker;
    }

    pub fn root(&self) -> &Node<S> {
        return &self.root;
    }

    pub fn get(&self, position: usize) -> Option<&S::Element> {
        return self.root.get(position);
    }

    pub fn first(&self) -> Option<&S::Element> {
        return self.root.get(0);
    }

    pub fn last(&self) -> Option<&S::Element> {
        return self.len().checked_sub(1).and_then(|position| self.root.get(position));
    }

    pub fn iter(&self) -> Cursor<'_, S> {
        return self.cursor();
    }

    pub fn to_vec(&self) -> Vec<S::Element> {
        return self.iter().cloned().collect();
    }

    // Editing.

    pub fn append(&mut self, element: S::Element) {
        let end = self.len();
        self.replace_range(end..end, vec![element]);
    }

    pub fn insert(&mut self, position: usize, element: S::Element) {
        assert!(
            position <= self.len(),
            "insert position {} out of range for length {}",
            position,
            self.len()
        );
        self.replace_range(position..position, vec![element]);
    }

    pub fn remove(&mut self, position: usize) -> S::Element {
        assert!(
            position < self.len(),
            "remove position {} out of range for length {}",
            position,
            self.len()
        );
        let removed = self.replace_range(position..position + 1, Vec::new());
        let mut elements = removed_elements(removed);
        match elements.pop() {
            Some(element) => return element,
            None => panic!("removal at {} returned nothing", position),
        }
    }

    /// Replace the elements in `range`, returning the removed ones as a tree.
    pub fn replace<R, I>(&mut self, range: R, elements: I) -> SummarizedTree<S, X>
    where
        R: RangeBounds<usize>,
        I: IntoIterator<Item = S::Element>,
    {
        let range = self.resolve(range);
        let capacity = self.capacity();
        match self.replace_range(range, elements.into_iter().collect()) {
            Removed::Elements(elements) => {
                return SummarizedTree::from_elements_with(capacity, elements);
            }
            Removed::Tree(root) => {
                let mut context = Context::<X>::new(capacity);
                context.tracker.rebuild(&root);
                return SummarizedTree::from_parts(root, context);
            }
        }
    }

    fn replace_range(&mut self, range: Range<usize>, elements: Vec<S::Element>) -> Removed<S> {
        let removed = replace(&mut self.root, range, elements, &mut self.context);
        self.version = next_version();
        return removed;
    }

    fn resolve<R: RangeBounds<usize>>(&self, range: R) -> Range<usize> {
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end + 1,
            Bound::Excluded(&end) => end,
            Bound::Unbounded => self.len(),
        };
        assert!(
            start <= end && end <= self.len(),
            "range {}..{} out of bounds for length {}",
            start,
            end,
            self.len()
        );
        return start..end;
    }

    /// Split the tree at `at`, keeping `[0, at)` and returning the rest.
    pub fn split_off(&mut self, at: usize) -> SummarizedTree<S, X> {
        assert!(at <= self.len(), "split position {} out of range for length {}", at, self.len());
        let capacity = self.capacity();
        let whole = std::mem::replace(&mut self.root, Node::empty_leaf(&capacity));
        let (left, right) = split(whole, at, &mut self.context);
        self.root = left;
        self.version = next_version();

        // Move the records of the smaller half into a tracker of its own.
        let mut moved = X::default();
        let tracker = if right.len() <= self.root.len() {
            self.context.tracker.forget_subtree(&right);
            moved.rebuild(&right);
            moved
        } else {
            self.context.tracker.forget_subtree(&self.root);
            moved.rebuild(&self.root);
            std::mem::replace(&mut self.context.tracker, moved)
        };
        return SummarizedTree::from_parts(right, Context { capacity, tracker });
    }

    /// Append every element of `other`.
    pub fn concat(&mut self, other: SummarizedTree<S, X>) {
        assert_eq!(
            self.context.capacity, other.context.capacity,
            "cannot concatenate trees with different capacities"
        );
        let SummarizedTree { root, context, .. } = other;
        self.context.tracker.absorb(context.tracker);
        concat(&mut self.root, root, &mut self.context);
        self.version = next_version();
    }

    // Cursors and indices.

    pub fn cursor(&self) -> Cursor<'_, S> {
        return Cursor::new(&self.root, self.version);
    }

    /// A cursor at the leftmost position whose `D` measure reaches `target`.
    pub fn cursor_at<D: Dimension<S>>(&self, target: D) -> Cursor<'_, S> {
        let mut cursor = self.cursor();
        cursor.seek(target);
        return cursor;
    }

    pub fn cursor_at_index(&self, index: Index) -> Cursor<'_, S> {
        let position = self.position_of(index);
        let mut cursor = self.cursor();
        cursor.seek_position(position);
        return cursor;
    }

    pub fn start_index(&self) -> Index {
        return Index::new(0, self.version);
    }

    pub fn end_index(&self) -> Index {
        return Index::new(self.len(), self.version);
    }

    pub fn index_at<D: Dimension<S>>(&self, target: D) -> Index {
        return self.cursor_at(target).index();
    }

    pub fn index_at_position(&self, position: usize) -> Index {
        assert!(
            position <= self.len(),
            "position {} out of range for length {}",
            position,
            self.len()
        );
        return Index::new(position, self.version);
    }

    /// The index `delta` further along in `D` than `index`.
    pub fn index_offset_by<D: Dimension<S>>(&self, index: Index, delta: D) -> Index {
        let mut cursor = self.cursor_at_index(index);
        let target = cursor.extent::<D>() + delta;
        cursor.seek(target);
        return cursor.index();
    }

    pub fn position_of(&self, index: Index) -> usize {
        assert_eq!(
            index.version(),
            self.version,
            "index from tree version {} used with version {}",
            index.version(),
            self.version
        );
        return index.position();
    }

    pub fn element_at(&self, index: Index) -> Option<&S::Element> {
        return self.get(self.position_of(index));
    }

    // Points.

    pub fn point<B: Dimension<S>, O: Dimension<S>>(&self, index: Index) -> CollectionPoint<B, O> {
        return self.cursor_at_index(index).point();
    }

    /// The point of the leftmost position whose `O` measure reaches `value`.
    pub fn point_of<B: Dimension<S>, O: Dimension<S>>(&self, value: O) -> CollectionPoint<B, O> {
        return self.cursor_at(value).point();
    }

    pub fn index_of_point<B: Dimension<S>, O: Dimension<S>>(
        &self,
        point: CollectionPoint<B, O>,
    ) -> Index {
        let mut cursor = self.cursor();
        cursor.seek_point(point);
        return cursor.index();
    }

    /// Every position that is a `D` boundary, in order.
    pub fn boundaries<D: Dimension<S>>(&self) -> Vec<usize> {
        let mut cursor = self.cursor();
        let mut positions = vec![0];
        while cursor.seek_next::<D>() {
            positions.push(cursor.position());
        }
        return positions;
    }

    // Validation.

    /// Check every structural invariant and the tracker's records.
    pub fn ensure_valid(&self) -> Result<(), InvariantError> {
        let result = self
            .root
            .check(&self.context.capacity, true)
            .and_then(|()| self.context.tracker.check(&self.root));
        if let Err(error) = &result {
            tracing::debug!(%error, version = self.version, len = self.len(), "tree failed validation");
        }
        return result;
    }
}

impl<S, X> SummarizedTree<S, X>
where
    S: Summary,
    S::Element: Identified,
    X: Locate<S>,
{
    /// Position of the element with identity `id`.
    ///
    /// Logarithmic with an identity index, a scan otherwise.
    pub fn offset_of(&self, id: &<S::Element as Identified>::Id) -> Option<usize> {
        if X::TRACKS {
            return self.context.tracker.locate(&self.root, id);
        }
        return Iterator::position(&mut self.iter(), |element| element.id() == *id);
    }
}

fn removed_elements<S: Summary>(removed: Removed<S>) -> Vec<S::Element> {
    match removed {
        Removed::Elements(elements) => return elements,
        Removed::Tree(root) => return Cursor::new(&root, 0).cloned().collect(),
    }
}

impl<S: Summary, X: Tracker<S>> Default for SummarizedTree<S, X> {
    fn default() -> Self {
        return SummarizedTree::new();
    }
}

impl<S: Summary, X: Tracker<S>> FromIterator<S::Element> for SummarizedTree<S, X> {
    fn from_iter<I: IntoIterator<Item = S::Element>>(elements: I) -> Self {
        return SummarizedTree::from_elements(elements);
    }
}

impl<S: Summary, X: Tracker<S>> Extend<S::Element> for SummarizedTree<S, X> {
    fn extend<I: IntoIterator<Item = S::Element>>(&mut self, elements: I) {
        let more = SummarizedTree::from_elements_with(self.capacity(), elements);
        self.concat(more);
    }
}

impl<'a, S: Summary, X: Tracker<S>> IntoIterator for &'a SummarizedTree<S, X> {
    type Item = &'a S::Element;
    type IntoIter = Cursor<'a, S>;

    fn into_iter(self) -> Cursor<'a, S> {
        return self.iter();
    }
}

impl<S, X> PartialEq for SummarizedTree<S, X>
where
    S: Summary,
    S::Element: PartialEq,
    X: Tracker<S>,
{
    fn eq(&self, other: &Self) -> bool {
        return self.len() == other.len() && self.iter().eq(other.iter());
    }
}

impl<S, X> fmt::Debug for SummarizedTree<S, X>
where
    S: Summary,
    S::Element: fmt::Debug,
    X: Tracker<S>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_list().entries(self.iter()).finish();
    }
}
