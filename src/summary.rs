//! Summaries and dimensions.
//!
//! A [`Summary`] is a monoid measured over runs of elements. Every node in the
//! tree caches the summary of its subtree, so the summary of a concatenation is
//! always the sum of the summaries of its pieces and nothing is ever rescanned
//! after a structural edit.
//!
//! A [`Dimension`] projects one measure out of a summary (an element count, a
//! rendered height, a byte length, ...). Any number of dimensions can be
//! defined over the same summary, and the cursor can seek by each of them.
//!
//! # Boundaries
//!
//! Position `i` is a boundary of dimension `D` when the running `D` measure
//! changes crossing it: `i == 0`, or the element just before `i` has a non-zero
//! `D` measure. Seeking to a value `d` lands on the leftmost position whose
//! running measure reaches `d`, which is always a boundary.

use std::fmt::Debug;
use std::ops::{Add, Sub};

/// A monoid over elements, cached at every node of the tree.
pub trait Summary: Clone + Debug + PartialEq {
    /// The element type this summary measures.
    type Element: Clone;

    /// The identity of `add_summary`.
    fn zero() -> Self;

    /// Summary of a single element.
    fn of(element: &Self::Element) -> Self;

    /// Associative addition.
    fn add_summary(&mut self, other: &Self);

    /// Inverse of `add_summary`: `(a + b) - b == a`.
    fn subtract_summary(&mut self, other: &Self);

    /// Summary of a run of elements.
    fn summarize(elements: &[Self::Element]) -> Self {
        let mut total = Self::zero();
        for element in elements {
            total.add_summary(&Self::of(element));
        }
        return total;
    }

    /// Sum of a sequence of summaries.
    fn sum<'a, I>(summaries: I) -> Self
    where
        Self: 'a,
        I: IntoIterator<Item = &'a Self>,
    {
        let mut total = Self::zero();
        for summary in summaries {
            total.add_summary(summary);
        }
        return total;
    }
}

/// A projection of a [`Summary`] that can be used for seeking.
///
/// `Default::default()` is the dimension's zero. Measures must be monotone:
/// adding elements never decreases the running value.
pub trait Dimension<S: Summary>:
    Copy + Ord + Debug + Default + Add<Output = Self> + Sub<Output = Self>
{
    /// Project this dimension out of a summary.
    fn measure(summary: &S) -> Self;

    /// Measure of a single element.
    fn measure_element(element: &S::Element) -> Self {
        return Self::measure(&S::of(element));
    }

    /// Whether crossing `element` changes the running measure.
    fn advances(element: &S::Element) -> bool {
        return Self::measure_element(element) != Self::default();
    }

    /// Whether position `at` of `elements` is a boundary of this dimension.
    ///
    /// Only meaningful for the first run of a collection: a leaf-local
    /// position 0 is a boundary only if the element before the leaf advances.
    fn is_boundary(elements: &[S::Element], at: usize) -> bool {
        if at == 0 {
            return true;
        }
        return Self::advances(&elements[at - 1]);
    }

    /// Leftmost position whose cumulative measure is `>= target`.
    ///
    /// Returns `elements.len()` when the run never reaches `target`.
    fn index_in(elements: &[S::Element], target: Self) -> usize {
        let mut running = Self::default();
        if running >= target {
            return 0;
        }
        for (i, element) in elements.iter().enumerate() {
            running = running + Self::measure_element(element);
            if running >= target {
                return i + 1;
            }
        }
        return elements.len();
    }

    /// Leftmost position whose cumulative measure is `> target`.
    ///
    /// This is the first boundary strictly after every position measuring
    /// `target`.
    fn index_past(elements: &[S::Element], target: Self) -> usize {
        let mut running = Self::default();
        if running > target {
            return 0;
        }
        for (i, element) in elements.iter().enumerate() {
            running = running + Self::measure_element(element);
            if running > target {
                return i + 1;
            }
        }
        return elements.len();
    }
}

/// A position expressed as the nearest `B` boundary at or before it, plus the
/// remaining distance measured in `O`.
///
/// Not every element index is a boundary of every dimension, so a position in
/// a coarse dimension (lines, rows) needs a residual in a finer one (elements,
/// bytes). Points order lexicographically: by `base`, then by `offset`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPoint<B, O> {
    pub base: B,
    pub offset: O,
}

impl<B, O> CollectionPoint<B, O> {
    pub fn new(base: B, offset: O) -> CollectionPoint<B, O> {
        return CollectionPoint { base, offset };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Count, Height, Row, RowSummary};

    fn rows(heights: &[u64]) -> Vec<Row> {
        return heights.iter().map(|&height| Row::new(height, 1)).collect();
    }

    #[test]
    fn summarize_adds_every_element() {
        let summary = RowSummary::summarize(&rows(&[10, 0, 5]));
        assert_eq!(summary.count, 3);
        assert_eq!(summary.height, 15);
        assert_eq!(summary.chars, 3);
    }

    #[test]
    fn subtract_inverts_add() {
        let a = RowSummary::summarize(&rows(&[1, 2]));
        let b = RowSummary::summarize(&rows(&[3]));
        let mut total = a.clone();
        total.add_summary(&b);
        total.subtract_summary(&b);
        assert_eq!(total, a);
    }

    #[test]
    fn index_in_prefers_leftmost_reach() {
        let elements = rows(&[10, 10]);
        assert_eq!(Height::index_in(&elements, Height(0)), 0);
        assert_eq!(Height::index_in(&elements, Height(5)), 1);
        assert_eq!(Height::index_in(&elements, Height(10)), 1);
        assert_eq!(Height::index_in(&elements, Height(11)), 2);
        assert_eq!(Height::index_in(&elements, Height(1000)), 2);
    }

    #[test]
    fn index_in_skips_nothing_after_zero_measure() {
        // The leftmost position reaching 10 is after the first row, even though
        // the zero-height row that follows keeps the measure at 10.
        let elements = rows(&[10, 0, 10]);
        assert_eq!(Height::index_in(&elements, Height(10)), 1);
        assert_eq!(Height::index_past(&elements, Height(10)), 3);
    }

    #[test]
    fn index_past_finds_next_boundary() {
        let elements = rows(&[0, 0, 7, 0]);
        assert_eq!(Height::index_past(&elements, Height(0)), 3);
        assert_eq!(Height::index_past(&elements, Height(7)), 4);
    }

    #[test]
    fn boundaries_follow_advancing_elements() {
        let elements = rows(&[3, 0, 2]);
        let found: Vec<_> = (0..=elements.len())
            .filter(|&at| Height::is_boundary(&elements, at))
            .collect();
        assert_eq!(found, vec![0, 1, 3]);
        // Every element advances the count.
        let all: Vec<_> = (0..=elements.len())
            .filter(|&at| <Count as Dimension<RowSummary>>::is_boundary(&elements, at))
            .collect();
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    #[test]
    fn points_order_lexicographically() {
        let a = CollectionPoint::new(Height(1), Count(9));
        let b = CollectionPoint::new(Height(2), Count(0));
        let c = CollectionPoint::new(Height(2), Count(1));
        assert!(a < b);
        assert!(b < c);
    }
}
