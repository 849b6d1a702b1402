//! Summaries used by the unit tests.

use std::ops::{Add, Sub};

use crate::context::Identified;
use crate::summary::{Dimension, Summary};

macro_rules! measure {
    ($name:ident, $ty:ty) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub $ty);

        impl Add for $name {
            type Output = $name;
            fn add(self, other: $name) -> $name {
                return $name(self.0 + other.0);
            }
        }

        impl Sub for $name {
            type Output = $name;
            fn sub(self, other: $name) -> $name {
                return $name(self.0 - other.0);
            }
        }
    };
}

measure!(Count, usize);
measure!(Height, u64);
measure!(Chars, u64);
measure!(Total, u64);

/// A rendered row: a height and a character count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Row {
    pub height: u64,
    pub chars: u64,
}

impl Row {
    pub fn new(height: u64, chars: u64) -> Row {
        return Row { height, chars };
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowSummary {
    pub count: usize,
    pub height: u64,
    pub chars: u64,
}

impl Summary for RowSummary {
    type Element = Row;

    fn zero() -> RowSummary {
        return RowSummary::default();
    }

    fn of(row: &Row) -> RowSummary {
        return RowSummary {
            count: 1,
            height: row.height,
            chars: row.chars,
        };
    }

    fn add_summary(&mut self, other: &RowSummary) {
        self.count += other.count;
        self.height += other.height;
        self.chars += other.chars;
    }

    fn subtract_summary(&mut self, other: &RowSummary) {
        self.count -= other.count;
        self.height -= other.height;
        self.chars -= other.chars;
    }
}

impl Dimension<RowSummary> for Count {
    fn measure(summary: &RowSummary) -> Count {
        return Count(summary.count);
    }
}

impl Dimension<RowSummary> for Height {
    fn measure(summary: &RowSummary) -> Height {
        return Height(summary.height);
    }
}

impl Dimension<RowSummary> for Chars {
    fn measure(summary: &RowSummary) -> Chars {
        return Chars(summary.chars);
    }
}

/// An element with a stable identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tagged(pub u32);

impl Identified for Tagged {
    type Id = u32;

    fn id(&self) -> u32 {
        return self.0;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSummary {
    pub count: usize,
    pub total: u64,
}

impl Summary for TagSummary {
    type Element = Tagged;

    fn zero() -> TagSummary {
        return TagSummary::default();
    }

    fn of(tag: &Tagged) -> TagSummary {
        return TagSummary {
            count: 1,
            total: tag.0 as u64,
        };
    }

    fn add_summary(&mut self, other: &TagSummary) {
        self.count += other.count;
        self.total += other.total;
    }

    fn subtract_summary(&mut self, other: &TagSummary) {
        self.count -= other.count;
        self.total -= other.total;
    }
}

impl Dimension<TagSummary> for Count {
    fn measure(summary: &TagSummary) -> Count {
        return Count(summary.count);
    }
}

impl Dimension<TagSummary> for Total {
    fn measure(summary: &TagSummary) -> Total {
        return Total(summary.total);
    }
}

pub fn tags(range: std::ops::Range<u32>) -> Vec<Tagged> {
    return range.map(Tagged).collect();
}
