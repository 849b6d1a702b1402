//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::ops::{Add, Sub};

use summit::{Capacity, Dimension, IdIndex, Identified, SummarizedTree, Summary};

// =============================================================================
// Elements and summaries
// =============================================================================

/// A row with a stable id and a rendered height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Item {
    pub id: u32,
    pub height: u64,
}

impl Item {
    pub fn new(id: u32, height: u64) -> Item {
        return Item { id, height };
    }
}

impl Identified for Item {
    type Id = u32;

    fn id(&self) -> u32 {
        return self.id;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemSummary {
    pub count: usize,
    pub height: u64,
}

impl Summary for ItemSummary {
    type Element = Item;

    fn zero() -> ItemSummary {
        return ItemSummary::default();
    }

    fn of(item: &Item) -> ItemSummary {
        return ItemSummary {
            count: 1,
            height: item.height,
        };
    }

    fn add_summary(&mut self, other: &ItemSummary) {
        self.count += other.count;
        self.height += other.height;
    }

    fn subtract_summary(&mut self, other: &ItemSummary) {
        self.count -= other.count;
        self.height -= other.height;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Count(pub usize);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Height(pub u64);

impl Add for Count {
    type Output = Count;
    fn add(self, other: Count) -> Count {
        return Count(self.0 + other.0);
    }
}

impl Sub for Count {
    type Output = Count;
    fn sub(self, other: Count) -> Count {
        return Count(self.0 - other.0);
    }
}

impl Add for Height {
    type Output = Height;
    fn add(self, other: Height) -> Height {
        return Height(self.0 + other.0);
    }
}

impl Sub for Height {
    type Output = Height;
    fn sub(self, other: Height) -> Height {
        return Height(self.0 - other.0);
    }
}

impl Dimension<ItemSummary> for Count {
    fn measure(summary: &ItemSummary) -> Count {
        return Count(summary.count);
    }
}

impl Dimension<ItemSummary> for Height {
    fn measure(summary: &ItemSummary) -> Height {
        return Height(summary.height);
    }
}

pub type Items = SummarizedTree<ItemSummary>;
pub type TrackedItems = SummarizedTree<ItemSummary, IdIndex<u32>>;

// =============================================================================
// Helpers
// =============================================================================

/// The smallest capacity, so that small inputs build deep trees.
pub fn small() -> Capacity {
    return Capacity::new(Capacity::MIN, Capacity::MIN);
}

/// Items `ids` with heights cycling through 0, 1, 2.
pub fn items(ids: std::ops::Range<u32>) -> Vec<Item> {
    return ids.map(|id| Item::new(id, (id % 3) as u64)).collect();
}

pub fn ids<'a>(elements: impl IntoIterator<Item = &'a Item>) -> Vec<u32> {
    return elements.into_iter().map(|item| item.id).collect();
}

/// Leftmost position whose running height reaches `target`, or the length
/// when the total falls short.
pub fn leftmost_reaching(model: &[Item], target: u64) -> usize {
    let mut running = 0;
    if target == 0 {
        return 0;
    }
    for (i, item) in model.iter().enumerate() {
        running += item.height;
        if running >= target {
            return i + 1;
        }
    }
    return model.len();
}

/// Read a numeric setting from the environment.
pub fn env_or(name: &str, default: u64) -> u64 {
    return std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default);
}
