//! Stable merge sort and top-K selection.
//!
//! Every ranking query in the catalogue ("most rated", "highest average",
//! "most credited") funnels through [`top_k`], so ties are always resolved the
//! same way: records of equal rank keep their original relative order.

use serde::Serialize;
use std::cmp::Ordering;

/// An `(id, rank)` pair snapshotted for a single ranking query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ranked<I, R> {
    id: I,
    rank: R,
}

impl<I: Copy, R: Copy + PartialOrd> Ranked<I, R> {
    pub fn new(id: I, rank: R) -> Self {
        Self { id, rank }
    }

    pub fn id(&self) -> I {
        self.id
    }

    pub fn rank(&self) -> R {
        self.rank
    }

    /// Comparator placing higher ranks first.
    ///
    /// Incomparable ranks (NaN averages) compare as equal, so they keep their
    /// input position relative to each other.
    pub fn highest_first(a: &Self, b: &Self) -> Ordering {
        b.rank.partial_cmp(&a.rank).unwrap_or(Ordering::Equal)
    }
}

/// Stable merge sort driven by `compare`.
///
/// Records come out in ascending `compare` order; when two records compare
/// `Equal` the one that appeared first in the input stays first.
pub fn merge_sort<T, F>(records: Vec<T>, compare: F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    sort_run(records, &compare)
}

/// The first `min(k, len)` records after a [`merge_sort`] by `compare`
pub fn top_k<T, F>(records: Vec<T>, compare: F, k: usize) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    let mut sorted = merge_sort(records, compare);
    sorted.truncate(k);
    sorted
}

fn sort_run<T, F>(mut records: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if records.len() <= 1 {
        return records;
    }

    let right = records.split_off(records.len() / 2);
    let left = sort_run(records, compare);
    let right = sort_run(right, compare);
    merge(left, right, compare)
}

fn merge<T, F>(left: Vec<T>, right: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        // Ties go to the left half, which is what keeps the sort stable
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(l, r) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        merged.extend(if take_left { left.next() } else { right.next() });
    }

    merged
}
