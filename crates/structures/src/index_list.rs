//! A minimal singly linked list that refuses duplicates.
//!
//! `IndexList` is the bucket type of the [`RangeTree`](crate::RangeTree) and the
//! accumulator used to gather query results before they are handed back as a
//! `Vec`. New elements are always appended at the tail, so iteration order is
//! insertion order.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;

struct Node<T> {
    value: T,
    next: Option<Box<Node<T>>>,
}

/// Singly linked list with dedup-on-insert.
///
/// The empty list has no head node. Equality of elements is value equality
/// (`PartialEq`), so inserting a value already present is a no-op that
/// returns `false`.
pub struct IndexList<T> {
    head: Option<Box<Node<T>>>,
    len: usize,
}

impl<T> IndexList<T> {
    /// Creates an empty list
    pub fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Borrowing iterator in insertion order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Splices `other` onto the tail of this list without copying its nodes.
    ///
    /// The dedup check is skipped here: callers hand over lists whose
    /// elements are disjoint from `self` (buckets of distinct tree keys).
    pub fn append_list(&mut self, mut other: IndexList<T>) {
        let Some(other_head) = other.head.take() else {
            return;
        };

        let mut tail = &mut self.head;
        while let Some(node) = tail {
            tail = &mut node.next;
        }
        *tail = Some(other_head);

        self.len += other.len;
        other.len = 0;
    }

    /// Drops every element
    pub fn clear(&mut self) {
        let mut cursor = self.head.take();
        while let Some(mut node) = cursor {
            cursor = node.next.take();
        }
        self.len = 0;
    }

    // Builds a chain from values that are already known to be distinct.
    fn from_distinct(values: Vec<T>) -> Self {
        let len = values.len();
        let mut head = None;
        for value in values.into_iter().rev() {
            head = Some(Box::new(Node { value, next: head }));
        }
        Self { head, len }
    }
}

impl<T: PartialEq> IndexList<T> {
    /// Appends `value` unless an equal element is already present.
    ///
    /// Returns `true` if the value was added.
    pub fn insert(&mut self, value: T) -> bool {
        let mut tail = &mut self.head;
        while let Some(node) = tail {
            if node.value == value {
                return false;
            }
            tail = &mut node.next;
        }

        *tail = Some(Box::new(Node { value, next: None }));
        self.len += 1;
        true
    }

    /// Unlinks the element equal to `value`, if present
    pub fn remove(&mut self, value: &T) -> bool {
        let mut link = &mut self.head;
        while link.as_ref().is_some_and(|node| node.value != *value) {
            if let Some(node) = link {
                link = &mut node.next;
            }
        }

        match link.take() {
            Some(mut removed) => {
                *link = removed.next.take();
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.iter().any(|element| element == value)
    }
}

impl<T: Clone> IndexList<T> {
    /// Fresh snapshot of the elements; mutating it leaves the list untouched
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Default for IndexList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for IndexList<T> {
    // Unlinks node by node so long chains don't recurse through Box drops.
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Clone> Clone for IndexList<T> {
    fn clone(&self) -> Self {
        Self::from_distinct(self.to_vec())
    }
}

impl<T: fmt::Debug> fmt::Debug for IndexList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for IndexList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: PartialEq> FromIterator<T> for IndexList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = IndexList::new();
        for value in iter {
            list.insert(value);
        }
        list
    }
}

impl<'a, T> IntoIterator for &'a IndexList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over an [`IndexList`]
pub struct Iter<'a, T> {
    next: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|node| {
            self.next = node.next.as_deref();
            &node.value
        })
    }
}

// Serialized as a plain sequence; deserializing goes through `insert`, so
// duplicates in the input collapse.
impl<T: Serialize> Serialize for IndexList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Deserialize<'de> + PartialEq> Deserialize<'de> for IndexList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<T>::deserialize(deserializer)?;
        Ok(values.into_iter().collect())
    }
}
