//! # Structures Crate
//!
//! The low-level containers every catalogue store is built from.
//!
//! ## Main Components
//!
//! - **hash_table**: `HashTable<K, V>`, chained hash map with staged growth.
//!   Primary index for films, people and ratings.
//! - **range_tree**: `RangeTree<K, V>`, AVL tree mapping a date to a bucket
//!   of ids. Answers open-interval range queries.
//! - **index_list**: `IndexList<T>`, singly linked, duplicate-free list used
//!   as tree bucket and result accumulator.
//! - **top_k**: `merge_sort` / `top_k` / `Ranked`, the one sorting primitive
//!   behind every "most X" query.
//!
//! ## Example Usage
//!
//! ```
//! use structures::{HashTable, RangeTree, Ranked, top_k};
//!
//! let mut titles = HashTable::new();
//! titles.add(862u32, "Toy Story");
//! assert_eq!(titles.get(&862), Some(&"Toy Story"));
//!
//! let mut released = RangeTree::new();
//! released.insert((1995, 10, 30), 862u32);
//! released.insert((1995, 12, 15), 8844u32);
//! assert_eq!(released.range_query(&(1995, 1, 1), &(1995, 12, 15)), vec![862]);
//!
//! let counts = vec![Ranked::new(1u32, 5u32), Ranked::new(2, 9)];
//! let top = top_k(counts, Ranked::highest_first, 1);
//! assert_eq!(top[0].id(), 2);
//! ```
//!
//! None of the containers are thread-safe or need to be: every operation runs
//! to completion on the caller's thread.

pub mod hash_table;
pub mod index_list;
pub mod range_tree;
pub mod top_k;

#[cfg(test)]
mod proptests;

pub use hash_table::{GROWTH_SCHEDULE, HashTable, LOAD_FACTOR, TableKey};
pub use index_list::IndexList;
pub use range_tree::RangeTree;
pub use top_k::{Ranked, merge_sort, top_k};
