//! AVL-balanced range index.
//!
//! [`RangeTree`] maps an ordered key (a release date, in the catalogue) to a
//! bucket of entity ids and answers open-interval range queries. Release
//! dates cluster heavily around certain years, so the tree rebalances on every
//! structural change to keep lookups and range scans at O(log n + k).
//!
//! Nodes live in an arena and refer to each other through [`NodeId`]
//! handles; rotations rewrite handles in place. Slots freed by deletions are
//! recycled by later inserts.

use crate::index_list::IndexList;
use std::cmp::Ordering;
use std::fmt;
use std::mem;

/// Handle to a node slot in the tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(usize);

struct Node<K, V> {
    key: K,
    bucket: IndexList<V>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    height: i32,
}

/// Ordered index from keys to duplicate-free buckets of values.
///
/// Invariants, checked with `debug_assert!` after every rebalance:
/// - BST ordering by key
/// - `|height(left) - height(right)| <= 1` at every node
/// - no key is present with an empty bucket
pub struct RangeTree<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    keys: usize,
    len: usize,
}

impl<K: Ord, V: PartialEq> RangeTree<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            keys: 0,
            len: 0,
        }
    }

    /// Total number of values across all buckets
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.keys
    }

    /// Height of the tree (0 when empty)
    pub fn height(&self) -> usize {
        self.height_of(self.root) as usize
    }

    /// Indexes `value` under `key`.
    ///
    /// An existing key gets the value appended to its bucket (a value already
    /// in that bucket is ignored); a new key gets a fresh node and the path
    /// back to the root is rebalanced.
    pub fn insert(&mut self, key: K, value: V) {
        let root = self.insert_at(self.root, key, value);
        self.root = Some(root);
    }

    /// Bucket stored under `key`
    pub fn get(&self, key: &K) -> Option<&IndexList<V>> {
        self.find(key).map(|id| &self.node(id).bucket)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Removes `key` entirely and hands back its bucket
    pub fn remove_key(&mut self, key: &K) -> Option<IndexList<V>> {
        let mut removed = None;
        self.root = self.remove_at(self.root, key, &mut removed);

        if let Some(bucket) = &removed {
            self.keys -= 1;
            self.len -= bucket.len();
        }
        removed
    }

    /// Removes one value from the bucket under `key`.
    ///
    /// When that empties the bucket, the key itself is deleted from the tree.
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        let Some(id) = self.find(key) else {
            return false;
        };
        if !self.node_mut(id).bucket.remove(value) {
            return false;
        }

        self.len -= 1;
        if self.node(id).bucket.is_empty() {
            self.remove_key(key);
        }
        true
    }

    /// Drops every key and frees the arena
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.keys = 0;
        self.len = 0;
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.0]
    }

    fn find(&self, key: &K) -> Option<NodeId> {
        let mut cursor = self.root;
        while let Some(id) = cursor {
            let node = self.node(id);
            cursor = match key.cmp(&node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    fn alloc(&mut self, key: K, value: V) -> NodeId {
        let mut bucket = IndexList::new();
        bucket.insert(value);
        let node = Node {
            key,
            bucket,
            left: None,
            right: None,
            height: 1,
        };

        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    // The slot keeps its (stale) key until reused; its bucket has already
    // been moved out by the caller.
    fn release(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.left = None;
        node.right = None;
        node.height = 0;
        self.free.push(id);
    }

    fn insert_at(&mut self, at: Option<NodeId>, key: K, value: V) -> NodeId {
        let Some(id) = at else {
            self.keys += 1;
            self.len += 1;
            return self.alloc(key, value);
        };

        match key.cmp(&self.node(id).key) {
            Ordering::Less => {
                let left = self.node(id).left;
                let left = self.insert_at(left, key, value);
                self.node_mut(id).left = Some(left);
            }
            Ordering::Greater => {
                let right = self.node(id).right;
                let right = self.insert_at(right, key, value);
                self.node_mut(id).right = Some(right);
            }
            Ordering::Equal => {
                if self.node_mut(id).bucket.insert(value) {
                    self.len += 1;
                }
                return id;
            }
        }

        self.rebalance(id)
    }

    fn remove_at(
        &mut self,
        at: Option<NodeId>,
        key: &K,
        removed: &mut Option<IndexList<V>>,
    ) -> Option<NodeId> {
        let id = at?;

        match key.cmp(&self.node(id).key) {
            Ordering::Less => {
                let left = self.node(id).left;
                let left = self.remove_at(left, key, removed);
                self.node_mut(id).left = left;
            }
            Ordering::Greater => {
                let right = self.node(id).right;
                let right = self.remove_at(right, key, removed);
                self.node_mut(id).right = right;
            }
            Ordering::Equal => {
                *removed = Some(mem::take(&mut self.node_mut(id).bucket));
                let (left, right) = (self.node(id).left, self.node(id).right);
                self.release(id);

                let (left, right) = match (left, right) {
                    (None, child) | (child, None) => return child,
                    (Some(left), Some(right)) => (left, right),
                };

                // Splice the in-order successor into the vacated position
                let successor = self.min_node(right);
                let rest = self.remove_min(right);
                let node = self.node_mut(successor);
                node.left = Some(left);
                node.right = rest;
                return Some(self.rebalance(successor));
            }
        }

        Some(self.rebalance(id))
    }

    fn min_node(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left {
            id = left;
        }
        id
    }

    // Unlinks the minimum of the subtree rooted at `id` (without releasing
    // its slot) and returns the new subtree root.
    fn remove_min(&mut self, id: NodeId) -> Option<NodeId> {
        let Some(left) = self.node(id).left else {
            return self.node(id).right;
        };
        let left = self.remove_min(left);
        self.node_mut(id).left = left;
        Some(self.rebalance(id))
    }

    fn height_of(&self, at: Option<NodeId>) -> i32 {
        at.map_or(0, |id| self.node(id).height)
    }

    fn update_height(&mut self, id: NodeId) {
        let node = self.node(id);
        let height = 1 + self.height_of(node.left).max(self.height_of(node.right));
        self.node_mut(id).height = height;
    }

    fn balance_factor(&self, id: NodeId) -> i32 {
        let node = self.node(id);
        self.height_of(node.left) - self.height_of(node.right)
    }

    //      y           x
    //     / \         / \
    //    x   T3  ->  T1  y
    //   / \             / \
    //  T1  T2          T2  T3
    fn rotate_right(&mut self, y: NodeId) -> NodeId {
        let x = self
            .node(y)
            .left
            .expect("right rotation needs a left child");
        let t2 = self.node(x).right;

        self.node_mut(x).right = Some(y);
        self.node_mut(y).left = t2;
        self.update_height(y);
        self.update_height(x);
        x
    }

    fn rotate_left(&mut self, x: NodeId) -> NodeId {
        let y = self
            .node(x)
            .right
            .expect("left rotation needs a right child");
        let t2 = self.node(y).left;

        self.node_mut(y).left = Some(x);
        self.node_mut(x).right = t2;
        self.update_height(x);
        self.update_height(y);
        y
    }

    /// Restores the AVL property at `id` and returns the subtree's new root.
    fn rebalance(&mut self, id: NodeId) -> NodeId {
        self.update_height(id);
        let balance = self.balance_factor(id);
        let (left, right) = (self.node(id).left, self.node(id).right);

        let root = match (left, right) {
            (Some(left), _) if balance > 1 => {
                if self.balance_factor(left) < 0 {
                    let left = self.rotate_left(left);
                    self.node_mut(id).left = Some(left);
                }
                self.rotate_right(id)
            }
            (_, Some(right)) if balance < -1 => {
                if self.balance_factor(right) > 0 {
                    let right = self.rotate_right(right);
                    self.node_mut(id).right = Some(right);
                }
                self.rotate_left(id)
            }
            _ => id,
        };

        debug_assert!(
            self.balance_factor(root).abs() <= 1,
            "balance factor {} after rebalance",
            self.balance_factor(root)
        );
        root
    }
}

impl<K: Ord, V: PartialEq + Clone> RangeTree<K, V> {
    /// Every value indexed under a key strictly between `start` and `end`.
    ///
    /// Both endpoints are excluded. Values come back ordered by key, and in
    /// bucket order within a key.
    pub fn range_query(&self, start: &K, end: &K) -> Vec<V> {
        let mut found = IndexList::new();
        self.collect_range(self.root, start, end, &mut found);
        found.to_vec()
    }

    // Walks right-to-left so each matching bucket is cloned and the results
    // gathered so far are spliced behind it.
    fn collect_range(&self, at: Option<NodeId>, start: &K, end: &K, found: &mut IndexList<V>) {
        let Some(id) = at else {
            return;
        };
        let node = self.node(id);

        if *end > node.key {
            self.collect_range(node.right, start, end, found);
        }
        if *start < node.key && node.key < *end {
            let mut chunk = node.bucket.clone();
            chunk.append_list(mem::take(found));
            *found = chunk;
        }
        if *start < node.key {
            self.collect_range(node.left, start, end, found);
        }
    }
}

impl<K: Ord + Clone, V: PartialEq> RangeTree<K, V> {
    /// Keys in ascending order
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.keys);
        let mut stack = Vec::new();
        let mut cursor = self.root;

        while cursor.is_some() || !stack.is_empty() {
            while let Some(id) = cursor {
                stack.push(id);
                cursor = self.node(id).left;
            }
            if let Some(id) = stack.pop() {
                keys.push(self.node(id).key.clone());
                cursor = self.node(id).right;
            }
        }
        keys
    }
}

#[cfg(test)]
impl<K: Ord, V: PartialEq> RangeTree<K, V> {
    /// Panics if any structural invariant is broken.
    pub(crate) fn assert_invariants(&self) {
        let (keys, values) = self.check_subtree(self.root, None, None);
        assert_eq!(keys, self.keys, "key count drifted");
        assert_eq!(values, self.len, "value count drifted");
    }

    fn check_subtree(&self, at: Option<NodeId>, lower: Option<&K>, upper: Option<&K>) -> (usize, usize) {
        let Some(id) = at else {
            return (0, 0);
        };
        let node = self.node(id);

        assert!(lower.is_none_or(|lower| *lower < node.key), "BST order broken");
        assert!(upper.is_none_or(|upper| node.key < *upper), "BST order broken");
        assert!(!node.bucket.is_empty(), "empty bucket left in the tree");

        let expected = 1 + self.height_of(node.left).max(self.height_of(node.right));
        assert_eq!(node.height, expected, "stale height");
        assert!(self.balance_factor(id).abs() <= 1, "unbalanced node");

        let (left_keys, left_values) = self.check_subtree(node.left, lower, Some(&node.key));
        let (right_keys, right_values) = self.check_subtree(node.right, Some(&node.key), upper);
        (
            1 + left_keys + right_keys,
            node.bucket.len() + left_values + right_values,
        )
    }
}

impl<K: Ord, V: PartialEq> Default for RangeTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V> fmt::Debug for RangeTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeTree")
            .field("keys", &self.keys)
            .field("len", &self.len)
            .field("root", &self.root.map(|id| &self.nodes[id.0].key))
            .finish()
    }
}
