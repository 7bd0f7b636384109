use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Clone, Debug)]
enum TableOp {
    Put(u32, u32),
    Add(u32, u32),
    Remove(u32),
    Get(u32),
}

#[derive(Clone, Debug)]
enum TreeOp {
    Insert(u16, u32),
    Remove(u16, u32),
    RemoveKey(u16),
    Range(u16, u16),
}

#[derive(Clone, Debug)]
enum ListOp {
    Insert(u8),
    Remove(u8),
}

fn table_ops() -> impl Strategy<Value = Vec<TableOp>> {
    // Narrow key space so removes and duplicate adds actually hit
    let key = 0u32..2_000;
    let op = prop_oneof![
        40 => (key.clone(), any::<u32>()).prop_map(|(k, v)| TableOp::Put(k, v)),
        30 => (key.clone(), any::<u32>()).prop_map(|(k, v)| TableOp::Add(k, v)),
        20 => key.clone().prop_map(TableOp::Remove),
        10 => key.prop_map(TableOp::Get),
    ];
    prop::collection::vec(op, 0..=3_000)
}

fn tree_ops() -> impl Strategy<Value = Vec<TreeOp>> {
    let key = 0u16..400;
    let id = 0u32..50;
    let op = prop_oneof![
        50 => (key.clone(), id.clone()).prop_map(|(k, v)| TreeOp::Insert(k, v)),
        20 => (key.clone(), id).prop_map(|(k, v)| TreeOp::Remove(k, v)),
        15 => key.clone().prop_map(TreeOp::RemoveKey),
        15 => (key.clone(), key).prop_map(|(a, b)| TreeOp::Range(a, b)),
    ];
    prop::collection::vec(op, 0..=1_500)
}

fn list_ops() -> impl Strategy<Value = Vec<ListOp>> {
    let op = prop_oneof![
        any::<u8>().prop_map(ListOp::Insert),
        any::<u8>().prop_map(ListOp::Remove),
    ];
    prop::collection::vec(op, 0..=400)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_hash_table_matches_model(ops in table_ops()) {
        let mut table: HashTable<u32, u32> = HashTable::new();
        let mut model: HashMap<u32, u32> = HashMap::new();
        let mut capacity = table.capacity();

        for op in ops {
            match op {
                TableOp::Put(key, value) => {
                    let previous = model.insert(key, value);
                    prop_assert_eq!(table.put(key, value), previous);
                    if previous.is_some() {
                        prop_assert_eq!(table.capacity(), capacity, "overwrite grew the table");
                    }
                }
                TableOp::Add(key, value) => {
                    let fresh = !model.contains_key(&key);
                    if fresh {
                        model.insert(key, value);
                    }
                    prop_assert_eq!(table.add(key, value), fresh);
                    if !fresh {
                        prop_assert_eq!(table.capacity(), capacity, "rejected add grew the table");
                    }
                }
                TableOp::Remove(key) => {
                    prop_assert_eq!(table.remove(&key), model.remove(&key));
                }
                TableOp::Get(key) => {
                    prop_assert_eq!(table.get(&key), model.get(&key));
                }
            }

            prop_assert_eq!(table.len(), model.len());
            prop_assert!(table.len() < table.capacity());
            prop_assert!(table.capacity() >= capacity, "capacity shrank");
            capacity = table.capacity();
        }

        let keys = table.keys();
        let unique: HashSet<u32> = keys.iter().copied().collect();
        prop_assert_eq!(unique.len(), keys.len(), "duplicate key in snapshot");
        prop_assert_eq!(unique, model.keys().copied().collect::<HashSet<u32>>());

        for (key, value) in &model {
            prop_assert_eq!(table.get(key), Some(value));
        }
    }

    #[test]
    fn prop_range_tree_matches_model(ops in tree_ops()) {
        let mut tree: RangeTree<u16, u32> = RangeTree::new();
        let mut model: BTreeMap<u16, Vec<u32>> = BTreeMap::new();

        for op in ops {
            match op {
                TreeOp::Insert(key, id) => {
                    tree.insert(key, id);
                    let bucket = model.entry(key).or_default();
                    if !bucket.contains(&id) {
                        bucket.push(id);
                    }
                }
                TreeOp::Remove(key, id) => {
                    let expected = match model.get_mut(&key) {
                        Some(bucket) => match bucket.iter().position(|&v| v == id) {
                            Some(i) => {
                                bucket.remove(i);
                                if bucket.is_empty() {
                                    model.remove(&key);
                                }
                                true
                            }
                            None => false,
                        },
                        None => false,
                    };
                    prop_assert_eq!(tree.remove(&key, &id), expected);
                }
                TreeOp::RemoveKey(key) => {
                    let got = tree.remove_key(&key).map(|bucket| bucket.to_vec());
                    prop_assert_eq!(got, model.remove(&key));
                }
                TreeOp::Range(start, end) => {
                    let expected: Vec<u32> = model
                        .iter()
                        .filter(|(key, _)| start < **key && **key < end)
                        .flat_map(|(_, bucket)| bucket.iter().copied())
                        .collect();
                    prop_assert_eq!(tree.range_query(&start, &end), expected);
                }
            }

            prop_assert_eq!(tree.key_count(), model.len());
        }

        tree.assert_invariants();
        prop_assert_eq!(tree.keys(), model.keys().copied().collect::<Vec<u16>>());
    }

    #[test]
    fn prop_index_list_never_holds_duplicates(ops in list_ops()) {
        let mut list: IndexList<u8> = IndexList::new();
        let mut model: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                ListOp::Insert(value) => {
                    let fresh = !model.contains(&value);
                    if fresh {
                        model.push(value);
                    }
                    prop_assert_eq!(list.insert(value), fresh);
                }
                ListOp::Remove(value) => {
                    let position = model.iter().position(|&v| v == value);
                    if let Some(i) = position {
                        model.remove(i);
                    }
                    prop_assert_eq!(list.remove(&value), position.is_some());
                }
            }
            prop_assert_eq!(list.len(), model.len());
            prop_assert_eq!(list.is_empty(), model.is_empty());
        }

        prop_assert_eq!(list.to_vec(), model);
    }

    #[test]
    fn prop_top_k_is_stable_prefix(ranks in prop::collection::vec(0u32..20, 0..300), k in 0usize..50) {
        let records: Vec<Ranked<u32, u32>> = ranks
            .iter()
            .enumerate()
            .map(|(id, &rank)| Ranked::new(id as u32, rank))
            .collect();

        let mut expected = records.clone();
        expected.sort_by(Ranked::highest_first);
        expected.truncate(k);

        prop_assert_eq!(top_k(records, Ranked::highest_first, k), expected);
    }
}
