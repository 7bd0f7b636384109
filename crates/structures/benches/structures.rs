//! Benchmarks for the catalogue containers
//!
//! Run with: cargo bench --package structures
//!
//! Sizes mirror a full film catalogue: ~45k films, ~270k ratings.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use structures::{HashTable, RangeTree, Ranked, top_k};

const FILMS: u32 = 45_000;

fn build_table(n: u32) -> HashTable<u32, u32> {
    let mut table = HashTable::new();
    for id in 0..n {
        table.add(id, id % 97);
    }
    table
}

fn build_tree(n: u32) -> RangeTree<u32, u32> {
    let mut tree = RangeTree::new();
    for id in 0..n {
        // Roughly 3 films per "day" across ~40 years
        tree.insert(id.wrapping_mul(2_654_435_761) % 15_000, id);
    }
    tree
}

fn bench_hash_table_insert(c: &mut Criterion) {
    c.bench_function("hash_table_insert_45k", |b| {
        b.iter(|| {
            let table = build_table(black_box(FILMS));
            black_box(table.len())
        })
    });
}

fn bench_hash_table_get(c: &mut Criterion) {
    let table = build_table(FILMS);

    c.bench_function("hash_table_get", |b| {
        b.iter(|| {
            let mut hits = 0u32;
            for id in (0..FILMS).step_by(7) {
                if table.get(black_box(&id)).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });
}

fn bench_range_query(c: &mut Criterion) {
    let tree = build_tree(FILMS);

    c.bench_function("range_tree_query_1y", |b| {
        b.iter(|| {
            let found = tree.range_query(black_box(&5_000), black_box(&5_365));
            black_box(found)
        })
    });
}

fn bench_top_k(c: &mut Criterion) {
    let table = build_table(FILMS);

    c.bench_function("top_k_most_rated_100", |b| {
        b.iter(|| {
            let records: Vec<Ranked<u32, u32>> = table
                .iter()
                .map(|(&id, &count)| Ranked::new(id, count))
                .collect();
            black_box(top_k(records, Ranked::highest_first, 100))
        })
    });
}

criterion_group!(
    benches,
    bench_hash_table_insert,
    bench_hash_table_get,
    bench_range_query,
    bench_top_k
);
criterion_main!(benches);
