//! B+Tree throughput on the in-memory store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pagetree::{BTree, MemoryStore, TreeOptions};

const ENTRIES: u64 = 10_000;

fn build(page_size: usize) -> BTree<u64, u64, MemoryStore> {
    let options = TreeOptions::default().with_page_size(page_size).unwrap();
    let mut tree = BTree::create(MemoryStore::new(), options).unwrap();
    for k in 0..ENTRIES {
        tree.insert(scramble(k), k, false).unwrap();
    }
    tree
}

/// Spread sequential keys across the key space.
fn scramble(k: u64) -> u64 {
    k.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(ENTRIES));
    group.sample_size(10);

    for page_size in [16, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(page_size), &page_size, |b, &ps| {
            b.iter(|| black_box(build(ps)));
        });
    }
    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");

    for page_size in [16, 64, 256] {
        let tree = build(page_size);
        let mut k = 0;
        group.bench_with_input(BenchmarkId::from_parameter(page_size), &page_size, |b, _| {
            b.iter(|| {
                k = (k + 1) % ENTRIES;
                black_box(tree.find(&scramble(k)).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let tree = build(64);
    c.bench_function("scan", |b| {
        b.iter(|| {
            let mut cursor = tree.browse().unwrap();
            let mut sum = 0u64;
            while let Some((_, v)) = cursor.next().unwrap() {
                sum = sum.wrapping_add(v);
            }
            black_box(sum)
        });
    });
}

criterion_group!(benches, bench_insert, bench_find, bench_scan);
criterion_main!(benches);
