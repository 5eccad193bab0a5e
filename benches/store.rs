//! Benchmarks for ripple-store
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ripple_store::{
    EntityCollection, OneToManyIndex, OpenMap, ReactiveMap, Value, detect_changes, record,
};

fn track(id: i64, album: i64) -> Value {
    record! { "id" => id, "album_id" => album, "title" => "storms", "plays" => 0 }
}

// =============================================================================
// REACTIVE MAP BENCHMARKS
// =============================================================================

fn bench_map_set(c: &mut Criterion) {
    let map: ReactiveMap<i64, Value> = ReactiveMap::new();
    c.bench_function("map_set_snapshot", |b| {
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            map.set(black_box(i % 1000), track(i, i % 10));
        })
    });
}

fn bench_map_set_open(c: &mut Criterion) {
    let map: ReactiveMap<i64, Value, OpenMap<i64, Value>> = ReactiveMap::with_source(OpenMap::new());
    c.bench_function("map_set_open", |b| {
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            map.set(black_box(i % 1000), track(i, i % 10));
        })
    });
}

fn bench_map_set_with_observer(c: &mut Criterion) {
    let map: ReactiveMap<i64, Value> = ReactiveMap::new();
    let _sub = map.changes().subscribe_next(|event| {
        black_box(event);
    });
    c.bench_function("map_set_observed", |b| {
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            map.set(black_box(i % 1000), track(i, i % 10));
        })
    });
}

fn bench_map_get(c: &mut Criterion) {
    let map: ReactiveMap<i64, Value> = ReactiveMap::new();
    for i in 0..1000 {
        map.set(i, track(i, i % 10));
    }
    c.bench_function("map_get", |b| {
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            black_box(map.get(&(i % 1000)))
        })
    });
}

// =============================================================================
// CHANGE DETECTION BENCHMARKS
// =============================================================================

fn bench_detect_changes(c: &mut Criterion) {
    let previous = track(1, 10);
    let mut current = previous.clone();
    current.set_field("plays", 1);

    c.bench_function("detect_changes_update", |b| {
        b.iter(|| black_box(detect_changes(Some(&current), Some(&previous))))
    });

    c.bench_function("detect_changes_noop", |b| {
        b.iter(|| black_box(detect_changes(Some(&previous), Some(&previous))))
    });
}

// =============================================================================
// COLLECTION & RELATIONSHIP BENCHMARKS
// =============================================================================

fn bench_collection_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_upsert");
    for size in [100i64, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let col: EntityCollection<i64, Value> =
                EntityCollection::new(|v: &Value| v.get("id").and_then(Value::as_i64));
            let mut i = 0i64;
            b.iter(|| {
                i += 1;
                col.upsert_one(track(i % size, i % 10));
            })
        });
    }
    group.finish();
}

fn bench_relationship_maintenance(c: &mut Criterion) {
    let col: EntityCollection<i64, Value> =
        EntityCollection::new(|v: &Value| v.get("id").and_then(Value::as_i64));
    let index: OneToManyIndex<i64, Value, i64> =
        OneToManyIndex::new(&col, |v: &Value| v.get("album_id").and_then(Value::as_i64));

    c.bench_function("relationship_refile", |b| {
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            // Alternating owner forces a re-filing on every write.
            col.set_one(track(i % 100, i % 2));
        })
    });
    black_box(index);
}

criterion_group!(
    benches,
    bench_map_set,
    bench_map_set_open,
    bench_map_set_with_observer,
    bench_map_get,
    bench_detect_changes,
    bench_collection_upsert,
    bench_relationship_maintenance
);
criterion_main!(benches);
