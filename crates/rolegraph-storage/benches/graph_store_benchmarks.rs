//! Graph store benchmarks.
//!
//! Measures the in-memory store to:
//! 1. Confirm name lookups stay O(1) as the graph grows
//! 2. Track the cost of insertion-ordered listing
//! 3. Catch performance regressions
//!
//! Run with: cargo bench -p rolegraph-storage

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use rolegraph_storage::memory::MemoryGraphStore;
use rolegraph_storage::traits::GraphStore;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Creates a store with N permissions, all assigned to a single "Admin" role.
async fn setup_store_with_permissions(n: usize) -> (Arc<MemoryGraphStore>, String) {
    let store = MemoryGraphStore::new_shared();
    let admin = store.create_role("Admin", None).await.unwrap();

    for i in 0..n {
        let permission = store
            .create_permission(&format!("permission_{i}"), None)
            .await
            .unwrap();
        store
            .create_assignment(&admin.id, &permission.id)
            .await
            .unwrap();
    }

    (store, admin.id)
}

/// Benchmark: Create a permission in a store with N existing permissions.
fn bench_create_permission(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("create_permission");
    group.sample_size(50);

    for n in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (store, _) = rt.block_on(setup_store_with_permissions(n));
            let mut counter = n;

            b.iter(|| {
                counter += 1;
                let name = format!("new_permission_{counter}");
                rt.block_on(store.create_permission(&name, None)).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark: Case-insensitive name lookup in a store with N permissions.
fn bench_find_permission_by_name(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("find_permission_by_name");
    group.sample_size(100);

    for n in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (store, _) = rt.block_on(setup_store_with_permissions(n));
            let mut rng = rand::thread_rng();

            b.iter(|| {
                let idx = rng.gen_range(0..n);
                let name = format!("PERMISSION_{idx}");
                let found = rt
                    .block_on(store.find_permission_by_name(black_box(&name)))
                    .unwrap();
                black_box(found);
            });
        });
    }
    group.finish();
}

/// Benchmark: List all permissions in insertion order.
fn bench_list_permissions(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("list_permissions");
    group.sample_size(50);

    for n in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (store, _) = rt.block_on(setup_store_with_permissions(n));

            b.iter(|| {
                let result = rt.block_on(store.list_permissions()).unwrap();
                black_box(result);
            });
        });
    }
    group.finish();
}

/// Benchmark: List the assignments of a role holding N permissions.
fn bench_list_assignments_for_role(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("list_assignments_for_role");
    group.sample_size(50);

    for n in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (store, admin_id) = rt.block_on(setup_store_with_permissions(n));

            b.iter(|| {
                let result = rt
                    .block_on(store.list_assignments_for_role(black_box(&admin_id)))
                    .unwrap();
                black_box(result);
            });
        });
    }
    group.finish();
}

/// Benchmark: Concurrent creates of distinct roles.
fn bench_concurrent_role_creates(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("concurrent_role_creates");
    group.sample_size(20);

    for concurrency in [8, 64] {
        group.throughput(Throughput::Elements(concurrency as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                let store = MemoryGraphStore::new_shared();
                let mut round = 0usize;

                b.iter(|| {
                    round += 1;
                    let futures = (0..concurrency).map(|i| {
                        let store = Arc::clone(&store);
                        let name = format!("role_{round}_{i}");
                        async move { store.create_role(&name, None).await }
                    });
                    let results = rt.block_on(futures::future::join_all(futures));
                    black_box(results);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_create_permission,
    bench_find_permission_by_name,
    bench_list_permissions,
    bench_list_assignments_for_role,
    bench_concurrent_role_creates,
);

criterion_main!(benches);
