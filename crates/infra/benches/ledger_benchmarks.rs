use std::sync::{Arc, Barrier};
use std::thread;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use brewery_catalog::{Beer, BeerId, Category, CategoryId};
use brewery_core::{ClientId, EntityId};
use brewery_infra::BreweryConfig;
use brewery_infra::services::BreweryServices;
use brewery_infra::workflows::LineRequest;

fn setup() -> (Arc<BreweryServices>, CategoryId) {
    let services = BreweryServices::in_memory(BreweryConfig {
        max_conflict_retries: 100_000,
        ..BreweryConfig::default()
    });
    let category_id = CategoryId::new(EntityId::new());
    services
        .catalog
        .insert_category(Category::new(category_id, "Bench").unwrap())
        .unwrap();
    (Arc::new(services), category_id)
}

fn add_beer(services: &BreweryServices, category_id: CategoryId, quantity: i64) -> BeerId {
    let beer_id = BeerId::new(EntityId::new());
    services
        .register_beer(
            Beer::new(beer_id, "Bench Lager", category_id, 250, None).unwrap(),
            quantity,
        )
        .unwrap();
    beer_id
}

fn bench_single_row_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_row_latency");
    group.sample_size(1000);

    group.bench_function("decrease_then_increase", |b| {
        let (services, category_id) = setup();
        let beer_id = add_beer(&services, category_id, 1_000);
        b.iter(|| {
            services.ledger.decrease(beer_id, black_box(3)).unwrap();
            services.ledger.increase(beer_id, black_box(3)).unwrap();
        });
    });

    group.bench_function("rejected_decrease", |b| {
        let (services, category_id) = setup();
        let beer_id = add_beer(&services, category_id, 1);
        b.iter(|| {
            let _ = services.ledger.decrease(beer_id, black_box(5));
        });
    });

    group.finish();
}

fn bench_order_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_placement");

    for line_count in [1usize, 5, 20].iter() {
        group.throughput(Throughput::Elements(*line_count as u64));
        group.bench_with_input(
            BenchmarkId::new("place_order", line_count),
            line_count,
            |b, &count| {
                let (services, category_id) = setup();
                let lines: Vec<LineRequest> = (0..count)
                    .map(|_| LineRequest::new(add_beer(&services, category_id, i64::MAX / 2), 1))
                    .collect();
                let client_id = ClientId::new();
                b.iter(|| {
                    services.orders.place(client_id, black_box(&lines)).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_contended_decreases(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_decreases");
    group.sample_size(20);

    for threads in [1usize, 2, 4, 8].iter() {
        let per_thread = 250;
        group.throughput(Throughput::Elements((threads * per_thread) as u64));
        group.bench_with_input(
            BenchmarkId::new("one_hot_row", threads),
            threads,
            |b, &threads| {
                b.iter(|| {
                    let (services, category_id) = setup();
                    let beer_id = add_beer(&services, category_id, (threads * per_thread) as i64);
                    let barrier = Arc::new(Barrier::new(threads));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let services = services.clone();
                            let barrier = barrier.clone();
                            thread::spawn(move || {
                                barrier.wait();
                                for _ in 0..per_thread {
                                    services.ledger.decrease(beer_id, 1).unwrap();
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_row_latency,
    bench_order_placement,
    bench_contended_decreases
);
criterion_main!(benches);
