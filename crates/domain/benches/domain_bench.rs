//! Benchmarks for product allocation.

use chrono::NaiveDate;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use domain::{Batch, OrderLine, Product};

fn product_with_batches(count: u32) -> Product {
    let mut product = Product::new("BENCH-SKU");
    for i in 0..count {
        let eta = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .checked_add_days(chrono::Days::new(u64::from(i)));
        product.add_batch(Batch::new(format!("batch-{i:05}"), "BENCH-SKU", 100, eta));
    }
    product
}

fn bench_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate");

    for batch_count in [10u32, 100, 1000] {
        group.bench_function(format!("{batch_count}_batches"), |b| {
            b.iter_batched(
                || product_with_batches(batch_count),
                |mut product| {
                    let line = OrderLine::new("order-1", "BENCH-SKU", 10);
                    black_box(product.allocate(line));
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_change_batch_quantity(c: &mut Criterion) {
    c.bench_function("change_batch_quantity_cascade", |b| {
        b.iter_batched(
            || {
                let mut product = Product::new("BENCH-SKU");
                product.add_batch(Batch::new("batch-00000", "BENCH-SKU", 1000, None));
                for i in 0..100 {
                    product.allocate(OrderLine::new(format!("order-{i}"), "BENCH-SKU", 10));
                }
                product.take_events();
                product
            },
            |mut product| {
                product
                    .change_batch_quantity(&"batch-00000".into(), 0)
                    .unwrap();
                black_box(product.take_events());
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_allocate, bench_change_batch_quantity);
criterion_main!(benches);
