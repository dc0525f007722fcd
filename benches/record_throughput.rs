use std::io::Write;
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use riepilogo::config::AggregatorConfig;
use riepilogo::services::catalog::CatalogAggregator;
use riepilogo::services::Service;
use riepilogo::sink::FnSink;
use serde::Serialize;

const NUM_THREADS: usize = 8;
const ITERATIONS_PER_THREAD: usize = 100_000;
const PRODUCTS: [&str; 8] = [
    "OLJCESPC7Z",
    "66VCHSJNUP",
    "1YMWWN1N4O",
    "L9ECAV7KIM",
    "2ZYFJ3GM2N",
    "0PUK6V6EV0",
    "LS4PSXUNUM",
    "9SIQT8TOJO",
];

#[derive(Serialize)]
struct ProductView<'a> {
    source: &'static str,
    event_type: &'static str,
    product_id: &'a str,
}

/// Recording into a window versus serializing one log line per event.
fn bench_product_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("product_views");
    let label = format!("{}threads x {}iter", NUM_THREADS, ITERATIONS_PER_THREAD);

    for batch_size in [0u64, 1_000] {
        let name = if batch_size == 0 {
            "Aggregator (time only)"
        } else {
            "Aggregator (batch 1000)"
        };
        group.bench_function(BenchmarkId::new(name, &label), |b| {
            b.iter(|| {
                let config = CatalogAggregator::default_config();
                let config = if batch_size == 0 {
                    config
                } else {
                    config.with_batch_size(batch_size)
                };
                let views = Arc::new(build(config));
                let mut handles = vec![];

                for t in 0..NUM_THREADS {
                    let views = Arc::clone(&views);
                    handles.push(thread::spawn(move || {
                        for i in 0..ITERATIONS_PER_THREAD {
                            views.product_view(PRODUCTS[(t + i) % PRODUCTS.len()]);
                        }
                    }));
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(views.aggregator().stats().recorded)
            })
        });
    }

    group.bench_function(BenchmarkId::new("JSON line per event", &label), |b| {
        b.iter(|| {
            let mut handles = vec![];

            for t in 0..NUM_THREADS {
                handles.push(thread::spawn(move || {
                    let mut out = std::io::sink();
                    for i in 0..ITERATIONS_PER_THREAD {
                        let view = ProductView {
                            source: "catalog",
                            event_type: "product_view",
                            product_id: PRODUCTS[(t + i) % PRODUCTS.len()],
                        };
                        let line = serde_json::to_string(&view).unwrap();
                        writeln!(out, "{line}").unwrap();
                    }
                }));
            }

            for handle in handles {
                handle.join().unwrap();
            }
        })
    });

    group.finish();
}

fn build(config: AggregatorConfig) -> CatalogAggregator {
    let aggregator = CatalogAggregator::builder()
        .config(config)
        .sink(FnSink::new(|record| {
            black_box(record);
        }))
        .build()
        .unwrap();
    CatalogAggregator::from_aggregator(aggregator)
}

criterion_group!(benches, bench_product_views);
criterion_main!(benches);
