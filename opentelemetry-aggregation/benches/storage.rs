/*
    Cost of recording through a storage, which includes building the
    attribute set and looking up the series.

    Run with:
    cargo bench --bench storage
*/

use std::cell::RefCell;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use opentelemetry::{Context, InstrumentationScope, KeyValue};
use opentelemetry_aggregation::{
    aggregation::Aggregator,
    data::{MetricDescriptor, Temporality},
    exemplar::ReservoirConfig,
    storage::{ObservableMetricStorage, SyncMetricStorage},
    Resource,
};
use rand::{
    rngs::{self},
    Rng, SeedableRng,
};

thread_local! {
    /// Store random number generator for each thread
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_os_rng());
}

static ATTRIBUTE_VALUES: [&str; 10] = [
    "value1", "value2", "value3", "value4", "value5", "value6", "value7", "value8", "value9",
    "value10",
];

fn sum_storage(temporality: Temporality, cardinality_limit: usize) -> SyncMetricStorage<u64> {
    SyncMetricStorage::builder(
        MetricDescriptor::new("requests", "", ""),
        Aggregator::sum(true, ReservoirConfig::disabled()),
    )
    .with_temporality(temporality)
    .with_cardinality_limit(cardinality_limit)
    .build()
}

fn random_attributes() -> [usize; 3] {
    CURRENT_RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        [
            rng.random_range(0..10),
            rng.random_range(0..10),
            rng.random_range(0..10),
        ]
    })
}

fn criterion_benchmark(c: &mut Criterion) {
    record_sorted(c);
    record_unsorted(c);
    record_overflow(c);
    collect(c);
    observe_and_collect(c);
}

fn record_sorted(c: &mut Criterion) {
    let storage = sum_storage(Temporality::Cumulative, 2000);
    let cx = Context::new();
    c.bench_function("Storage_Record_Sorted", |b| {
        b.iter_batched(
            random_attributes,
            |rands| {
                // 10*10*10 = 1000 time series.
                storage.record(
                    1,
                    &[
                        KeyValue::new("attribute1", ATTRIBUTE_VALUES[rands[0]]),
                        KeyValue::new("attribute2", ATTRIBUTE_VALUES[rands[1]]),
                        KeyValue::new("attribute3", ATTRIBUTE_VALUES[rands[2]]),
                    ],
                    &cx,
                );
            },
            BatchSize::SmallInput,
        );
    });
}

fn record_unsorted(c: &mut Criterion) {
    let storage = sum_storage(Temporality::Cumulative, 2000);
    let cx = Context::new();
    c.bench_function("Storage_Record_Unsorted", |b| {
        b.iter_batched(
            random_attributes,
            |rands| {
                storage.record(
                    1,
                    &[
                        KeyValue::new("attribute3", ATTRIBUTE_VALUES[rands[2]]),
                        KeyValue::new("attribute1", ATTRIBUTE_VALUES[rands[0]]),
                        KeyValue::new("attribute2", ATTRIBUTE_VALUES[rands[1]]),
                    ],
                    &cx,
                );
            },
            BatchSize::SmallInput,
        );
    });
}

fn record_overflow(c: &mut Criterion) {
    let storage = sum_storage(Temporality::Cumulative, 100);
    let cx = Context::new();
    for i in 0..200i64 {
        storage.record(1, &[KeyValue::new("key", i)], &cx);
    }

    c.bench_function("Storage_Record_Overflow", |b| {
        b.iter(|| storage.record(1, &[KeyValue::new("key", 500i64)], &cx));
    });
}

fn collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("Storage_Collect");
    let cx = Context::new();
    for temporality in [Temporality::Cumulative, Temporality::Delta] {
        let storage = sum_storage(temporality, 2000);
        group.bench_function(temporality.to_string(), |b| {
            b.iter_batched(
                || {
                    for i in 0..1000i64 {
                        storage.record(1, &[KeyValue::new("key", i)], &cx);
                    }
                },
                |_| storage.collect(&Resource::empty(), &InstrumentationScope::default()),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn observe_and_collect(c: &mut Criterion) {
    let storage = ObservableMetricStorage::builder(
        MetricDescriptor::new("cpu.time", "", "s"),
        Aggregator::<f64>::sum(true, ReservoirConfig::disabled()),
    )
    .with_temporality(Temporality::Delta)
    .build();
    let mut reading = 0.0;

    c.bench_function("Observable_Observe_Collect_100", |b| {
        b.iter(|| {
            reading += 1.0;
            for i in 0..100i64 {
                storage.observe(reading, &[KeyValue::new("cpu", i)]);
            }
            storage.collect(&Resource::empty(), &InstrumentationScope::default())
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
