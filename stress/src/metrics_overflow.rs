/*
    Records into far more series than the cardinality limit allows, to check
    that memory and internal logging stay bounded once measurements land in
    the overflow series.
*/

use lazy_static::lazy_static;
use opentelemetry::{Context, InstrumentationScope, KeyValue};
use opentelemetry_aggregation::{
    aggregation::Aggregator, data::MetricDescriptor, exemplar::ReservoirConfig,
    storage::SyncMetricStorage, Resource,
};
use rand::{
    rngs::{self},
    Rng, SeedableRng,
};
use std::{cell::RefCell, thread, time::Duration};

mod throughput;

lazy_static! {
    static ref STORAGE: SyncMetricStorage<u64> = SyncMetricStorage::builder(
        MetricDescriptor::new("hello", "", ""),
        Aggregator::sum(true, ReservoirConfig::disabled()),
    )
    .build();
}

thread_local! {
    /// Store random number generator for each thread
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_os_rng());
}

fn main() {
    thread::spawn(|| {
        while !throughput::stopped() {
            thread::sleep(Duration::from_secs(1));
            let snapshot = STORAGE.collect(&Resource::empty(), &InstrumentationScope::default());
            println!("Series: {}", snapshot.data.data.data_points().len());
        }
    });
    throughput::test_throughput(test_sum);
}

fn test_sum() {
    let rand = CURRENT_RNG.with(|rng| rng.borrow_mut().random_range(0..100_000_000i64));
    STORAGE.record(1, &[KeyValue::new("A", rand)], &Context::new());
}
