/*
    Measures record throughput of a last value with 1000 series, reported
    cumulatively and collected once per second by a background thread.
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
    static ref STORAGE: SyncMetricStorage<f64> = SyncMetricStorage::builder(
        MetricDescriptor::new("temperature", "", "Cel"),
        Aggregator::last_value(ReservoirConfig::default()),
    )
    .build();
    static ref ATTRIBUTE_VALUES: [&'static str; 10] = [
        "value1", "value2", "value3", "value4", "value5", "value6", "value7", "value8", "value9",
        "value10"
    ];
}

thread_local! {
    /// Store random number generator for each thread
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_os_rng());
}

fn main() {
    thread::spawn(|| {
        while !throughput::stopped() {
            thread::sleep(Duration::from_secs(1));
            STORAGE.collect(&Resource::empty(), &InstrumentationScope::default());
        }
    });
    throughput::test_throughput(test_gauge);
}

fn test_gauge() {
    let len = ATTRIBUTE_VALUES.len();
    let (value, indices) = CURRENT_RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        (
            rng.random_range(0.0..100.0),
            [
                rng.random_range(0..len),
                rng.random_range(0..len),
                rng.random_range(0..len),
            ],
        )
    });

    // each attribute has 10 possible values, so there are 1000 possible combinations (time-series)
    STORAGE.record(
        value,
        &[
            KeyValue::new("attribute1", ATTRIBUTE_VALUES[indices[0]]),
            KeyValue::new("attribute2", ATTRIBUTE_VALUES[indices[1]]),
            KeyValue::new("attribute3", ATTRIBUTE_VALUES[indices[2]]),
        ],
        &Context::new(),
    );
}
