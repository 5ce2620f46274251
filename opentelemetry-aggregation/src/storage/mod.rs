//! Per instrument registries that own the handles of every series and turn
//! them into [`Snapshot`](crate::aggregation::Snapshot)s.
//!
//! [`SyncMetricStorage`] backs synchronous instruments, where measurements
//! are recorded as they happen. [`ObservableMetricStorage`] backs
//! asynchronous instruments, where a callback reports one cumulative
//! observation per series and collection cycle.
use std::{marker::PhantomData, sync::OnceLock, time::SystemTime};

use opentelemetry::KeyValue;

use crate::{
    aggregation::{Aggregator, CollectionTimes},
    data::{MetricDescriptor, Temporality},
    AttributeSet,
};

mod observable;
mod sync;

pub use observable::ObservableMetricStorage;
pub use sync::SyncMetricStorage;

/// The default maximum number of series per storage, the overflow series
/// included.
pub const DEFAULT_CARDINALITY_LIMIT: usize = 2000;

static STREAM_OVERFLOW_ATTRIBUTES: OnceLock<AttributeSet> = OnceLock::new();

/// The series measurements are redirected to once the cardinality limit is
/// reached.
pub fn overflow_attributes() -> &'static AttributeSet {
    STREAM_OVERFLOW_ATTRIBUTES
        .get_or_init(|| AttributeSet::from([KeyValue::new("otel.metric.overflow", true)]))
}

/// Configures a [`SyncMetricStorage`] or an [`ObservableMetricStorage`].
#[derive(Debug)]
pub struct StorageBuilder<T, S> {
    descriptor: MetricDescriptor,
    aggregator: Aggregator<T>,
    temporality: Temporality,
    cardinality_limit: usize,
    _storage: PhantomData<fn() -> S>,
}

impl<T, S> StorageBuilder<T, S> {
    fn new(descriptor: MetricDescriptor, aggregator: Aggregator<T>) -> Self {
        StorageBuilder {
            descriptor,
            aggregator,
            temporality: Temporality::default(),
            cardinality_limit: DEFAULT_CARDINALITY_LIMIT,
            _storage: PhantomData,
        }
    }

    /// Sets the temporality of the exported data, cumulative by default.
    pub fn with_temporality(mut self, temporality: Temporality) -> Self {
        self.temporality = temporality;
        self
    }

    /// Sets the maximum number of series, the overflow series included.
    ///
    /// Limits below 2 leave room for the overflow series only.
    pub fn with_cardinality_limit(mut self, limit: usize) -> Self {
        self.cardinality_limit = limit;
        self
    }
}

/// Collection bookkeeping shared by both storages.
#[derive(Debug, Clone, Copy)]
struct CycleClock {
    start: SystemTime,
    last_collection: SystemTime,
}

impl CycleClock {
    fn new() -> Self {
        let start = opentelemetry::time::now();
        CycleClock {
            start,
            last_collection: start,
        }
    }

    /// Timestamps for a collection happening now. The next cycle starts
    /// where this one ends.
    fn advance(&mut self) -> CollectionTimes {
        let times = CollectionTimes {
            start: self.start,
            last_collection: self.last_collection,
            now: opentelemetry::time::now(),
        };
        self.last_collection = times.now;
        times
    }
}

/// Whether a storage holding `series` distinct series, none of them the
/// overflow series, can accept one more.
fn has_room(series: usize, cardinality_limit: usize) -> bool {
    series < cardinality_limit.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use opentelemetry::KeyValue;

    use super::{has_room, overflow_attributes, CycleClock};

    #[test]
    fn overflow_series_is_flagged() {
        assert_eq!(
            overflow_attributes().as_slice(),
            &[KeyValue::new("otel.metric.overflow", true)]
        );
    }

    #[test]
    fn one_slot_is_kept_for_overflow() {
        assert!(has_room(0, 3));
        assert!(has_room(1, 3));
        assert!(!has_room(2, 3));
        assert!(!has_room(0, 1));
        assert!(!has_room(0, 0));
    }

    #[test]
    fn clock_chains_cycles() {
        let mut clock = CycleClock::new();
        let first = clock.advance();
        assert_eq!(first.last_collection, first.start);

        thread::sleep(Duration::from_millis(2));
        let second = clock.advance();
        assert_eq!(second.start, first.start);
        assert_eq!(second.last_collection, first.now);
        assert!(second.now >= first.now);
    }
}
