use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use opentelemetry::{otel_debug, otel_warn, Context, InstrumentationScope, KeyValue};

use crate::{
    aggregation::{Accumulation, Aggregator, AggregatorHandle, Number, Snapshot},
    data::{MetricDescriptor, Temporality},
    AttributeSet, Resource,
};

use super::{has_room, overflow_attributes, CycleClock, StorageBuilder};

type Handles<T> = HashMap<AttributeSet, Arc<AggregatorHandle<T>>>;

/// Series state carried from one collection to the next.
#[derive(Debug)]
struct CollectionState<T> {
    clock: CycleClock,
    /// Cumulative values of strategies that reset their handles on every
    /// collection, kept so cumulative output does not lose idle series.
    retained: HashMap<AttributeSet, Accumulation<T>>,
}

/// Storage for a synchronous instrument.
///
/// Every distinct attribute set gets its own [`AggregatorHandle`], created on
/// its first measurement. Lookups take a shared lock; only the first
/// measurement of a new series takes the exclusive one.
#[derive(Debug)]
pub struct SyncMetricStorage<T> {
    descriptor: MetricDescriptor,
    aggregator: Aggregator<T>,
    temporality: Temporality,
    cardinality_limit: usize,
    handles: RwLock<Handles<T>>,
    state: Mutex<CollectionState<T>>,
}

impl<T: Number> SyncMetricStorage<T> {
    /// Starts configuring a storage for the instrument `descriptor`.
    pub fn builder(
        descriptor: MetricDescriptor,
        aggregator: Aggregator<T>,
    ) -> StorageBuilder<T, SyncMetricStorage<T>> {
        StorageBuilder::new(descriptor, aggregator)
    }

    /// The instrument this storage aggregates.
    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    /// The temporality of the exported data.
    pub fn temporality(&self) -> Temporality {
        self.temporality
    }

    /// Records a measurement into the series identified by `attributes`.
    pub fn record(&self, value: T, attributes: &[KeyValue], cx: &Context) {
        let key = AttributeSet::from(attributes);

        // The handle is updated while the lock is held so a collection can
        // never evict it in between.
        let handles = self.read();
        if let Some(handle) = handles.get(&key) {
            handle.record(value, attributes, cx);
            return;
        }
        drop(handles);

        let mut handles = self.write();
        // Another thread may have inserted the series in the meantime
        if let Some(handle) = handles.get(&key) {
            handle.record(value, attributes, cx);
        } else if has_room(self.series_count(&handles), self.cardinality_limit) {
            let handle = Arc::new(self.aggregator.create_handle());
            handle.record(value, attributes, cx);
            handles.insert(key, handle);
        } else if let Some(handle) = handles.get(overflow_attributes()) {
            handle.record(value, attributes, cx);
        } else {
            otel_warn!(
                name: "CardinalityLimitReached",
                instrument = self.descriptor.name.to_string(),
                cardinality_limit = self.cardinality_limit,
                message = "Measurements are aggregated into the otel.metric.overflow series"
            );
            let handle = Arc::new(self.aggregator.create_handle());
            handle.record(value, attributes, cx);
            handles.insert(overflow_attributes().clone(), handle);
        }
    }

    /// Collects every series into a [`Snapshot`].
    ///
    /// Sums are only reset with [`Temporality::Delta`], last values are reset
    /// on every collection. With [`Temporality::Delta`] series that had
    /// nothing to report are evicted. Cumulative storages keep every handle,
    /// so the retained series never outnumber the cardinality limit.
    pub fn collect(&self, resource: &Resource, scope: &InstrumentationScope) -> Snapshot<T> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let reset = self.aggregator.resets_on_collect(self.temporality);

        let accumulations = if !reset {
            self.collect_in_place(false)
        } else if self.temporality == Temporality::Cumulative {
            let current = self.collect_in_place(true);
            self.merge_into_retained(&mut state.retained, current)
        } else {
            self.collect_and_evict()
        };

        let times = state.clock.advance();
        self.aggregator.to_metric_data(
            resource,
            scope,
            &self.descriptor,
            accumulations,
            None,
            self.temporality,
            times,
        )
    }

    fn collect_in_place(&self, reset: bool) -> HashMap<AttributeSet, Accumulation<T>> {
        self.read()
            .iter()
            .filter_map(|(attributes, handle)| {
                handle
                    .accumulate_then_maybe_reset(attributes, reset)
                    .map(|acc| (attributes.clone(), acc))
            })
            .collect()
    }

    fn collect_and_evict(&self) -> HashMap<AttributeSet, Accumulation<T>> {
        let mut handles = self.write();
        let mut accumulations = HashMap::with_capacity(handles.len());
        let before = handles.len();

        handles.retain(|attributes, handle| {
            match handle.accumulate_then_maybe_reset(attributes, true) {
                Some(acc) => {
                    accumulations.insert(attributes.clone(), acc);
                    true
                }
                None => false,
            }
        });

        let evicted = before - handles.len();
        if evicted > 0 {
            otel_debug!(
                name: "SeriesEvicted",
                instrument = self.descriptor.name.to_string(),
                count = evicted
            );
        }
        accumulations
    }

    /// Folds the values of this cycle into the retained cumulative state and
    /// returns every retained series. Only series active in this cycle carry
    /// exemplars.
    fn merge_into_retained(
        &self,
        retained: &mut HashMap<AttributeSet, Accumulation<T>>,
        accumulations: HashMap<AttributeSet, Accumulation<T>>,
    ) -> HashMap<AttributeSet, Accumulation<T>> {
        let mut output = HashMap::with_capacity(retained.len().max(accumulations.len()));
        for (attributes, current) in accumulations {
            let merged = match retained.get(&attributes) {
                Some(previous) => self.aggregator.merge(previous, &current),
                None => current,
            };
            retained.insert(attributes.clone(), merged.without_exemplars());
            output.insert(attributes, merged);
        }

        for (attributes, previous) in retained.iter() {
            if !output.contains_key(attributes) {
                output.insert(attributes.clone(), previous.clone());
            }
        }
        output
    }

    fn series_count(&self, handles: &Handles<T>) -> usize {
        if handles.contains_key(overflow_attributes()) {
            handles.len() - 1
        } else {
            handles.len()
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Handles<T>> {
        self.handles.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Handles<T>> {
        self.handles.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Number> StorageBuilder<T, SyncMetricStorage<T>> {
    /// Creates the storage.
    pub fn build(self) -> SyncMetricStorage<T> {
        SyncMetricStorage {
            descriptor: self.descriptor,
            aggregator: self.aggregator,
            temporality: self.temporality,
            cardinality_limit: self.cardinality_limit,
            handles: RwLock::new(HashMap::new()),
            state: Mutex::new(CollectionState {
                clock: CycleClock::new(),
                retained: HashMap::new(),
            }),
        }
    }
}
