use std::{
    collections::HashMap,
    mem,
    sync::{Mutex, MutexGuard, PoisonError},
};

use opentelemetry::{otel_warn, Context, InstrumentationScope, KeyValue};

use crate::{
    aggregation::{Accumulation, Aggregator, AggregatorHandle, Number, Snapshot},
    data::{MetricDescriptor, Temporality},
    AttributeSet, Resource,
};

use super::{has_room, overflow_attributes, CycleClock, StorageBuilder};

/// What is known about the previous cycle when computing deltas.
#[derive(Debug)]
enum PriorCumulative<T> {
    NoPriorCumulative,
    HasPriorCumulative(HashMap<AttributeSet, Accumulation<T>>),
}

impl<T> PriorCumulative<T> {
    fn as_map(&self) -> Option<&HashMap<AttributeSet, Accumulation<T>>> {
        match self {
            PriorCumulative::NoPriorCumulative => None,
            PriorCumulative::HasPriorCumulative(map) => Some(map),
        }
    }
}

#[derive(Debug)]
struct CollectionState<T> {
    clock: CycleClock,
    prior: PriorCumulative<T>,
}

/// Storage for an asynchronous instrument.
///
/// Observations are cumulative readings taken by a callback, at most one per
/// attribute set and cycle. With [`Temporality::Delta`] each reading is
/// reported as the change from the reading of the previous cycle.
#[derive(Debug)]
pub struct ObservableMetricStorage<T> {
    descriptor: MetricDescriptor,
    aggregator: Aggregator<T>,
    temporality: Temporality,
    cardinality_limit: usize,
    observations: Mutex<HashMap<AttributeSet, AggregatorHandle<T>>>,
    state: Mutex<CollectionState<T>>,
}

impl<T: Number> ObservableMetricStorage<T> {
    /// Starts configuring a storage for the instrument `descriptor`.
    pub fn builder(
        descriptor: MetricDescriptor,
        aggregator: Aggregator<T>,
    ) -> StorageBuilder<T, ObservableMetricStorage<T>> {
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

    /// Records the current reading of the series identified by `attributes`.
    ///
    /// A second reading of the same series before the next collection is
    /// dropped.
    pub fn observe(&self, value: T, attributes: &[KeyValue]) {
        let key = AttributeSet::from(attributes);
        let cx = Context::current();
        let mut observations = self.observations();

        if observations.contains_key(&key) {
            otel_warn!(
                name: "DuplicateObservation",
                instrument = self.descriptor.name.to_string(),
                attributes = key.to_string(),
                message = "Only the first observation of an attribute set per collection is kept"
            );
            return;
        }

        if has_room(observations.len(), self.cardinality_limit) {
            let handle = self.aggregator.create_handle();
            handle.record(value, attributes, &cx);
            observations.insert(key, handle);
        } else {
            let overflow = observations
                .entry(overflow_attributes().clone())
                .or_insert_with(|| {
                    otel_warn!(
                        name: "CardinalityLimitReached",
                        instrument = self.descriptor.name.to_string(),
                        cardinality_limit = self.cardinality_limit,
                        message = "Observations are aggregated into the otel.metric.overflow series"
                    );
                    self.aggregator.create_handle()
                });
            overflow.record(value, attributes, &cx);
        }
    }

    /// Collects the observations made since the previous collection into a
    /// [`Snapshot`].
    pub fn collect(&self, resource: &Resource, scope: &InstrumentationScope) -> Snapshot<T> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let observations = mem::take(&mut *self.observations());

        let current: HashMap<AttributeSet, Accumulation<T>> = observations
            .into_iter()
            .filter_map(|(attributes, handle)| {
                handle
                    .accumulate_then_maybe_reset(&attributes, true)
                    .map(|acc| (attributes, acc))
            })
            .collect();
        let next_prior = current
            .iter()
            .map(|(attributes, acc)| (attributes.clone(), acc.without_exemplars()))
            .collect();

        let times = state.clock.advance();
        let snapshot = self.aggregator.to_metric_data(
            resource,
            scope,
            &self.descriptor,
            current,
            state.prior.as_map(),
            self.temporality,
            times,
        );
        state.prior = PriorCumulative::HasPriorCumulative(next_prior);
        snapshot
    }

    fn observations(&self) -> MutexGuard<'_, HashMap<AttributeSet, AggregatorHandle<T>>> {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Number> StorageBuilder<T, ObservableMetricStorage<T>> {
    /// Creates the storage.
    pub fn build(self) -> ObservableMetricStorage<T> {
        ObservableMetricStorage {
            descriptor: self.descriptor,
            aggregator: self.aggregator,
            temporality: self.temporality,
            cardinality_limit: self.cardinality_limit,
            observations: Mutex::new(HashMap::new()),
            state: Mutex::new(CollectionState {
                clock: CycleClock::new(),
                prior: PriorCumulative::NoPriorCumulative,
            }),
        }
    }
}
