use crate::{
    data::{AggregatedData, DataPoint, Gauge},
    exemplar::ReservoirConfig,
};

use super::{handle::HandleKind, Accumulation, AggregatorHandle, Marker, Number};

/// Summarizes a set of measurements as the last one made.
///
/// There is no cumulative arithmetic for last values: both
/// [`merge`](super::Aggregator::merge) and [`diff`](super::Aggregator::diff)
/// yield the most recent accumulation.
#[derive(Debug, Clone)]
pub struct LastValueAggregator<T> {
    reservoir: ReservoirConfig,
    _marker: Marker<T>,
}

impl<T: Number> LastValueAggregator<T> {
    pub(crate) fn new(reservoir: ReservoirConfig) -> Self {
        LastValueAggregator {
            reservoir,
            _marker: Marker::default(),
        }
    }

    pub(crate) fn create_handle(&self) -> AggregatorHandle<T> {
        AggregatorHandle::new(HandleKind::LastValue, self.reservoir.build())
    }

    pub(crate) fn merge(
        &self,
        _previous: &Accumulation<T>,
        current: &Accumulation<T>,
    ) -> Accumulation<T> {
        current.clone()
    }

    pub(crate) fn diff(
        &self,
        _previous: &Accumulation<T>,
        current: &Accumulation<T>,
    ) -> Accumulation<T> {
        current.clone()
    }

    pub(crate) fn to_data(&self, data_points: Vec<DataPoint<T>>) -> AggregatedData<T> {
        Gauge { data_points }.into()
    }
}
