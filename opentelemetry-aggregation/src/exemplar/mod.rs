//! Exemplar sampling.
//!
//! Every [`AggregatorHandle`](crate::aggregation::AggregatorHandle) owns one
//! [`ExemplarReservoir`]. Measurements accepted by the configured
//! [`ExemplarFilter`] are offered to it on the record path, and the retained
//! exemplars are drained on every collection. Unlike the aggregated value,
//! exemplars never survive a collection cycle.
use opentelemetry::{Context, KeyValue};

use crate::{aggregation::Number, data::Exemplar, AttributeSet};

mod filter;
mod fixed_size;

pub use filter::ExemplarFilter;
pub use fixed_size::FixedSizeReservoir;

/// Configures the reservoir created for every new series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservoirConfig {
    filter: ExemplarFilter,
    size: usize,
}

impl Default for ReservoirConfig {
    /// Filter from `OTEL_METRICS_EXEMPLAR_FILTER`, one cell per CPU.
    fn default() -> Self {
        ReservoirConfig {
            filter: ExemplarFilter::from_env(),
            size: num_cpus::get(),
        }
    }
}

impl ReservoirConfig {
    /// A configuration that never samples.
    pub fn disabled() -> Self {
        ReservoirConfig {
            filter: ExemplarFilter::AlwaysOff,
            size: 0,
        }
    }

    /// Sets the filter deciding which measurements are offered.
    ///
    /// This option overrides any value set for the `OTEL_METRICS_EXEMPLAR_FILTER`
    /// environment variable.
    pub fn with_filter(mut self, filter: ExemplarFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the maximum number of exemplars kept per series and cycle.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// The configured filter.
    pub fn filter(&self) -> ExemplarFilter {
        self.filter
    }

    /// The configured capacity.
    pub fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn build<T: Number>(&self) -> ExemplarReservoir<T> {
        if self.filter == ExemplarFilter::AlwaysOff || self.size == 0 {
            ExemplarReservoir::NoSamples
        } else {
            ExemplarReservoir::FixedSize(FixedSizeReservoir::new(self.filter, self.size))
        }
    }
}

/// Samples and stores representative measurements of one series.
#[derive(Debug)]
pub enum ExemplarReservoir<T> {
    /// Retains nothing.
    NoSamples,
    /// Retains up to a fixed number of filtered measurements.
    FixedSize(FixedSizeReservoir<T>),
}

impl<T: Number> ExemplarReservoir<T> {
    /// Offers a measurement, the reservoir decides whether to keep it.
    pub fn offer(&self, value: T, attributes: &[KeyValue], cx: &Context) {
        match self {
            ExemplarReservoir::NoSamples => {}
            ExemplarReservoir::FixedSize(reservoir) => reservoir.offer(value, attributes, cx),
        }
    }

    /// Returns the retained exemplars and empties the reservoir.
    ///
    /// Attributes of a measurement that are already part of
    /// `point_attributes` are removed from the exemplar.
    pub fn collect_and_reset(&self, point_attributes: &AttributeSet) -> Vec<Exemplar<T>> {
        match self {
            ExemplarReservoir::NoSamples => Vec::new(),
            ExemplarReservoir::FixedSize(reservoir) => {
                reservoir.collect_and_reset(point_attributes)
            }
        }
    }
}
