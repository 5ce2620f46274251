//! Aggregation strategies and the per series handles they create.
use core::fmt;
use std::{collections::HashMap, marker::PhantomData};

use opentelemetry::InstrumentationScope;

use crate::{
    data::{Exemplar, MetricData, MetricDescriptor, Temporality},
    error::MetricResult,
    exemplar::ReservoirConfig,
    AttributeSet, Resource,
};

mod assembly;
mod handle;
mod last_value;
mod sum;

pub use assembly::{CollectionTimes, Snapshot};
pub use handle::AggregatorHandle;
pub use last_value::LastValueAggregator;
pub use sum::SumAggregator;

/// The numeric types measurements can be aggregated as.
pub trait Number:
    PartialOrd
    + fmt::Debug
    + fmt::Display
    + Clone
    + Copy
    + PartialEq
    + Default
    + Send
    + Sync
    + 'static
{
    /// Adds two values, integers wrap around on overflow.
    fn add_wrapping(self, other: Self) -> Self;

    /// `self - previous`, or `None` if the result does not fit the type.
    fn checked_diff(self, previous: Self) -> Option<Self>;

    /// Returns `true` for values below zero.
    fn is_negative(self) -> bool;

    /// Returns `true` if the value is not a number.
    fn is_nan(self) -> bool;
}

impl Number for i64 {
    fn add_wrapping(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    fn checked_diff(self, previous: Self) -> Option<Self> {
        self.checked_sub(previous)
    }

    fn is_negative(self) -> bool {
        self < 0
    }

    fn is_nan(self) -> bool {
        false
    }
}

impl Number for u64 {
    fn add_wrapping(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    fn checked_diff(self, previous: Self) -> Option<Self> {
        self.checked_sub(previous)
    }

    fn is_negative(self) -> bool {
        false
    }

    fn is_nan(self) -> bool {
        false
    }
}

impl Number for f64 {
    fn add_wrapping(self, other: Self) -> Self {
        self + other
    }

    fn checked_diff(self, previous: Self) -> Option<Self> {
        Some(self - previous)
    }

    fn is_negative(self) -> bool {
        self < 0.0
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

/// An immutable snapshot of the value of one series at the time it was
/// extracted, together with the exemplars sampled during the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulation<T> {
    value: T,
    exemplars: Vec<Exemplar<T>>,
}

impl<T: Number> Accumulation<T> {
    /// Creates an accumulation.
    pub fn new(value: T, exemplars: Vec<Exemplar<T>>) -> Self {
        Accumulation { value, exemplars }
    }

    /// The accumulated value.
    pub fn value(&self) -> T {
        self.value
    }

    /// The exemplars sampled in the cycle that produced this accumulation.
    pub fn exemplars(&self) -> &[Exemplar<T>] {
        &self.exemplars
    }

    pub(crate) fn without_exemplars(&self) -> Self {
        Accumulation {
            value: self.value,
            exemplars: Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (T, Vec<Exemplar<T>>) {
        (self.value, self.exemplars)
    }
}

/// Defines how measurements of one metric stream combine and reset.
///
/// The set of strategies is closed. Each variant creates handles that
/// implement its update rule, and knows how to [merge](Aggregator::merge)
/// and [diff](Aggregator::diff) accumulations across collection cycles.
#[derive(Debug, Clone)]
pub enum Aggregator<T> {
    /// The arithmetic sum of all measurements.
    Sum(SumAggregator<T>),
    /// The last measurement made.
    LastValue(LastValueAggregator<T>),
}

impl<T: Number> Aggregator<T> {
    /// A sum aggregator. Monotonic sums reject negative measurements and
    /// report a decrease between two cumulative values as an error.
    pub fn sum(monotonic: bool, reservoir: ReservoirConfig) -> Self {
        Aggregator::Sum(SumAggregator::new(monotonic, reservoir))
    }

    /// A last-value aggregator.
    pub fn last_value(reservoir: ReservoirConfig) -> Self {
        Aggregator::LastValue(LastValueAggregator::new(reservoir))
    }

    /// Creates a handle for a new series, sharing no state with other
    /// handles.
    pub fn create_handle(&self) -> AggregatorHandle<T> {
        match self {
            Aggregator::Sum(sum) => sum.create_handle(),
            Aggregator::LastValue(last_value) => last_value.create_handle(),
        }
    }

    /// Combines the accumulation of an earlier cycle with one of a later
    /// cycle of the same series.
    pub fn merge(&self, previous: &Accumulation<T>, current: &Accumulation<T>) -> Accumulation<T> {
        match self {
            Aggregator::Sum(sum) => sum.merge(previous, current),
            Aggregator::LastValue(last_value) => last_value.merge(previous, current),
        }
    }

    /// Computes the change between two cumulative accumulations of the same
    /// series.
    pub fn diff(
        &self,
        previous: &Accumulation<T>,
        current: &Accumulation<T>,
    ) -> MetricResult<Accumulation<T>> {
        match self {
            Aggregator::Sum(sum) => sum.diff(previous, current),
            Aggregator::LastValue(last_value) => Ok(last_value.diff(previous, current)),
        }
    }

    /// Whether handles should be reset when collected for `temporality`.
    pub fn resets_on_collect(&self, temporality: Temporality) -> bool {
        match self {
            Aggregator::Sum(_) => temporality == Temporality::Delta,
            Aggregator::LastValue(_) => true,
        }
    }

    /// Assembles the exported metric from the accumulations of one cycle.
    ///
    /// With [`Temporality::Delta`] each accumulation is diffed against the
    /// matching entry of `previous`, series without one are reported as-is.
    /// Errors raised by the diff are returned on the [`Snapshot`], the
    /// affected point carries the raw current value.
    #[allow(clippy::too_many_arguments)]
    pub fn to_metric_data(
        &self,
        resource: &Resource,
        scope: &InstrumentationScope,
        descriptor: &MetricDescriptor,
        accumulations: HashMap<AttributeSet, Accumulation<T>>,
        previous: Option<&HashMap<AttributeSet, Accumulation<T>>>,
        temporality: Temporality,
        times: CollectionTimes,
    ) -> Snapshot<T> {
        let mut errors = Vec::new();
        let data_points =
            assembly::data_points(self, accumulations, previous, temporality, times, &mut errors);
        let data = match self {
            Aggregator::Sum(sum) => sum.to_data(data_points, temporality),
            Aggregator::LastValue(last_value) => last_value.to_data(data_points),
        };

        Snapshot {
            data: MetricData {
                resource: resource.clone(),
                scope: scope.clone(),
                descriptor: descriptor.clone(),
                data,
            },
            errors,
        }
    }
}

/// Shared by the strategies, keeps the number type in their signatures.
type Marker<T> = PhantomData<fn() -> T>;
