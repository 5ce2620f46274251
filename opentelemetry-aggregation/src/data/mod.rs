//! Types for delivery of aggregated metric time series data.

use std::{borrow::Cow, time::SystemTime};

use opentelemetry::{InstrumentationScope, KeyValue};

use crate::Resource;

mod temporality;

pub use temporality::Temporality;

/// Identifies the instrument a metric stream was produced from.
///
/// The descriptor is owned by the instrument layer and passed through to the
/// exported data unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MetricDescriptor {
    /// The name of the instrument that created this data.
    pub name: Cow<'static, str>,
    /// The description of the instrument, which can be used in documentation.
    pub description: Cow<'static, str>,
    /// The unit in which the instrument reports.
    pub unit: Cow<'static, str>,
}

impl MetricDescriptor {
    /// Create a new descriptor.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
    ) -> Self {
        MetricDescriptor {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
        }
    }
}

/// One aggregated metric stream, together with the identity of the entity,
/// scope and instrument that produced it.
#[derive(Debug, Clone)]
pub struct MetricData<T> {
    /// The entity that collected the metrics.
    pub resource: Resource,
    /// The [InstrumentationScope] that the instrument was created with.
    pub scope: InstrumentationScope,
    /// The instrument that created this data.
    pub descriptor: MetricDescriptor,
    /// The aggregated data from the instrument.
    pub data: AggregatedData<T>,
}

/// Aggregated data of a metric stream, shaped by the aggregation strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatedData<T> {
    /// Data produced by a last-value aggregation.
    Gauge(Gauge<T>),
    /// Data produced by a sum aggregation.
    Sum(Sum<T>),
}

impl<T> AggregatedData<T> {
    /// The data points of the stream, regardless of its shape.
    pub fn data_points(&self) -> &[DataPoint<T>] {
        match self {
            AggregatedData::Gauge(gauge) => &gauge.data_points,
            AggregatedData::Sum(sum) => &sum.data_points,
        }
    }
}

impl<T> From<Gauge<T>> for AggregatedData<T> {
    fn from(value: Gauge<T>) -> Self {
        AggregatedData::Gauge(value)
    }
}

impl<T> From<Sum<T>> for AggregatedData<T> {
    fn from(value: Sum<T>) -> Self {
        AggregatedData::Sum(value)
    }
}

/// DataPoint is a single data point in a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint<T> {
    /// Attributes is the set of key value pairs that uniquely identify the
    /// time series.
    pub attributes: Vec<KeyValue>,
    /// The time when the time series was started.
    pub start_time: SystemTime,
    /// The time when the time series was recorded.
    pub time: SystemTime,
    /// The value of this data point.
    pub value: T,
    /// The sampled [Exemplar]s collected during the time series.
    pub exemplars: Vec<Exemplar<T>>,
}

/// A measurement of the current value of an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge<T> {
    /// Represents individual aggregated measurements with unique attributes.
    pub data_points: Vec<DataPoint<T>>,
}

/// Represents the sum of all measurements of values from an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Sum<T> {
    /// Represents individual aggregated measurements with unique attributes.
    pub data_points: Vec<DataPoint<T>>,
    /// Describes if the aggregation is reported as the change from the last report
    /// time, or the cumulative changes since a fixed start time.
    pub temporality: Temporality,
    /// Whether this aggregation only increases or decreases.
    pub is_monotonic: bool,
}

/// A measurement sampled from a time series providing a typical example.
#[derive(Debug, Clone, PartialEq)]
pub struct Exemplar<T> {
    /// The attributes recorded with the measurement but filtered out of the
    /// time series' aggregated data.
    pub filtered_attributes: Vec<KeyValue>,
    /// The time when the measurement was recorded.
    pub time: SystemTime,
    /// The measured value.
    pub value: T,
    /// The ID of the span that was active during the measurement.
    ///
    /// If no span was active or the span was not sampled this will be empty.
    pub span_id: [u8; 8],
    /// The ID of the trace the active span belonged to during the measurement.
    ///
    /// If no span was active or the span was not sampled this will be empty.
    pub trace_id: [u8; 16],
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use opentelemetry::KeyValue;

    use super::{AggregatedData, DataPoint, Exemplar, Gauge, MetricDescriptor, Sum, Temporality};

    fn point(value: u64) -> DataPoint<u64> {
        let now = SystemTime::now();
        DataPoint {
            attributes: vec![KeyValue::new("key", "value")],
            start_time: now,
            time: now,
            value,
            exemplars: vec![Exemplar {
                filtered_attributes: vec![],
                time: now,
                value,
                span_id: [0; 8],
                trace_id: [0; 16],
            }],
        }
    }

    #[test]
    fn validate_cloning_data_points() {
        let data_point = point(0);
        assert_eq!(data_point.clone(), data_point);
    }

    #[test]
    fn data_points_of_either_shape() {
        let gauge: AggregatedData<u64> = Gauge {
            data_points: vec![point(1)],
        }
        .into();
        let sum: AggregatedData<u64> = Sum {
            data_points: vec![point(2), point(3)],
            temporality: Temporality::Delta,
            is_monotonic: true,
        }
        .into();

        assert_eq!(gauge.data_points().len(), 1);
        assert_eq!(sum.data_points()[1].value, 3);
    }

    #[test]
    fn descriptor_from_static_and_owned_strings() {
        let descriptor = MetricDescriptor::new("name", String::from("description"), "unit");
        assert_eq!(descriptor.name, "name");
        assert_eq!(descriptor.description, "description");
        assert_eq!(descriptor.unit, "unit");
    }
}
