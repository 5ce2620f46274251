use std::{collections::HashMap, time::SystemTime};

use opentelemetry::otel_warn;

use crate::{
    data::{DataPoint, MetricData, Temporality},
    error::MetricError,
    AttributeSet,
};

use super::{Accumulation, Aggregator, Number};

/// Timestamps of one collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionTimes {
    /// When the storage started aggregating.
    pub start: SystemTime,
    /// When the previous collection completed, `start` for the first one.
    pub last_collection: SystemTime,
    /// When this collection happens.
    pub now: SystemTime,
}

impl CollectionTimes {
    /// The start time of points exported with `temporality`.
    pub fn point_start(&self, temporality: Temporality) -> SystemTime {
        match temporality {
            Temporality::Cumulative => self.start,
            Temporality::Delta => self.last_collection,
        }
    }
}

/// The result of one collection cycle.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    /// The exported metric.
    pub data: MetricData<T>,
    /// Integrity problems found while assembling `data`, by series. The
    /// affected points are still part of `data`.
    pub errors: Vec<(AttributeSet, MetricError)>,
}

impl<T> Snapshot<T> {
    /// Returns `true` if every series was assembled without problems.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub(super) fn data_points<T: Number>(
    aggregator: &Aggregator<T>,
    accumulations: HashMap<AttributeSet, Accumulation<T>>,
    previous: Option<&HashMap<AttributeSet, Accumulation<T>>>,
    temporality: Temporality,
    times: CollectionTimes,
    errors: &mut Vec<(AttributeSet, MetricError)>,
) -> Vec<DataPoint<T>> {
    let mut series: Vec<_> = accumulations.into_iter().collect();
    series.sort_unstable_by(|(a, _), (b, _)| a.canonical_cmp(b));

    let start_time = times.point_start(temporality);
    series
        .into_iter()
        .map(|(attributes, current)| {
            let prior = match temporality {
                Temporality::Delta => previous.and_then(|p| p.get(&attributes)),
                _ => None,
            };
            let exported = match prior.map(|prior| aggregator.diff(prior, &current)) {
                Some(Ok(delta)) => delta,
                Some(Err(err)) => {
                    otel_warn!(
                        name: "NegativeDelta",
                        attributes = attributes.to_string(),
                        error = err.to_string()
                    );
                    errors.push((attributes.clone(), err));
                    current
                }
                None => current,
            };

            let (value, exemplars) = exported.into_parts();
            DataPoint {
                attributes: attributes.into_vec(),
                start_time,
                time: times.now,
                value,
                exemplars,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        time::{Duration, SystemTime},
    };

    use opentelemetry::{InstrumentationScope, KeyValue};

    use super::CollectionTimes;
    use crate::{
        aggregation::{Accumulation, Aggregator},
        data::{AggregatedData, MetricDescriptor, Temporality},
        error::MetricError,
        exemplar::ReservoirConfig,
        AttributeSet, Resource,
    };

    fn times() -> CollectionTimes {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        CollectionTimes {
            start,
            last_collection: start + Duration::from_secs(10),
            now: start + Duration::from_secs(20),
        }
    }

    fn series<T: crate::aggregation::Number>(
        values: &[(&'static str, T)],
    ) -> HashMap<AttributeSet, Accumulation<T>> {
        values
            .iter()
            .map(|(route, value)| {
                (
                    AttributeSet::from([KeyValue::new("route", *route)]),
                    Accumulation::new(*value, Vec::new()),
                )
            })
            .collect()
    }

    fn descriptor() -> MetricDescriptor {
        MetricDescriptor::new("name", "description", "unit")
    }

    #[test]
    fn gauge_point_spans_from_start_to_now() {
        let resource = Resource::new([KeyValue::new("service.name", "svc")]);
        let scope = InstrumentationScope::builder("scope").with_version("1.0").build();
        let aggregator = Aggregator::<i64>::last_value(ReservoirConfig::disabled());

        let snapshot = aggregator.to_metric_data(
            &resource,
            &scope,
            &descriptor(),
            series(&[("/", 10)]),
            None,
            Temporality::Cumulative,
            times(),
        );

        assert!(snapshot.is_clean());
        assert_eq!(snapshot.data.resource, resource);
        assert_eq!(snapshot.data.scope, scope);
        assert_eq!(snapshot.data.descriptor, descriptor());
        let AggregatedData::Gauge(gauge) = snapshot.data.data else {
            panic!("expected a gauge");
        };
        assert_eq!(gauge.data_points.len(), 1);
        let point = &gauge.data_points[0];
        assert_eq!(point.value, 10);
        assert_eq!(point.start_time, times().start);
        assert_eq!(point.time, times().now);
        assert_eq!(point.attributes, vec![KeyValue::new("route", "/")]);
    }

    #[test]
    fn delta_points_start_at_last_collection() {
        let aggregator = Aggregator::<u64>::sum(true, ReservoirConfig::disabled());
        let snapshot = aggregator.to_metric_data(
            &Resource::empty(),
            &InstrumentationScope::default(),
            &descriptor(),
            series(&[("/", 1)]),
            None,
            Temporality::Delta,
            times(),
        );

        let point = &snapshot.data.data.data_points()[0];
        assert_eq!(point.start_time, times().last_collection);
        assert_eq!(point.time, times().now);
    }

    #[test]
    fn delta_reconstruction() {
        let aggregator = Aggregator::<u64>::sum(true, ReservoirConfig::disabled());
        let cumulative = [3u64, 10, 25];
        let mut previous: Option<HashMap<AttributeSet, Accumulation<u64>>> = None;
        let mut deltas = Vec::new();

        for total in cumulative {
            let current = series(&[("/", total)]);
            let snapshot = aggregator.to_metric_data(
                &Resource::empty(),
                &InstrumentationScope::default(),
                &descriptor(),
                current.clone(),
                previous.as_ref(),
                Temporality::Delta,
                times(),
            );
            assert!(snapshot.is_clean());
            deltas.push(snapshot.data.data.data_points()[0].value);
            previous = Some(current);
        }

        assert_eq!(deltas, vec![3, 7, 15]);
    }

    #[test]
    fn cumulative_ignores_previous_state() {
        let aggregator = Aggregator::<u64>::sum(true, ReservoirConfig::disabled());
        let previous = series(&[("/", 4)]);
        let snapshot = aggregator.to_metric_data(
            &Resource::empty(),
            &InstrumentationScope::default(),
            &descriptor(),
            series(&[("/", 9)]),
            Some(&previous),
            Temporality::Cumulative,
            times(),
        );
        assert_eq!(snapshot.data.data.data_points()[0].value, 9);
    }

    #[test]
    fn negative_delta_is_isolated_to_its_series() {
        let aggregator = Aggregator::<u64>::sum(true, ReservoirConfig::disabled());
        let previous = series(&[("/a", 10), ("/b", 1)]);
        let snapshot = aggregator.to_metric_data(
            &Resource::empty(),
            &InstrumentationScope::default(),
            &descriptor(),
            series(&[("/a", 4), ("/b", 6), ("/c", 2)]),
            Some(&previous),
            Temporality::Delta,
            times(),
        );

        let values: Vec<u64> = snapshot
            .data
            .data
            .data_points()
            .iter()
            .map(|p| p.value)
            .collect();
        // reset series reports its raw value, new series is a first observation
        assert_eq!(values, vec![4, 5, 2]);
        assert_eq!(
            snapshot.errors,
            vec![(
                AttributeSet::from([KeyValue::new("route", "/a")]),
                MetricError::NegativeDelta {
                    previous: "10".into(),
                    current: "4".into(),
                }
            )]
        );
    }

    #[test]
    fn output_order_is_stable() {
        let aggregator = Aggregator::<f64>::last_value(ReservoirConfig::disabled());
        let assemble = || {
            aggregator
                .to_metric_data(
                    &Resource::empty(),
                    &InstrumentationScope::default(),
                    &descriptor(),
                    series(&[("/z", 1.0), ("/a", 2.0), ("/m", 3.0)]),
                    None,
                    Temporality::Delta,
                    times(),
                )
                .data
                .data
        };

        let first = assemble();
        assert_eq!(first, assemble());
        let values: Vec<f64> = first.data_points().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 1.0]);
    }
}
