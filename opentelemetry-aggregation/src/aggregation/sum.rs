use crate::{
    data::{AggregatedData, DataPoint, Sum, Temporality},
    error::{MetricError, MetricResult},
    exemplar::ReservoirConfig,
};

use super::{handle::HandleKind, Accumulation, AggregatorHandle, Marker, Number};

/// Summarizes a set of measurements as their arithmetic sum.
#[derive(Debug, Clone)]
pub struct SumAggregator<T> {
    monotonic: bool,
    reservoir: ReservoirConfig,
    _marker: Marker<T>,
}

impl<T: Number> SumAggregator<T> {
    pub(crate) fn new(monotonic: bool, reservoir: ReservoirConfig) -> Self {
        SumAggregator {
            monotonic,
            reservoir,
            _marker: Marker::default(),
        }
    }

    /// Whether the sum only ever increases.
    pub fn is_monotonic(&self) -> bool {
        self.monotonic
    }

    pub(crate) fn create_handle(&self) -> AggregatorHandle<T> {
        AggregatorHandle::new(
            HandleKind::Sum {
                monotonic: self.monotonic,
            },
            self.reservoir.build(),
        )
    }

    /// Adds the values, keeping the exemplars of the later cycle.
    pub(crate) fn merge(
        &self,
        previous: &Accumulation<T>,
        current: &Accumulation<T>,
    ) -> Accumulation<T> {
        Accumulation::new(
            previous.value().add_wrapping(current.value()),
            current.exemplars().to_vec(),
        )
    }

    /// `current - previous`. A decrease of a monotonic sum is reported as
    /// [`MetricError::NegativeDelta`].
    pub(crate) fn diff(
        &self,
        previous: &Accumulation<T>,
        current: &Accumulation<T>,
    ) -> MetricResult<Accumulation<T>> {
        let (prev, curr) = (previous.value(), current.value());
        let negative_delta = || MetricError::NegativeDelta {
            previous: prev.to_string(),
            current: curr.to_string(),
        };

        match curr.checked_diff(prev) {
            Some(delta) if self.monotonic && delta.is_negative() => Err(negative_delta()),
            Some(delta) => Ok(Accumulation::new(delta, current.exemplars().to_vec())),
            None if self.monotonic && curr < prev => Err(negative_delta()),
            None => Err(MetricError::Overflow {
                previous: prev.to_string(),
                current: curr.to_string(),
            }),
        }
    }

    pub(crate) fn to_data(
        &self,
        data_points: Vec<DataPoint<T>>,
        temporality: Temporality,
    ) -> AggregatedData<T> {
        Sum {
            data_points,
            temporality,
            is_monotonic: self.monotonic,
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::SumAggregator;
    use crate::{
        aggregation::Accumulation,
        data::{AggregatedData, Temporality},
        error::MetricError,
        exemplar::ReservoirConfig,
    };

    fn acc<T: crate::aggregation::Number>(value: T) -> Accumulation<T> {
        Accumulation::new(value, Vec::new())
    }

    #[test]
    fn merge_adds() {
        let sum = SumAggregator::<i64>::new(false, ReservoirConfig::disabled());
        assert_eq!(sum.merge(&acc(4), &acc(-6)).value(), -2);
    }

    #[rstest]
    #[case(true, 3, 10, 7)]
    #[case(false, 3, 10, 7)]
    #[case(false, 10, 3, -7)]
    fn diff_of_i64(
        #[case] monotonic: bool,
        #[case] previous: i64,
        #[case] current: i64,
        #[case] expected: i64,
    ) {
        let sum = SumAggregator::new(monotonic, ReservoirConfig::disabled());
        assert_eq!(
            sum.diff(&acc(previous), &acc(current)).map(|a| a.value()),
            Ok(expected)
        );
    }

    #[test]
    fn monotonic_decrease_is_negative_delta() {
        let sum = SumAggregator::<u64>::new(true, ReservoirConfig::disabled());
        assert_eq!(
            sum.diff(&acc(10), &acc(4)),
            Err(MetricError::NegativeDelta {
                previous: "10".into(),
                current: "4".into(),
            })
        );

        let sum = SumAggregator::<f64>::new(true, ReservoirConfig::disabled());
        assert!(matches!(
            sum.diff(&acc(2.5), &acc(1.0)),
            Err(MetricError::NegativeDelta { .. })
        ));
    }

    #[test]
    fn unrepresentable_delta_is_overflow() {
        let sum = SumAggregator::<i64>::new(false, ReservoirConfig::disabled());
        assert!(matches!(
            sum.diff(&acc(1), &acc(i64::MIN)),
            Err(MetricError::Overflow { .. })
        ));

        let sum = SumAggregator::<u64>::new(false, ReservoirConfig::disabled());
        assert!(matches!(
            sum.diff(&acc(10), &acc(4)),
            Err(MetricError::Overflow { .. })
        ));
    }

    #[test]
    fn to_data_carries_temporality_and_monotonicity() {
        let sum = SumAggregator::<u64>::new(true, ReservoirConfig::disabled());
        match sum.to_data(Vec::new(), Temporality::Delta) {
            AggregatedData::Sum(data) => {
                assert_eq!(data.temporality, Temporality::Delta);
                assert!(data.is_monotonic);
                assert!(data.data_points.is_empty());
            }
            AggregatedData::Gauge(_) => panic!("expected a sum"),
        }
    }
}
