use std::sync::{Mutex, MutexGuard, PoisonError};

use opentelemetry::{otel_debug, Context, KeyValue};

use crate::{error::MetricError, exemplar::ExemplarReservoir, AttributeSet};

use super::{Accumulation, Number};

/// The update rule a handle applies to recorded measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleKind {
    Sum { monotonic: bool },
    LastValue,
}

impl HandleKind {
    fn validate<T: Number>(self, value: T) -> Result<(), MetricError> {
        match self {
            HandleKind::Sum { .. } if value.is_nan() => Err(MetricError::NaNInput),
            HandleKind::Sum { monotonic: true } if value.is_negative() => {
                Err(MetricError::NegativeInput)
            }
            _ => Ok(()),
        }
    }

    fn update<T: Number>(self, current: Option<T>, value: T) -> T {
        match (self, current) {
            (HandleKind::Sum { .. }, Some(total)) => total.add_wrapping(value),
            _ => value,
        }
    }
}

/// The mutable state of one series of one instrument.
///
/// A handle is either empty, with nothing recorded since the last reset, or
/// populated. The value and that state live behind a single lock, so a
/// measurement is always observed by exactly one extraction.
#[derive(Debug)]
pub struct AggregatorHandle<T> {
    kind: HandleKind,
    state: Mutex<Option<T>>,
    reservoir: ExemplarReservoir<T>,
}

impl<T: Number> AggregatorHandle<T> {
    pub(crate) fn new(kind: HandleKind, reservoir: ExemplarReservoir<T>) -> Self {
        AggregatorHandle {
            kind,
            state: Mutex::new(None),
            reservoir,
        }
    }

    /// Records a measurement and offers it to the exemplar reservoir.
    ///
    /// NaN values recorded into a sum and negative values recorded into a
    /// monotonic sum are dropped. Last-value handles keep any value as-is.
    pub fn record(&self, value: T, attributes: &[KeyValue], cx: &Context) {
        if let Err(err) = self.kind.validate(value) {
            otel_debug!(
                name: "MeasurementDropped",
                value = value.to_string(),
                reason = err.to_string()
            );
            return;
        }

        // The exemplar is offered under the same lock as the value update, so
        // both land in the same cycle.
        let mut state = self.lock();
        *state = Some(self.kind.update(*state, value));
        self.reservoir.offer(value, attributes, cx);
    }

    /// Extracts the current value with the exemplars sampled since the last
    /// extraction, or `None` if nothing was recorded.
    ///
    /// With `reset` the handle returns to the empty state. Exemplars are
    /// drained on every call, in the same critical section as the value they
    /// were sampled with.
    pub fn accumulate_then_maybe_reset(
        &self,
        attributes: &AttributeSet,
        reset: bool,
    ) -> Option<Accumulation<T>> {
        let mut state = self.lock();
        let value = if reset { state.take() } else { *state };
        let exemplars = self.reservoir.collect_and_reset(attributes);
        drop(state);

        value.map(|value| Accumulation::new(value, exemplars))
    }

    /// Returns `true` if nothing was recorded since the last reset.
    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
