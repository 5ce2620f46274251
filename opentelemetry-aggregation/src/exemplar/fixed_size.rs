use std::{
    cell::RefCell,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::SystemTime,
};

use opentelemetry::{trace::TraceContextExt, Context, KeyValue};
use rand::{rngs, Rng, SeedableRng};

use crate::{aggregation::Number, data::Exemplar, AttributeSet};

use super::ExemplarFilter;

thread_local! {
    /// Store random number generator for each thread
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_os_rng());
}

/// A measurement retained by the reservoir, before it is matched against the
/// attributes of the series it is reported with.
#[derive(Debug)]
struct ExemplarCell<T> {
    value: T,
    time: SystemTime,
    attributes: Vec<KeyValue>,
    span_id: [u8; 8],
    trace_id: [u8; 16],
}

impl<T: Number> ExemplarCell<T> {
    fn into_exemplar(self, point_attributes: &AttributeSet) -> Exemplar<T> {
        Exemplar {
            filtered_attributes: self
                .attributes
                .into_iter()
                .filter(|kv| !point_attributes.contains_key(&kv.key))
                .collect(),
            time: self.time,
            value: self.value,
            span_id: self.span_id,
            trace_id: self.trace_id,
        }
    }
}

/// A reservoir holding at most `size` exemplars, chosen uniformly from all
/// offered measurements of a collection cycle (Algorithm R).
///
/// Each cell has its own lock so concurrent offers only contend when they
/// pick the same cell.
#[derive(Debug)]
pub struct FixedSizeReservoir<T> {
    filter: ExemplarFilter,
    cells: Box<[Mutex<Option<ExemplarCell<T>>>]>,
    measurements: AtomicUsize,
}

impl<T: Number> FixedSizeReservoir<T> {
    pub(crate) fn new(filter: ExemplarFilter, size: usize) -> Self {
        FixedSizeReservoir {
            filter,
            cells: (0..size).map(|_| Mutex::new(None)).collect(),
            measurements: AtomicUsize::new(0),
        }
    }

    /// The maximum number of exemplars retained per cycle.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn offer(&self, value: T, attributes: &[KeyValue], cx: &Context) {
        if self.cells.is_empty() || !self.filter.should_sample(cx) {
            return;
        }

        let count = self.measurements.fetch_add(1, Ordering::Relaxed);
        let index = if count < self.cells.len() {
            count
        } else {
            CURRENT_RNG.with(|rng| rng.borrow_mut().random_range(0..=count))
        };
        let Some(cell) = self.cells.get(index) else {
            return;
        };

        let span = cx.span();
        let span_context = span.span_context();
        let (span_id, trace_id) = if span_context.is_valid() {
            (
                span_context.span_id().to_bytes(),
                span_context.trace_id().to_bytes(),
            )
        } else {
            ([0; 8], [0; 16])
        };

        if let Ok(mut cell) = cell.lock() {
            *cell = Some(ExemplarCell {
                value,
                time: SystemTime::now(),
                attributes: attributes.to_vec(),
                span_id,
                trace_id,
            });
        }
    }

    pub(crate) fn collect_and_reset(&self, point_attributes: &AttributeSet) -> Vec<Exemplar<T>> {
        let exemplars = self
            .cells
            .iter()
            .filter_map(|cell| cell.lock().ok().and_then(|mut cell| cell.take()))
            .map(|cell| cell.into_exemplar(point_attributes))
            .collect();
        self.measurements.store(0, Ordering::Relaxed);
        exemplars
    }
}
