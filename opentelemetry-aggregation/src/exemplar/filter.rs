use std::{env, str::FromStr};

use opentelemetry::{otel_debug, trace::TraceContextExt, Context};

use crate::error::MetricError;

pub(crate) const EXEMPLAR_FILTER_NAME: &str = "OTEL_METRICS_EXEMPLAR_FILTER";

/// Decides which measurements are offered to an exemplar reservoir.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ExemplarFilter {
    /// Every measurement is offered.
    AlwaysOn,
    /// No measurement is offered, exemplars are disabled.
    AlwaysOff,
    /// Only measurements recorded inside a sampled span are offered.
    #[default]
    TraceBased,
}

impl ExemplarFilter {
    /// Reads the filter from the `OTEL_METRICS_EXEMPLAR_FILTER` environment
    /// variable, falling back to [`ExemplarFilter::TraceBased`] when it is
    /// unset or invalid.
    pub fn from_env() -> Self {
        match env::var(EXEMPLAR_FILTER_NAME) {
            Ok(value) if !value.trim().is_empty() => {
                value.parse().unwrap_or_else(|err: MetricError| {
                    otel_debug!(
                        name: "ExemplarFilterFallback",
                        message = "Falling back to the trace based exemplar filter",
                        error = err.to_string()
                    );
                    ExemplarFilter::default()
                })
            }
            _ => ExemplarFilter::default(),
        }
    }

    /// Returns `true` if a measurement recorded in `cx` should be offered to
    /// the reservoir.
    pub fn should_sample(&self, cx: &Context) -> bool {
        match self {
            ExemplarFilter::AlwaysOn => true,
            ExemplarFilter::AlwaysOff => false,
            ExemplarFilter::TraceBased => cx.span().span_context().is_sampled(),
        }
    }
}

impl FromStr for ExemplarFilter {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always_on" => Ok(ExemplarFilter::AlwaysOn),
            "always_off" => Ok(ExemplarFilter::AlwaysOff),
            "trace_based" => Ok(ExemplarFilter::TraceBased),
            other => Err(MetricError::Config(format!(
                "unknown exemplar filter \"{other}\""
            ))),
        }
    }
}
