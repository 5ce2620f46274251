//! Errors and diagnostics surfaced by the aggregation engine.
use std::result;
use thiserror::Error;

/// A specialized `Result` type for aggregation operations.
pub type MetricResult<T> = result::Result<T, MetricError>;

/// Errors returned by the aggregation engine.
///
/// None of these ever escape the record path. Measurement errors are dropped
/// with a debug diagnostic, collection errors are reported next to the data
/// they affect in a [`Snapshot`](crate::aggregation::Snapshot).
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MetricError {
    /// A negative value was recorded into a monotonic sum.
    #[error("negative value recorded into a monotonic sum")]
    NegativeInput,
    /// A NaN value was recorded into a sum.
    #[error("NaN value recorded into a sum")]
    NaNInput,
    /// A monotonic sum went backwards between two collection cycles.
    #[error("monotonic sum decreased from {previous} to {current}")]
    NegativeDelta {
        /// The cumulative value retained from the previous cycle.
        previous: String,
        /// The cumulative value observed in this cycle.
        current: String,
    },
    /// The difference of two cumulative values does not fit the number type.
    #[error("delta between {previous} and {current} overflowed the number type")]
    Overflow {
        /// The cumulative value retained from the previous cycle.
        previous: String,
        /// The cumulative value observed in this cycle.
        current: String,
    },
    /// Invalid configuration
    #[error("Config error {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::MetricError;

    #[test]
    fn negative_delta_message_names_both_values() {
        let err = MetricError::NegativeDelta {
            previous: "10".into(),
            current: "4".into(),
        };
        assert_eq!(err.to_string(), "monotonic sum decreased from 10 to 4");
    }

    #[test]
    fn config_errors_carry_the_reason() {
        let err = MetricError::Config("unknown temporality \"weekly\"".into());
        assert_eq!(err.to_string(), "Config error unknown temporality \"weekly\"");
    }
}
