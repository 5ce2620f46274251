//! # OpenTelemetry Metric Aggregation
//!
//! The in-process aggregation engine behind an OpenTelemetry metrics SDK. It
//! turns high frequency measurements into periodically collected,
//! temporality-aware metric snapshots.
//!
//! The building blocks, leaf first:
//!
//! * [`aggregation::Accumulation`]: an immutable snapshot of one series.
//! * [`exemplar::ExemplarReservoir`]: samples raw measurements together with
//!   the trace context they were recorded in.
//! * [`aggregation::AggregatorHandle`]: the per attribute set state machine
//!   that measurements are recorded into.
//! * [`aggregation::Aggregator`]: the strategy (sum or last value) that
//!   creates handles, merges and diffs accumulations and assembles
//!   [`data::MetricData`].
//! * [`storage`]: the per instrument registries wiring the pieces together for
//!   synchronous and observable instruments.
//!
//! ```
//! use opentelemetry::{Context, InstrumentationScope, KeyValue};
//! use opentelemetry_aggregation::aggregation::Aggregator;
//! use opentelemetry_aggregation::data::{AggregatedData, MetricDescriptor, Temporality};
//! use opentelemetry_aggregation::exemplar::ReservoirConfig;
//! use opentelemetry_aggregation::storage::SyncMetricStorage;
//! use opentelemetry_aggregation::Resource;
//!
//! let storage = SyncMetricStorage::builder(
//!     MetricDescriptor::new("requests", "Handled requests", "{request}"),
//!     Aggregator::<u64>::sum(true, ReservoirConfig::default()),
//! )
//! .with_temporality(Temporality::Delta)
//! .build();
//!
//! storage.record(3, &[KeyValue::new("route", "/")], &Context::new());
//!
//! let snapshot = storage.collect(&Resource::empty(), &InstrumentationScope::default());
//! match snapshot.data.data {
//!     AggregatedData::Sum(sum) => assert_eq!(sum.data_points[0].value, 3),
//!     AggregatedData::Gauge(_) => unreachable!(),
//! }
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/open-telemetry/opentelemetry-rust/main/assets/logo.svg"
)]

pub mod aggregation;
mod attribute_set;
pub mod data;
pub mod error;
pub mod exemplar;
mod resource;
pub mod storage;

pub use attribute_set::AttributeSet;
pub use resource::Resource;
