//! Observability: mutation telemetry and sink abstractions.
//!
//! Container logic does not touch counters directly; all
//! instrumentation flows through [`MetricsEvent`] and [`MetricsSink`].

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::EventReport;
pub use sink::{CaptureSink, MetricsEvent, MetricsSink, metrics_report, metrics_reset, with_sink};
