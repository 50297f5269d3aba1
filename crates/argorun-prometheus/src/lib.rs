//! Prometheus metrics backend for the container runner.
//!
//! This crate provides [`RunnerMetrics`], an implementation of
//! [`argorun_core::MetricsSink`] tracking two series:
//!
//! - `argorun_container_runner_execution_seconds{image, status}` - Histogram
//! - `argorun_container_runner_running_jobs{image}` - Gauge
//!
//! Construct one instance at bootstrap and share it across all runs.
//!
//! This crate does NOT provide an HTTP server for a `/metrics` endpoint.
//! Expose [`RunnerMetrics::gather`] through your application's existing HTTP
//! framework:
//!
//! ```rust,ignore
//! let families = metrics.gather();
//! let encoder = prometheus::TextEncoder::new();
//! let mut buffer = vec![];
//! encoder.encode(&families, &mut buffer)?;
//! ```

mod backend;
pub use backend::RunnerMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
