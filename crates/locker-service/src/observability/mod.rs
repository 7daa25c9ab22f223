//! Observability for the Blob Store (Prometheus metrics).

pub mod metrics;
