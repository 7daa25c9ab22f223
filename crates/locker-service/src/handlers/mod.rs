//! HTTP request handlers.

pub mod blobs;
pub mod health;
pub mod metrics;

pub use blobs::{delete_blob, get_blob, put_blob};
pub use health::health_check;
pub use metrics::metrics_handler;
