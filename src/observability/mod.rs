// Observability: metrics

pub mod metrics;

pub use metrics::{init, render, write_rendered, MetricName};
