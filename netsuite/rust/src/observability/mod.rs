//! Observability: structured logging setup and request/record counters.

mod logging;
mod metrics;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use metrics::{Metrics, MetricsSnapshot};
