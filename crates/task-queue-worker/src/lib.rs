pub mod config;
pub mod consumer;
pub mod metrics;
pub mod processor;
pub mod server;

pub use config::WorkerConfig;
pub use consumer::{Consumer, TickOutcome, POLL_INTERVAL};
pub use metrics::WorkerMetrics;
pub use processor::{PayloadLengthProcessor, TaskProcessor};
