pub mod api;
pub mod config;
pub mod metrics;
pub mod producer;

pub use api::{create_router, AppState};
pub use config::ApiConfig;
pub use metrics::ApiMetrics;
pub use producer::Producer;
