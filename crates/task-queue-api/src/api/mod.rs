mod error;
mod middleware;
mod probes;
mod rest;

pub use error::ApiError;
pub use rest::{create_router, AppState};
