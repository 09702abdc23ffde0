mod redis_store;

pub use redis_store::{redis_url, RedisStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Unexpected PING reply: {0}")]
    UnexpectedPing(String),
}

impl From<PersistenceError> for task_queue_core::TaskError {
    fn from(e: PersistenceError) -> Self {
        task_queue_core::TaskError::Store(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
