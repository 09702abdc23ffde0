use crate::TaskStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Payload is required")]
    EmptyPayload,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Corrupt record for task {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

pub type Result<T> = std::result::Result<T, TaskError>;
