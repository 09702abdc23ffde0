//! Task creation and status lookup on the producer side.

use crate::ApiMetrics;
use std::sync::Arc;
use task_queue_core::{Task, TaskError, TaskRepository};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Payload is required")]
    MissingPayload,

    #[error("Task not found")]
    NotFound,

    #[error("Failed to store task: {0}")]
    StoreFailed(TaskError),

    #[error("Failed to enqueue task: {0}")]
    EnqueueFailed(TaskError),

    #[error("Failed to retrieve task: {0}")]
    ReadFailed(TaskError),

    #[error("Failed to parse task: {0}")]
    ParseFailed(TaskError),
}

/// Accepts work and answers status queries.
///
/// A task is written to the store before its ID is queued, so the consumer
/// never pops an ID whose record was not acknowledged. A failed push after a
/// successful write leaves an unqueued record behind; it is reported to the
/// caller and not repaired.
#[derive(Clone)]
pub struct Producer {
    repository: TaskRepository,
    metrics: Arc<ApiMetrics>,
}

impl Producer {
    pub fn new(repository: TaskRepository, metrics: Arc<ApiMetrics>) -> Self {
        Producer { repository, metrics }
    }

    pub fn repository(&self) -> &TaskRepository {
        &self.repository
    }

    /// Create, store and enqueue a new task
    pub async fn create(&self, payload: Option<String>) -> Result<Task, ProducerError> {
        let payload = payload.unwrap_or_default();
        let task = Task::new(payload).map_err(|_| ProducerError::MissingPayload)?;
        let task_id = task.id.to_string();

        if let Err(e) = self.repository.save(&task).await {
            error!("Failed to store task {}: {}", task_id, e);
            return Err(ProducerError::StoreFailed(e));
        }

        if let Err(e) = self.repository.enqueue(&task_id).await {
            error!("Task {} stored but not enqueued: {}", task_id, e);
            return Err(ProducerError::EnqueueFailed(e));
        }

        self.metrics.tasks_created.inc();
        info!("Created task {}", task_id);

        Ok(task)
    }

    /// Point-in-time read of a task's stored state
    pub async fn status(&self, task_id: &str) -> Result<Task, ProducerError> {
        match self.repository.load(task_id).await {
            Ok(Some(task)) => Ok(task),
            Ok(None) => Err(ProducerError::NotFound),
            Err(e @ TaskError::Corrupt { .. }) => Err(ProducerError::ParseFailed(e)),
            Err(e) => Err(ProducerError::ReadFailed(e)),
        }
    }
}
