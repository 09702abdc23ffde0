use crate::{Result, Store, Task, TaskError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Prefix of per-task record keys (`task:<id>`)
pub const TASK_KEY_PREFIX: &str = "task:";

/// List holding the IDs of tasks waiting to be consumed
pub const QUEUE_KEY: &str = "task:queue";

/// Expiry applied on every record write
pub const TASK_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Task records and the pending queue, laid out on a shared [`Store`]
#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn Store>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        TaskRepository { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn task_key(id: &str) -> String {
        format!("{}{}", TASK_KEY_PREFIX, id)
    }

    /// Write the task record, refreshing its expiry
    pub async fn save(&self, task: &Task) -> Result<()> {
        let json = task.to_json()?;
        self.store
            .set_ex(&Self::task_key(&task.id.to_string()), &json, TASK_TTL)
            .await?;
        debug!("Saved task {} ({})", task.id, task.status);
        Ok(())
    }

    /// Read a task record. Absent or expired records are `None`; a record
    /// that does not parse is [`TaskError::Corrupt`].
    pub async fn load(&self, id: &str) -> Result<Option<Task>> {
        let Some(json) = self.store.get(&Self::task_key(id)).await? else {
            return Ok(None);
        };

        Task::from_json(&json)
            .map(Some)
            .map_err(|e| TaskError::Corrupt {
                id: id.to_string(),
                reason: e.to_string(),
            })
    }

    /// Push a task ID onto the head of the queue
    pub async fn enqueue(&self, id: &str) -> Result<()> {
        self.store.lpush(QUEUE_KEY, id).await
    }

    /// Pop the oldest task ID from the tail of the queue
    pub async fn dequeue(&self) -> Result<Option<String>> {
        self.store.rpop(QUEUE_KEY).await
    }

    pub async fn queue_len(&self) -> Result<u64> {
        self.store.llen(QUEUE_KEY).await
    }
}
