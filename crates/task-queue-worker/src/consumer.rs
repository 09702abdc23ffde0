use crate::{metrics::WorkerMetrics, processor::TaskProcessor};
use task_queue_core::{Task, TaskError, TaskRepository, TaskStatus};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Time between two ticks of the consumer loop
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Queue was empty
    Idle,
    /// Task ran and is now `completed`
    Completed(String),
    /// Task ran and is now `failed`
    Failed(String),
    /// ID was popped but its record was missing, unreadable or not pending;
    /// the entry is gone for good
    Dropped(String),
    /// Queue could not be read
    StoreUnavailable,
}

/// Single-worker polling loop.
///
/// Each tick pops at most one task ID and runs that task to a terminal state
/// before returning, so tasks are strictly serialized. Nothing is retried or
/// put back on the queue.
pub struct Consumer {
    repository: TaskRepository,
    processor: Arc<dyn TaskProcessor>,
    metrics: Arc<WorkerMetrics>,
}

impl Consumer {
    pub fn new(
        repository: TaskRepository,
        processor: Arc<dyn TaskProcessor>,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Consumer {
            repository,
            processor,
            metrics,
        }
    }

    pub fn repository(&self) -> &TaskRepository {
        &self.repository
    }

    /// Tick forever. The first tick fires one interval after start.
    pub async fn run(&self) {
        info!("Consumer started (polling every {:?})", POLL_INTERVAL);

        let mut ticker = tokio::time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let outcome = self.tick().await;
            debug!("Tick finished: {:?}", outcome);
        }
    }

    /// Dequeue and process at most one task
    pub async fn tick(&self) -> TickOutcome {
        self.refresh_queue_length().await;

        let task_id = match self.repository.dequeue().await {
            Ok(Some(task_id)) => task_id,
            Ok(None) => return TickOutcome::Idle,
            Err(e) => {
                error!("Failed to pop from queue: {}", e);
                self.metrics.store_errors.inc();
                return TickOutcome::StoreUnavailable;
            }
        };

        info!("Processing task: {}", task_id);
        let start = Instant::now();

        let Some(mut task) = self.load_pending(&task_id).await else {
            self.metrics.tasks_failed.inc();
            return TickOutcome::Dropped(task_id);
        };

        if let Err(e) = task.start_processing() {
            error!("Task {} cannot start: {}", task_id, e);
            self.metrics.tasks_failed.inc();
            return TickOutcome::Dropped(task_id);
        }
        // Best effort: a lost `processing` write does not stop the work
        self.write(&task).await;

        let result = self.processor.process(&task).await;
        let (transition, outcome) = match result {
            Ok(()) => {
                info!("Task {} completed", task_id);
                self.metrics.tasks_processed.inc();
                (task.complete(), TickOutcome::Completed(task_id.clone()))
            }
            Err(reason) => {
                warn!("Task {} failed: {}", task_id, reason);
                self.metrics.tasks_failed.inc();
                (task.fail(), TickOutcome::Failed(task_id.clone()))
            }
        };

        match transition {
            Ok(()) => self.write(&task).await,
            Err(e) => error!("Task {} terminal transition rejected: {}", task_id, e),
        }

        self.metrics
            .task_processing_duration
            .observe(start.elapsed().as_secs_f64());

        outcome
    }

    async fn refresh_queue_length(&self) {
        match self.repository.queue_len().await {
            Ok(len) => self.metrics.queue_length.set(len as i64),
            Err(e) => debug!("Failed to read queue length: {}", e),
        }
    }

    /// Load a popped task, logging why it has to be dropped otherwise
    async fn load_pending(&self, task_id: &str) -> Option<Task> {
        match self.repository.load(task_id).await {
            Ok(Some(task)) if task.status.can_transition_to(TaskStatus::Processing) => Some(task),
            Ok(Some(task)) => {
                error!("Task {} is already {}, dropping queue entry", task_id, task.status);
                None
            }
            Ok(None) => {
                error!("Failed to get task {}: record missing or expired", task_id);
                None
            }
            Err(e @ TaskError::Corrupt { .. }) => {
                error!("Failed to unmarshal task {}: {}", task_id, e);
                None
            }
            Err(e) => {
                error!("Failed to get task {}: {}", task_id, e);
                self.metrics.store_errors.inc();
                None
            }
        }
    }

    async fn write(&self, task: &Task) {
        if let Err(e) = self.repository.save(task).await {
            error!("Failed to write task {} as {}: {}", task.id, task.status, e);
            self.metrics.store_errors.inc();
        }
    }
}
