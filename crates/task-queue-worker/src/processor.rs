use async_trait::async_trait;
use std::time::Duration;
use task_queue_core::Task;
use tracing::info;

/// Result of processing a task; the error is a human-readable reason
pub type ProcessResult = Result<(), String>;

/// The work step the consumer runs for each task it dequeues
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, task: &Task) -> ProcessResult;
}

/// Stand-in for real work, fully determined by payload length `L`:
/// it takes `2 + L % 5` time units and fails iff `L % 10 == 0`.
pub struct PayloadLengthProcessor {
    unit: Duration,
}

impl PayloadLengthProcessor {
    pub fn new(unit: Duration) -> Self {
        PayloadLengthProcessor { unit }
    }

    /// Processing time for a payload of `len` bytes
    pub fn duration_for(&self, len: usize) -> Duration {
        self.unit * (2 + (len % 5) as u32)
    }

    pub fn fails_for(len: usize) -> bool {
        len % 10 == 0
    }
}

impl Default for PayloadLengthProcessor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl TaskProcessor for PayloadLengthProcessor {
    async fn process(&self, task: &Task) -> ProcessResult {
        let len = task.payload_len();
        let duration = self.duration_for(len);

        info!("Processing task {} for {:?}", task.id, duration);
        tokio::time::sleep(duration).await;

        if Self::fails_for(len) {
            return Err("simulated processing failure".to_string());
        }
        Ok(())
    }
}
