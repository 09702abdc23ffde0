use crate::{TaskError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a task
pub type TaskId = Uuid;

/// Task status, advancing strictly forward:
/// `pending -> processing -> {completed | failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task is stored and queued, not yet picked up
    Pending,
    /// Task has been popped by a consumer and is being worked on
    Processing,
    /// Task finished successfully
    Completed,
    /// Task finished with a processing failure
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Position in the state machine; transitions only ever increase it
    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Processing => 1,
            TaskStatus::Completed | TaskStatus::Failed => 2,
        }
    }

    /// Whether `self -> next` is a legal single step
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        !self.is_terminal() && next.rank() == self.rank() + 1
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work carried from the producer to the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier, assigned at creation
    pub id: TaskId,

    /// Opaque caller-supplied payload, never interpreted
    pub payload: String,

    /// Current status
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// Time of the last status transition, unset while pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task; the payload must be non-empty
    pub fn new(payload: impl Into<String>) -> Result<Self> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(TaskError::EmptyPayload);
        }

        Ok(Task {
            id: Uuid::new_v4(),
            payload,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    /// Serialize task to its stored JSON form
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(TaskError::from)
    }

    /// Deserialize task from its stored JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(TaskError::from)
    }

    /// Payload length in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Mark task as picked up by a consumer
    pub fn start_processing(&mut self) -> Result<()> {
        self.transition(TaskStatus::Processing)
    }

    /// Mark task as completed successfully
    pub fn complete(&mut self) -> Result<()> {
        self.transition(TaskStatus::Completed)
    }

    /// Mark task as failed
    pub fn fail(&mut self) -> Result<()> {
        self.transition(TaskStatus::Failed)
    }

    fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.touch();
        Ok(())
    }

    /// Stamp `updated_at`, never moving it backwards
    fn touch(&mut self) {
        let floor = self.updated_at.unwrap_or(self.created_at);
        self.updated_at = Some(Utc::now().max(floor));
    }
}
