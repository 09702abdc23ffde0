mod task;
mod error;
pub mod store;
pub mod repository;

pub use task::{Task, TaskId, TaskStatus};
pub use error::{TaskError, Result};
pub use store::{MemoryStore, Store};
pub use repository::{TaskRepository, QUEUE_KEY, TASK_KEY_PREFIX, TASK_TTL};
