use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid interval for task {task}: {interval:?}")]
    InvalidInterval { task: String, interval: Duration },
    #[error("task execution failed: {0}")]
    TaskFailed(String),
}
