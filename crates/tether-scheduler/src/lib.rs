//! Interval-based periodic task scheduler where overlapping ticks are skipped, not queued.

mod error;
mod lock;
mod scheduler;
mod task;

pub use error::SchedulerError;
pub use lock::{SkipGuard, SkipLock};
pub use scheduler::{Scheduler, TaskStatsSnapshot, TickOutcome};
pub use task::{ScheduledTask, TaskHandler, TaskKind};
