use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::SchedulerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Export,
    HealthCheck,
    Custom(String),
}

impl TaskKind {
    #[must_use]
    pub fn from_str_kind(s: &str) -> Self {
        match s {
            "export" => Self::Export,
            "health_check" => Self::HealthCheck,
            other => Self::Custom(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Export => "export",
            Self::HealthCheck => "health_check",
            Self::Custom(s) => s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: String,
    pub interval: Duration,
    pub kind: TaskKind,
}

impl ScheduledTask {
    /// Create a task that fires every `interval`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidInterval` if `interval` is zero.
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        kind: TaskKind,
    ) -> Result<Self, SchedulerError> {
        let name = name.into();
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval {
                task: name,
                interval,
            });
        }
        Ok(Self {
            name,
            interval,
            kind,
        })
    }
}

pub trait TaskHandler: Send + Sync {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<(), SchedulerError>> + Send + '_>>;
}
