//! Scheduler handlers for the periodic export and health-check jobs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tether_scheduler::{SchedulerError, TaskHandler};

use crate::mirror::{HealthCycle, MirrorContext, export_collection_to_store, run_health_cycle};

pub const EXPORT_TASK: &str = "export";
pub const HEALTH_TASK: &str = "health_check";

pub struct ExportTask {
    ctx: Arc<MirrorContext>,
}

impl ExportTask {
    #[must_use]
    pub fn new(ctx: Arc<MirrorContext>) -> Self {
        Self { ctx }
    }
}

impl TaskHandler for ExportTask {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<(), SchedulerError>> + Send + '_>> {
        Box::pin(async move {
            let settings = self.ctx.settings();
            match export_collection_to_store(
                &self.ctx,
                &settings.source_collection,
                &settings.backup_table,
            )
            .await
            {
                Ok(_) => Ok(()),
                Err(e) => {
                    tracing::error!(
                        collection = %settings.source_collection,
                        table = %settings.backup_table,
                        "export failed: {e}"
                    );
                    Err(SchedulerError::TaskFailed(e.to_string()))
                }
            }
        })
    }
}

pub struct HealthCheckTask {
    ctx: Arc<MirrorContext>,
}

impl HealthCheckTask {
    #[must_use]
    pub fn new(ctx: Arc<MirrorContext>) -> Self {
        Self { ctx }
    }
}

impl TaskHandler for HealthCheckTask {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<(), SchedulerError>> + Send + '_>> {
        Box::pin(async move {
            match run_health_cycle(&self.ctx).await {
                HealthCycle::Healthy | HealthCycle::RecoveryComplete { .. } => Ok(()),
                HealthCycle::RecoveryFailed { destination, error } => Err(
                    SchedulerError::TaskFailed(format!("recovery into {destination} failed: {error}")),
                ),
            }
        })
    }
}
