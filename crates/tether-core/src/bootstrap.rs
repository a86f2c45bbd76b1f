//! Application bootstrap: config resolution, store construction, startup checks, scheduler wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tether_scheduler::{ScheduledTask, Scheduler, TaskKind};
use tether_store::{
    BackupStore, ChromaEndpoint, ChromaStore, PgBackupStore, PgConnectSettings, SqliteBackupStore,
    VectorStore,
};
use tokio::sync::watch;

use crate::config::{Config, DbBackend};
use crate::mirror::{MirrorContext, MirrorSettings};
use crate::tasks::{EXPORT_TASK, ExportTask, HEALTH_TASK, HealthCheckTask};

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Resolve the config path, load the file with env overrides, and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be read, parsed, or fails validation.
    pub fn load(cli_path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = resolve_config_path(cli_path);
        let config = Config::load(&config_path)?;
        config.validate().context("invalid configuration")?;
        Ok(Self {
            config,
            config_path,
        })
    }

    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            config_path: PathBuf::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Open the relational backup store selected by `database.backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached or opened.
    pub async fn build_backup_store(&self) -> anyhow::Result<Arc<dyn BackupStore>> {
        let db = &self.config.database;
        let acquire_timeout = Duration::from_secs(self.config.timeouts.database_seconds);
        match db.backend {
            DbBackend::Postgres => {
                let settings = PgConnectSettings {
                    host: db.host.clone(),
                    port: db.port,
                    user: db.user.clone(),
                    password: self
                        .config
                        .secrets
                        .db_password
                        .as_ref()
                        .map(|s| s.expose().to_owned()),
                    database: db.name.clone(),
                    max_connections: db.max_connections,
                    acquire_timeout,
                };
                let store = PgBackupStore::connect(&settings).await.with_context(|| {
                    format!(
                        "failed to connect to PostgreSQL at {}:{}/{}",
                        db.host, db.port, db.name
                    )
                })?;
                Ok(Arc::new(store))
            }
            DbBackend::Sqlite => {
                if db.sqlite_path != ":memory:"
                    && let Some(parent) = Path::new(&db.sqlite_path).parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create directory {}", parent.display())
                    })?;
                }
                let store =
                    SqliteBackupStore::open(&db.sqlite_path, db.max_connections, acquire_timeout)
                        .await
                        .with_context(|| format!("failed to open SQLite at {}", db.sqlite_path))?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Build the HTTP vector-store client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build_vector_store(&self) -> anyhow::Result<Arc<dyn VectorStore>> {
        let vs = &self.config.vector_store;
        let endpoint = ChromaEndpoint {
            host: vs.host.clone(),
            port: vs.port,
            use_ssl: vs.use_ssl,
        };
        let store = ChromaStore::new(
            &endpoint,
            Duration::from_secs(self.config.timeouts.vector_store_seconds),
        )
        .context("failed to build vector store client")?;
        tracing::debug!(base_url = %store.base_url(), "vector store client ready");
        Ok(Arc::new(store))
    }

    /// Build stores from the config and wrap them in a [`MirrorContext`].
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be built.
    pub async fn build_context(&self) -> anyhow::Result<Arc<MirrorContext>> {
        let backup_store = self.build_backup_store().await?;
        let vector_store = self.build_vector_store()?;
        let settings = MirrorSettings::from_config(&self.config)?;
        Ok(Arc::new(MirrorContext::new(
            vector_store,
            backup_store,
            settings,
        )))
    }

    /// Build the scheduler with the export and health-check tasks registered.
    ///
    /// # Errors
    ///
    /// Returns an error if an interval is zero.
    pub fn build_scheduler(
        &self,
        ctx: &Arc<MirrorContext>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<Scheduler> {
        let sched = &self.config.scheduler;
        let mut scheduler = Scheduler::new(shutdown_rx)
            .with_run_on_start(sched.run_on_start)
            .with_shutdown_grace(Duration::from_secs(sched.shutdown_grace_secs));

        scheduler.add_task(ScheduledTask::new(
            EXPORT_TASK,
            Duration::from_secs(sched.export_interval_secs),
            TaskKind::Export,
        )?);
        scheduler.add_task(ScheduledTask::new(
            HEALTH_TASK,
            Duration::from_secs(sched.health_interval_secs),
            TaskKind::HealthCheck,
        )?);
        scheduler.register_handler(&TaskKind::Export, Box::new(ExportTask::new(Arc::clone(ctx))));
        scheduler.register_handler(
            &TaskKind::HealthCheck,
            Box::new(HealthCheckTask::new(Arc::clone(ctx))),
        );
        scheduler.init();
        Ok(scheduler)
    }
}

/// Verify both stores answer before any task is scheduled.
///
/// # Errors
///
/// Returns an error naming the store that could not be reached.
pub async fn startup_checks(ctx: &MirrorContext) -> anyhow::Result<()> {
    let settings = ctx.settings();
    ctx.backup_call(ctx.backup_store().ping())
        .await
        .context("relational store unreachable")?;
    ctx.backup_call(ctx.backup_store().ensure_table(&settings.backup_table))
        .await
        .with_context(|| format!("failed to prepare backup table {}", settings.backup_table))?;
    ctx.vector_call(ctx.vector_store().ping())
        .await
        .context("vector store unreachable")?;
    tracing::info!(
        collection = %settings.source_collection,
        table = %settings.backup_table,
        "startup checks passed"
    );
    Ok(())
}

/// Config path precedence: `--config`, then `TETHER_CONFIG`, then `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_owned();
    }
    if let Ok(path) = std::env::var("TETHER_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}
