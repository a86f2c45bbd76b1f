use serde::{Deserialize, Serialize};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// Relational backend holding the backup table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DbBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DbBackend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

fn default_db_name() -> String {
    "default_db".into()
}

fn default_db_user() -> String {
    "default_user".into()
}

fn default_db_host() -> String {
    "localhost".into()
}

fn default_db_port() -> u16 {
    5432
}

fn default_sqlite_path() -> String {
    "data/tether.db".into()
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DbBackend,
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DbBackend::default(),
            name: default_db_name(),
            user: default_db_user(),
            host: default_db_host(),
            port: default_db_port(),
            sqlite_path: default_sqlite_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_vector_host() -> String {
    "localhost".into()
}

fn default_vector_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_vector_host")]
    pub host: String,
    #[serde(default = "default_vector_port")]
    pub port: u16,
    #[serde(default)]
    pub use_ssl: bool,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            host: default_vector_host(),
            port: default_vector_port(),
            use_ssl: false,
        }
    }
}

/// How the restore destination is named when recovery runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryNaming {
    /// Always restore into `recovery_collection`.
    #[default]
    Fixed,
    /// Restore into `<recovery_collection>_<UTC timestamp>`, one per attempt.
    Timestamped,
}

fn default_source_collection() -> String {
    "my_collection".into()
}

fn default_backup_table() -> String {
    "chroma_data".into()
}

fn default_recovery_collection() -> String {
    "imported_collection".into()
}

fn default_import_batch_size() -> usize {
    500
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    #[serde(default = "default_source_collection")]
    pub source_collection: String,
    #[serde(default = "default_backup_table")]
    pub backup_table: String,
    #[serde(default = "default_recovery_collection")]
    pub recovery_collection: String,
    #[serde(default)]
    pub recovery_naming: RecoveryNaming,
    #[serde(default = "default_import_batch_size")]
    pub import_batch_size: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            source_collection: default_source_collection(),
            backup_table: default_backup_table(),
            recovery_collection: default_recovery_collection(),
            recovery_naming: RecoveryNaming::default(),
            import_batch_size: default_import_batch_size(),
        }
    }
}

fn default_export_interval() -> u64 {
    3600
}

fn default_health_interval() -> u64 {
    1200
}

fn default_shutdown_grace() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_export_interval")]
    pub export_interval_secs: u64,
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
    #[serde(default)]
    pub run_on_start: bool,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            export_interval_secs: default_export_interval(),
            health_interval_secs: default_health_interval(),
            run_on_start: false,
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

fn default_vector_store_timeout() -> u64 {
    30
}

fn default_database_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_vector_store_timeout")]
    pub vector_store_seconds: u64,
    #[serde(default = "default_database_timeout")]
    pub database_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            vector_store_seconds: default_vector_store_timeout(),
            database_seconds: default_database_timeout(),
        }
    }
}

/// Credentials resolved from the environment, never read from or written to TOML.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub db_password: Option<Secret>,
}
