use super::{Config, DbBackend, RecoveryNaming};
use crate::secret::Secret;

/// Environment variables that override configuration fields.
pub const ENV_KEYS: [&str; 23] = [
    "DB_NAME",
    "DB_USER",
    "DB_PASSWORD",
    "DB_HOST",
    "DB_PORT",
    "CHROMA_COLLECTION_NAME",
    "BACKUP_TABLE",
    "NEW_COLLECTION_NAME",
    "CHROMADB_HOST",
    "CHROMADB_PORT",
    "CHROMADB_USE_SSL",
    "TETHER_DB_BACKEND",
    "TETHER_SQLITE_PATH",
    "TETHER_DB_MAX_CONNECTIONS",
    "TETHER_EXPORT_INTERVAL_SECS",
    "TETHER_HEALTH_INTERVAL_SECS",
    "TETHER_RUN_ON_START",
    "TETHER_SHUTDOWN_GRACE_SECS",
    "TETHER_RECOVERY_NAMING",
    "TETHER_IMPORT_BATCH_SIZE",
    "TETHER_TIMEOUT_VECTOR_STORE",
    "TETHER_TIMEOUT_DATABASE",
    "TETHER_CONFIG",
];

/// `true`, `1` or `yes` in any case.
pub(crate) fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_connections();
        self.apply_env_overrides_mirror();
        self.apply_env_overrides_scheduler();
    }

    fn apply_env_overrides_connections(&mut self) {
        if let Ok(v) = std::env::var("DB_NAME") {
            self.database.name = v;
        }
        if let Ok(v) = std::env::var("DB_USER") {
            self.database.user = v;
        }
        if let Ok(v) = std::env::var("DB_PASSWORD") {
            self.secrets.db_password = Some(Secret::new(v));
        }
        if let Ok(v) = std::env::var("DB_HOST") {
            self.database.host = v;
        }
        if let Ok(v) = std::env::var("DB_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.database.port = port;
            } else {
                tracing::warn!("ignoring invalid DB_PORT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("TETHER_DB_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "postgres" => self.database.backend = DbBackend::Postgres,
                "sqlite" => self.database.backend = DbBackend::Sqlite,
                _ => tracing::warn!("ignoring invalid TETHER_DB_BACKEND value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("TETHER_SQLITE_PATH") {
            self.database.sqlite_path = v;
        }
        if let Ok(v) = std::env::var("TETHER_DB_MAX_CONNECTIONS") {
            if let Ok(n) = v.parse::<u32>() {
                self.database.max_connections = n;
            } else {
                tracing::warn!("ignoring invalid TETHER_DB_MAX_CONNECTIONS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("CHROMADB_HOST") {
            self.vector_store.host = v;
        }
        if let Ok(v) = std::env::var("CHROMADB_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.vector_store.port = port;
            } else {
                tracing::warn!("ignoring invalid CHROMADB_PORT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("CHROMADB_USE_SSL") {
            self.vector_store.use_ssl = parse_flag(&v);
        }
        if let Ok(v) = std::env::var("TETHER_TIMEOUT_VECTOR_STORE") {
            if let Ok(secs) = v.parse::<u64>() {
                self.timeouts.vector_store_seconds = secs;
            } else {
                tracing::warn!("ignoring invalid TETHER_TIMEOUT_VECTOR_STORE value: {v}");
            }
        }
        if let Ok(v) = std::env::var("TETHER_TIMEOUT_DATABASE") {
            if let Ok(secs) = v.parse::<u64>() {
                self.timeouts.database_seconds = secs;
            } else {
                tracing::warn!("ignoring invalid TETHER_TIMEOUT_DATABASE value: {v}");
            }
        }
    }

    fn apply_env_overrides_mirror(&mut self) {
        if let Ok(v) = std::env::var("CHROMA_COLLECTION_NAME") {
            self.mirror.source_collection = v;
        }
        if let Ok(v) = std::env::var("BACKUP_TABLE") {
            self.mirror.backup_table = v;
        }
        if let Ok(v) = std::env::var("NEW_COLLECTION_NAME") {
            self.mirror.recovery_collection = v;
        }
        if let Ok(v) = std::env::var("TETHER_RECOVERY_NAMING") {
            match v.to_ascii_lowercase().as_str() {
                "fixed" => self.mirror.recovery_naming = RecoveryNaming::Fixed,
                "timestamped" => self.mirror.recovery_naming = RecoveryNaming::Timestamped,
                _ => tracing::warn!("ignoring invalid TETHER_RECOVERY_NAMING value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("TETHER_IMPORT_BATCH_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                self.mirror.import_batch_size = n;
            } else {
                tracing::warn!("ignoring invalid TETHER_IMPORT_BATCH_SIZE value: {v}");
            }
        }
    }

    fn apply_env_overrides_scheduler(&mut self) {
        if let Ok(v) = std::env::var("TETHER_EXPORT_INTERVAL_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.scheduler.export_interval_secs = secs;
            } else {
                tracing::warn!("ignoring invalid TETHER_EXPORT_INTERVAL_SECS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("TETHER_HEALTH_INTERVAL_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.scheduler.health_interval_secs = secs;
            } else {
                tracing::warn!("ignoring invalid TETHER_HEALTH_INTERVAL_SECS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("TETHER_RUN_ON_START") {
            self.scheduler.run_on_start = parse_flag(&v);
        }
        if let Ok(v) = std::env::var("TETHER_SHUTDOWN_GRACE_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.scheduler.shutdown_grace_secs = secs;
            } else {
                tracing::warn!("ignoring invalid TETHER_SHUTDOWN_GRACE_SECS value: {v}");
            }
        }
    }
}
