mod env;
mod types;


pub use env::ENV_KEYS;
pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};
use tether_store::TableName;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject settings the mirror cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scheduler.export_interval_secs == 0 {
            bail!("scheduler.export_interval_secs must be greater than 0");
        }
        if self.scheduler.health_interval_secs == 0 {
            bail!("scheduler.health_interval_secs must be greater than 0");
        }
        if self.mirror.import_batch_size == 0 {
            bail!("mirror.import_batch_size must be greater than 0");
        }
        if self.timeouts.vector_store_seconds == 0 {
            bail!("timeouts.vector_store_seconds must be greater than 0");
        }
        if self.timeouts.database_seconds == 0 {
            bail!("timeouts.database_seconds must be greater than 0");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be greater than 0");
        }
        if self.mirror.source_collection.trim().is_empty() {
            bail!("mirror.source_collection must not be empty");
        }
        if self.mirror.recovery_collection.trim().is_empty() {
            bail!("mirror.recovery_collection must not be empty");
        }
        if self.mirror.recovery_collection == self.mirror.source_collection {
            bail!(
                "mirror.recovery_collection must differ from mirror.source_collection ({})",
                self.mirror.source_collection
            );
        }
        TableName::parse(&self.mirror.backup_table).context("mirror.backup_table")?;
        Ok(())
    }

    /// Effective configuration as TOML. Secrets are never included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}
