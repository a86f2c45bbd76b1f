use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use super::{BackupStore, RecordRow, TableName, record_from_row};
use crate::error::BackupStoreError;
use crate::types::BackupRecord;
use crate::vector_store::BoxFuture;

/// Rows per multi-row INSERT (4 bind parameters each, limit is 65535).
const UPSERT_CHUNK: usize = 1000;

/// Connection target for [`PgBackupStore`].
#[derive(Clone)]
pub struct PgConnectSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl std::fmt::Debug for PgConnectSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnectSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

impl PgConnectSettings {
    fn connect_options(&self) -> PgConnectOptions {
        let opts = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database)
            .application_name("tether");
        match &self.password {
            Some(pw) => opts.password(pw),
            None => opts,
        }
    }
}

/// Backup table stored in `PostgreSQL`, with `JSON` embedding and metadata columns.
///
/// `JSON` keeps the encoded text verbatim; `JSONB` would renormalise numbers
/// and turn integral floats such as `1e16` into integers.
#[derive(Debug, Clone)]
pub struct PgBackupStore {
    pool: PgPool,
}

impl PgBackupStore {
    /// Connect to the configured database.
    ///
    /// Establishes one connection up front so an unreachable server, bad
    /// credentials or a missing database fail here rather than on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BackupStoreError::Connection`] if the connection cannot be made.
    pub async fn connect(settings: &PgConnectSettings) -> Result<Self, BackupStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(settings.connect_options())
            .await
            .map_err(BackupStoreError::Connection)?;
        tracing::debug!(
            host = %settings.host,
            database = %settings.database,
            "connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn create_table(conn: &mut PgConnection, table: &TableName) -> Result<(), BackupStoreError> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            embedding JSON,
            metadata JSON,
            document TEXT
        )",
        table.quoted()
    ))
    .execute(conn)
    .await?;
    Ok(())
}

impl BackupStore for PgBackupStore {
    fn ping(&self) -> BoxFuture<'_, Result<(), BackupStoreError>> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }

    fn ensure_table<'a>(
        &'a self,
        table: &'a TableName,
    ) -> BoxFuture<'a, Result<(), BackupStoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await?;
            create_table(&mut conn, table).await
        })
    }

    fn upsert_records<'a>(
        &'a self,
        table: &'a TableName,
        records: &'a [BackupRecord],
    ) -> BoxFuture<'a, Result<u64, BackupStoreError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            create_table(&mut tx, table).await?;

            let mut written = 0;
            for chunk in records.chunks(UPSERT_CHUNK) {
                let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                    "INSERT INTO {} (id, embedding, metadata, document) ",
                    table.quoted()
                ));
                qb.push_values(chunk, |mut row, rec| {
                    row.push_bind(rec.id.clone())
                        .push_bind(rec.embedding.clone())
                        .push_unseparated("::json")
                        .push_bind(rec.metadata.clone())
                        .push_unseparated("::json")
                        .push_bind(rec.document.clone());
                });
                qb.push(
                    " ON CONFLICT (id) DO UPDATE SET \
                     embedding = EXCLUDED.embedding, \
                     metadata = EXCLUDED.metadata, \
                     document = EXCLUDED.document",
                );
                written += qb.build().execute(&mut *tx).await?.rows_affected();
            }

            tx.commit().await?;
            Ok(written)
        })
    }

    fn fetch_records<'a>(
        &'a self,
        table: &'a TableName,
    ) -> BoxFuture<'a, Result<Vec<BackupRecord>, BackupStoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await?;
            create_table(&mut conn, table).await?;
            let rows: Vec<RecordRow> = sqlx::query_as(&format!(
                "SELECT id, embedding::text, metadata::text, document FROM {} ORDER BY id",
                table.quoted()
            ))
            .fetch_all(&mut *conn)
            .await?;
            Ok(rows.into_iter().map(record_from_row).collect())
        })
    }

    fn count<'a>(&'a self, table: &'a TableName) -> BoxFuture<'a, Result<u64, BackupStoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await?;
            create_table(&mut conn, table).await?;
            let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table.quoted()))
                .fetch_one(&mut *conn)
                .await?;
            Ok(u64::try_from(n).unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PgConnectSettings {
        PgConnectSettings {
            host: "127.0.0.1".into(),
            port: 1,
            user: "tether".into(),
            password: Some("hunter2".into()),
            database: "backups".into(),
            max_connections: 2,
            acquire_timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn debug_redacts_password() {
        let dbg = format!("{:?}", settings());
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains("hunter2"));
    }

    #[tokio::test]
    async fn connect_fails_fast_when_unreachable() {
        let err = PgBackupStore::connect(&settings()).await.unwrap_err();
        assert!(matches!(err, BackupStoreError::Connection(_)));
    }
}
