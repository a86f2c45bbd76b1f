use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::{BackupStore, RecordRow, TableName, record_from_row};
use crate::error::BackupStoreError;
use crate::types::BackupRecord;
use crate::vector_store::BoxFuture;

/// Rows per multi-row INSERT; keeps bind parameters well under SQLite's limit.
const UPSERT_CHUNK: usize = 200;

/// Backup table stored in a local `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteBackupStore {
    pool: SqlitePool,
}

impl SqliteBackupStore {
    /// Open (or create) the `SQLite` database at `path`.
    ///
    /// `":memory:"` opens a private in-memory database backed by a single
    /// connection that is never reaped for idleness or age.
    ///
    /// # Errors
    ///
    /// Returns [`BackupStoreError::Connection`] if the database cannot be opened.
    pub async fn open(
        path: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, BackupStoreError> {
        let in_memory = path == ":memory:";
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let mut opts = SqliteConnectOptions::from_str(&url)
            .map_err(BackupStoreError::Connection)?
            .create_if_missing(true);
        if !in_memory {
            opts = opts
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        let pool_opts = SqlitePoolOptions::new().acquire_timeout(acquire_timeout);
        let pool_opts = if in_memory {
            // The database lives only as long as its one connection.
            pool_opts
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_opts.max_connections(max_connections)
        };

        let pool = pool_opts
            .connect_with(opts)
            .await
            .map_err(BackupStoreError::Connection)?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn create_table(
    conn: &mut SqliteConnection,
    table: &TableName,
) -> Result<(), BackupStoreError> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            embedding TEXT,
            metadata TEXT,
            document TEXT
        )",
        table.quoted()
    ))
    .execute(conn)
    .await?;
    Ok(())
}

impl BackupStore for SqliteBackupStore {
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
                let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                    "INSERT INTO {} (id, embedding, metadata, document) ",
                    table.quoted()
                ));
                qb.push_values(chunk, |mut row, rec| {
                    row.push_bind(rec.id.clone())
                        .push_bind(rec.embedding.clone())
                        .push_bind(rec.metadata.clone())
                        .push_bind(rec.document.clone());
                });
                qb.push(
                    " ON CONFLICT(id) DO UPDATE SET \
                     embedding = excluded.embedding, \
                     metadata = excluded.metadata, \
                     document = excluded.document",
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
                "SELECT id, embedding, metadata, document FROM {} ORDER BY id",
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
    use tempfile::NamedTempFile;

    use super::*;

    async fn memory_store() -> SqliteBackupStore {
        SqliteBackupStore::open(":memory:", 5, Duration::from_secs(5))
            .await
            .unwrap()
    }

    fn table() -> TableName {
        TableName::parse("chroma_data").unwrap()
    }

    fn rec(id: &str, embedding: &str) -> BackupRecord {
        BackupRecord {
            id: id.into(),
            embedding: Some(embedding.into()),
            metadata: None,
            document: None,
        }
    }

    #[tokio::test]
    async fn ensure_table_is_idempotent() {
        let store = memory_store().await;
        store.ensure_table(&table()).await.unwrap();
        store.ensure_table(&table()).await.unwrap();
        assert_eq!(store.count(&table()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fetch_from_missing_table_is_empty() {
        let store = memory_store().await;
        assert!(store.fetch_records(&table()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_then_fetch_ordered() {
        let store = memory_store().await;
        let records = vec![rec("c", "[0.5]"), rec("a", "[0.1]"), rec("b", "[0.3]")];
        let written = store.upsert_records(&table(), &records).await.unwrap();
        assert_eq!(written, 3);

        let fetched = store.fetch_records(&table()).await.unwrap();
        let ids: Vec<_> = fetched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(fetched[0].embedding.as_deref(), Some("[0.1]"));
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_rows() {
        let store = memory_store().await;
        store
            .upsert_records(&table(), &[rec("a", "[0.1]")])
            .await
            .unwrap();
        let mut updated = rec("a", "[0.9]");
        updated.document = Some("new".into());
        store.upsert_records(&table(), &[updated]).await.unwrap();

        let fetched = store.fetch_records(&table()).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].embedding.as_deref(), Some("[0.9]"));
        assert_eq!(fetched[0].document.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn upsert_spans_multiple_chunks() {
        let store = memory_store().await;
        let records: Vec<_> = (0..(UPSERT_CHUNK * 2 + 7))
            .map(|i| rec(&format!("id{i:05}"), "[1.0]"))
            .collect();
        store.upsert_records(&table(), &records).await.unwrap();
        assert_eq!(store.count(&table()).await.unwrap(), records.len() as u64);
    }

    #[tokio::test]
    async fn failed_upsert_rolls_back() {
        let store = memory_store().await;
        store
            .upsert_records(&table(), &[rec("keep", "[1.0]")])
            .await
            .unwrap();

        sqlx::query(
            "CREATE TRIGGER reject_bad BEFORE INSERT ON chroma_data \
             WHEN NEW.id = 'bad' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let records: Vec<_> = (0..UPSERT_CHUNK)
            .map(|i| rec(&format!("ok{i:04}"), "[1.0]"))
            .chain(std::iter::once(rec("bad", "[1.0]")))
            .collect();
        assert!(store.upsert_records(&table(), &records).await.is_err());

        let fetched = store.fetch_records(&table()).await.unwrap();
        assert_eq!(fetched.len(), 1, "first chunk must be rolled back");
        assert_eq!(fetched[0].id, "keep");
    }

    #[tokio::test]
    async fn ping_ok() {
        assert!(memory_store().await.ping().await.is_ok());
    }

    #[tokio::test]
    async fn wal_journal_mode_enabled_on_file_db() {
        let file = NamedTempFile::new().expect("tempfile");
        let path = file.path().to_str().expect("valid path");

        let store = SqliteBackupStore::open(path, 5, Duration::from_secs(5))
            .await
            .expect("open");

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(store.pool())
            .await
            .expect("PRAGMA query");

        assert_eq!(mode, "wal", "expected WAL journal mode, got: {mode}");
    }

    #[tokio::test]
    async fn file_db_persists_across_reopen() {
        let file = NamedTempFile::new().expect("tempfile");
        let path = file.path().to_str().expect("valid path");

        {
            let store = SqliteBackupStore::open(path, 2, Duration::from_secs(5))
                .await
                .unwrap();
            store
                .upsert_records(&table(), &[rec("a", "[0.1]")])
                .await
                .unwrap();
            store.pool().close().await;
        }

        let store = SqliteBackupStore::open(path, 2, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(store.count(&table()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn in_memory_connection_is_never_reaped() {
        let store = memory_store().await;
        store
            .upsert_records(&table(), &[rec("a", "[0.1]")])
            .await
            .unwrap();

        let opts = store.pool().options();
        assert_eq!(opts.get_max_connections(), 1);
        assert_eq!(opts.get_min_connections(), 1);
        assert!(opts.get_idle_timeout().is_none());
        assert!(opts.get_max_lifetime().is_none());
        assert_eq!(store.count(&table()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn file_pool_keeps_reaping_defaults() {
        let file = NamedTempFile::new().expect("tempfile");
        let path = file.path().to_str().expect("valid path");
        let store = SqliteBackupStore::open(path, 3, Duration::from_secs(5))
            .await
            .unwrap();

        let opts = store.pool().options();
        assert_eq!(opts.get_max_connections(), 3);
        assert!(opts.get_idle_timeout().is_some());
    }
}
