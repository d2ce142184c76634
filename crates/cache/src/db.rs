//! Database connection and pool management.

use exn::ResultExt;
use feedstash_config::CompactionConfig;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on open.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// The access queue is the only user of the pool, and the only writer.
const MAX_CONNECTIONS: u32 = 1;

/// Connection pool for one namespace's database file.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // This is IMPORTANT to apply the query-based PRAGMAs to EVERY
            // connection the pool opens (including reconnects), not only
            // the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        if let Err(err) = db.migrate().await {
            db.pool.close().await;
            return Err(err);
        }
        Ok(db)
    }

    /// Open the database file at the given path.
    ///
    /// Creates the file if it doesn't exist, runs migrations, and compacts
    /// the file when `compaction` says too much of it is free space. Fails
    /// when the file is not a readable database or its schema cannot be
    /// migrated.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, compaction: &CompactionConfig) -> Result<Self> {
        let options = Self::base_options().filename(path.as_ref()).create_if_missing(true);
        let db = Self::new(options).await?;
        match db.compact_if_needed(compaction).await {
            Ok(true) => tracing::info!("Compacted database"),
            Ok(false) => {},
            Err(error) => tracing::warn!(?error, "Could not compact database"),
        }
        Ok(db)
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        // The single-connection pool matters here too: parallel connections
        // would each see their own, different, in-memory database.
        Self::new(Self::base_options().filename(":memory:")).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Readers are never blocked by the writer in WAL mode.
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // No foreign keys are declared, but keep enforcement on for any
            // that get added later.
            .foreign_keys(true)
            // PRAGMA synchronous = NORMAL (balance between safety and speed)
            .synchronous(SqliteSynchronous::Normal)
            // PRAGMA busy_timeout = 1500ms
            .busy_timeout(std::time::Duration::from_millis(1500))
            // PRAGMA auto_vacuum = OFF (default, but explicit)
            // Free pages are reclaimed by compaction on open instead.
            .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::None)
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA cache_size = -4096;
                PRAGMA temp_store = MEMORY;
                PRAGMA analysis_limit = 1000;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Total and used size of the database file, in bytes.
    pub(crate) async fn size(&self) -> Result<(u64, u64)> {
        let page_count = self.pragma("PRAGMA page_count").await?;
        let page_size = self.pragma("PRAGMA page_size").await?;
        let freelist_count = self.pragma("PRAGMA freelist_count").await?;
        let total = page_count.saturating_mul(page_size);
        let used = page_count.saturating_sub(freelist_count).saturating_mul(page_size);
        Ok((total, used))
    }

    async fn pragma(&self, pragma: &'static str) -> Result<u64> {
        let value: i64 = sqlx::query_scalar(pragma)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(value).or_raise(|| ErrorKind::InvalidData("page statistics"))
    }

    /// Rebuild the file without its free pages if `policy` asks for it.
    ///
    /// Returns whether the database was compacted.
    #[instrument("compacting database", skip_all)]
    async fn compact_if_needed(&self, policy: &CompactionConfig) -> Result<bool> {
        let (total, used) = self.size().await?;
        if !policy.should_compact(total, used) {
            return Ok(false);
        }
        tracing::debug!(total, used, "Reclaiming free pages");
        sqlx::query("VACUUM").execute(&self.pool).await.or_raise(|| ErrorKind::Database)?;
        Ok(true)
    }

    /// Get a reference to the underlying connection pool.
    ///
    /// This is useful for running custom queries or transactions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// This waits for all connections to be returned to the pool and then
    /// closes them. After calling this, the Database instance should not
    /// be used.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEVER: CompactionConfig = CompactionConfig { threshold_bytes: u64::MAX, min_used_ratio: 0.0 };
    const ALWAYS: CompactionConfig = CompactionConfig { threshold_bytes: 0, min_used_ratio: 1.0 };

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(!db.pool().is_closed());
        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        // Running migrate again should succeed (already applied)
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_pragmas_are_applied() {
        let db = Database::connect_in_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("PRAGMA foreign_keys").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 1, "foreign_keys should be ON");
        let row: (i64,) = sqlx::query_as("PRAGMA wal_autocheckpoint").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 800, "WAL checkpoint should be 800");
        db.close().await;
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_1.sqlite");
        let db = Database::open(&path, &NEVER).await.unwrap();
        assert!(path.is_file());
        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(tables, ["authors", "media", "posts", "sync_watermarks", "terms"]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_open_rejects_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_1.sqlite");
        std::fs::write(&path, vec![0xA5; 4096]).unwrap();
        let err = Database::open(&path, &NEVER).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database | ErrorKind::Migration));
    }

    #[tokio::test]
    async fn test_open_rejects_unmigratable_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_1.sqlite");
        let db = Database::open(&path, &NEVER).await.unwrap();
        // Pretend the applied migration differs from the embedded one.
        sqlx::query("UPDATE _sqlx_migrations SET checksum = x'00'").execute(db.pool()).await.unwrap();
        db.close().await;
        let err = Database::open(&path, &NEVER).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Migration));
    }

    #[tokio::test]
    async fn test_compaction_reclaims_free_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_1.sqlite");
        let db = Database::open(&path, &NEVER).await.unwrap();
        let filler = "x".repeat(4096);
        for id in 0..64_i64 {
            sqlx::query("INSERT INTO posts (id, content) VALUES (?, ?)")
                .bind(id)
                .bind(&filler)
                .execute(db.pool())
                .await
                .unwrap();
        }
        sqlx::query("DELETE FROM posts").execute(db.pool()).await.unwrap();
        let (total, used) = db.size().await.unwrap();
        assert!(used < total, "deleting rows should leave free pages");
        db.close().await;

        // Policy says no: free pages stay.
        let db = Database::open(&path, &NEVER).await.unwrap();
        let (total, used) = db.size().await.unwrap();
        assert!(used < total);
        db.close().await;

        let db = Database::open(&path, &ALWAYS).await.unwrap();
        let (total, used) = db.size().await.unwrap();
        assert_eq!(used, total);
        db.close().await;
    }
}
