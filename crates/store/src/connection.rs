use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use huddle_core::config::StorageConfig;

pub type DbPool = sqlx::SqlitePool;

/// Opens the pool described by the storage section. Every pooled
/// connection gets the same PRAGMA setup; WAL keeps concurrent readers
/// out of the writers' way and the busy timeout absorbs lock contention.
pub async fn connect(storage: &StorageConfig) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(storage.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(storage.timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&storage.url)
        .await
}
