//! State store implementations behind `huddle_core::StateStore`: an
//! in-memory map for tests and single-process bots, a JSON-file directory,
//! and a sqlite backend with managed migrations.

use std::sync::Arc;

use thiserror::Error;

use huddle_core::config::{StorageBackend, StorageConfig};
use huddle_core::StateStore;

pub mod connection;
pub mod file;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use connection::{connect, DbPool};
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not connect to `{url}`: {source}")]
    Connect { url: String, source: sqlx::Error },
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Builds the configured backend, connecting and migrating when needed.
pub async fn from_config(storage: &StorageConfig) -> Result<Arc<dyn StateStore>, StoreError> {
    match storage.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStateStore::default())),
        StorageBackend::File => Ok(Arc::new(FileStateStore::new(&storage.url))),
        StorageBackend::Sqlite => {
            let pool = connect(storage)
                .await
                .map_err(|source| StoreError::Connect { url: storage.url.clone(), source })?;
            migrations::run_pending(&pool).await?;
            Ok(Arc::new(SqliteStateStore::new(pool)))
        }
    }
}
