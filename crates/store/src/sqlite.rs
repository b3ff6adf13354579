use sqlx::Row;

use huddle_core::errors::PersistenceError;
use huddle_core::{StateKey, StateStore, VarMap};

use crate::DbPool;

/// Sqlite-backed store; vars are kept as a JSON column keyed by the
/// flattened state key.
pub struct SqliteStateStore {
    pool: DbPool,
}

impl SqliteStateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StateStore for SqliteStateStore {
    async fn put(&self, key: &StateKey, vars: &VarMap) -> Result<(), PersistenceError> {
        let body = serde_json::to_string(vars)
            .map_err(|err| PersistenceError::Write(err.to_string()))?;
        sqlx::query(
            "INSERT INTO conversation_state (state_key, vars, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(state_key) DO UPDATE SET
                 vars = excluded.vars,
                 updated_at = excluded.updated_at",
        )
        .bind(key.as_str())
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|err| PersistenceError::Write(err.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &StateKey) -> Result<Option<VarMap>, PersistenceError> {
        let row = sqlx::query("SELECT vars FROM conversation_state WHERE state_key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| PersistenceError::Read(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw = row.get::<String, _>("vars");
        serde_json::from_str(&raw).map(Some).map_err(|err| PersistenceError::Read(err.to_string()))
    }

    async fn delete(&self, key: &StateKey) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM conversation_state WHERE state_key = ?1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| PersistenceError::Write(err.to_string()))?;
        Ok(())
    }
}
