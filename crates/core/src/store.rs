use async_trait::async_trait;

use crate::conversation::VarMap;
use crate::errors::PersistenceError;
use crate::events::ConversationKey;

/// Canonical storage key for conversation state, `user:channel`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StateKey(String);

impl StateKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn for_conversation(key: &ConversationKey) -> Self {
        Self(format!("{}:{}", key.user_id, key.channel_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persistence seam the runtime checkpoints captured variables through.
/// Implementations live outside this crate; failures are reported to the
/// caller as-is, the runtime never retries them.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn put(&self, key: &StateKey, vars: &VarMap) -> Result<(), PersistenceError>;
    async fn get(&self, key: &StateKey) -> Result<Option<VarMap>, PersistenceError>;
    async fn delete(&self, key: &StateKey) -> Result<(), PersistenceError>;
}
