use std::collections::HashMap;

use tokio::sync::RwLock;

use huddle_core::errors::PersistenceError;
use huddle_core::{StateKey, StateStore, VarMap};

/// Process-local store. State disappears on restart; useful for tests and
/// throwaway bots.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<StateKey, VarMap>>,
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
    async fn put(&self, key: &StateKey, vars: &VarMap) -> Result<(), PersistenceError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.clone(), vars.clone());
        Ok(())
    }

    async fn get(&self, key: &StateKey) -> Result<Option<VarMap>, PersistenceError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn delete(&self, key: &StateKey) -> Result<(), PersistenceError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use huddle_core::{StateKey, StateStore, VarMap};

    use super::MemoryStateStore;

    fn sample_vars() -> VarMap {
        VarMap::from([("name".to_owned(), "Ada".to_owned())])
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = MemoryStateStore::default();
        let key = StateKey::new("U1:D1");

        assert_eq!(store.get(&key).await.expect("get"), None);

        store.put(&key, &sample_vars()).await.expect("put");
        assert_eq!(store.get(&key).await.expect("get"), Some(sample_vars()));

        store.delete(&key).await.expect("delete");
        assert_eq!(store.get(&key).await.expect("get"), None);
    }

    #[tokio::test]
    async fn put_overwrites_previous_vars() {
        let store = MemoryStateStore::default();
        let key = StateKey::new("U1:D1");

        store.put(&key, &sample_vars()).await.expect("put");
        let updated = VarMap::from([("name".to_owned(), "Grace".to_owned())]);
        store.put(&key, &updated).await.expect("put again");

        assert_eq!(store.get(&key).await.expect("get"), Some(updated));
    }
}
