//! Connection registry mapping update module identifiers to live connections.

use crate::controller::handle::ClientHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Identifier → handle table shared by session tasks and the dispatcher.
///
/// All access goes through one lock; lookups hand out an `Arc` so no caller
/// holds the lock while writing to a connection.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: RwLock<HashMap<String, Arc<ClientHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `id` with `handle`, returning the handle it displaced.
    pub async fn put(&self, id: &str, handle: Arc<ClientHandle>) -> Option<Arc<ClientHandle>> {
        let mut clients = self.clients.write().await;
        clients.insert(id.to_string(), handle)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ClientHandle>> {
        let clients = self.clients.read().await;
        clients.get(id).cloned()
    }

    /// Removes the entry for `id` if present.
    pub async fn remove(&self, id: &str) -> Option<Arc<ClientHandle>> {
        let mut clients = self.clients.write().await;
        clients.remove(id)
    }

    /// Removes the entry for `id` only if it still points at connection `conn_id`.
    ///
    /// Returns true if an entry was removed.
    pub async fn remove_if_owned(&self, id: &str, conn_id: u64) -> bool {
        let mut clients = self.clients.write().await;
        match clients.get(id) {
            Some(handle) if handle.conn_id() == conn_id => {
                clients.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Registered identifiers, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let clients = self.clients.read().await;
        let mut ids: Vec<String> = clients.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn handle(conn_id: u64) -> Arc<ClientHandle> {
        Arc::new(ClientHandle::new(conn_id, "test", tokio::io::sink()))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let registry = ConnectionRegistry::new();
        assert!(registry.put("um1", handle(1)).await.is_none());

        let found = registry.get("um1").await.unwrap();
        assert_eq!(found.conn_id(), 1);
        assert!(registry.get("um2").await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_and_returns_previous() {
        let registry = ConnectionRegistry::new();
        registry.put("um1", handle(1)).await;

        let previous = registry.put("um1", handle(2)).await.unwrap();
        assert_eq!(previous.conn_id(), 1);
        assert_eq!(registry.remove("um1").await.unwrap().conn_id(), 2);
        registry.put("um1", handle(2)).await;
        assert_eq!(registry.get("um1").await.unwrap().conn_id(), 2);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(registry.remove("ghost").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_if_owned_keeps_newer_owner() {
        let registry = ConnectionRegistry::new();
        registry.put("um1", handle(1)).await;
        registry.put("um1", handle(2)).await;

        // The first connection going away must not evict the second.
        assert!(!registry.remove_if_owned("um1", 1).await);
        assert_eq!(registry.get("um1").await.unwrap().conn_id(), 2);

        assert!(registry.remove_if_owned("um1", 2).await);
        assert!(registry.get("um1").await.is_none());
    }

    #[tokio::test]
    async fn test_ids_sorted() {
        let registry = ConnectionRegistry::new();
        registry.put("um3", handle(3)).await;
        registry.put("um1", handle(1)).await;
        registry.put("um2", handle(2)).await;

        assert_eq!(registry.ids().await, vec!["um1", "um2", "um3"]);
    }

    #[tokio::test]
    async fn test_concurrent_puts() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();

        for i in 0..32u64 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry.put(&format!("um{}", i), handle(i)).await;
                registry.get(&format!("um{}", i)).await.map(|h| h.conn_id())
            }));
        }

        for (i, task) in tasks.into_iter().enumerate() {
            assert_eq!(task.await.unwrap(), Some(i as u64));
        }
        assert_eq!(registry.len().await, 32);
    }

    proptest! {
        #[test]
        fn prop_last_writer_wins(writes in prop::collection::vec((0usize..4, 0u64..1000), 1..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let registry = ConnectionRegistry::new();
                let mut expected = HashMap::new();

                for (key, conn_id) in &writes {
                    let id = format!("um{}", key);
                    registry.put(&id, handle(*conn_id)).await;
                    expected.insert(id.clone(), *conn_id);
                    prop_assert_eq!(registry.get(&id).await.map(|h| h.conn_id()), Some(*conn_id));
                }

                for (id, conn_id) in &expected {
                    prop_assert_eq!(registry.get(id).await.map(|h| h.conn_id()), Some(*conn_id));
                }
                prop_assert_eq!(registry.len().await, expected.len());
                Ok(())
            })?;
        }
    }
}
