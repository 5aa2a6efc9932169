pub mod disk;
pub mod memory;

use crate::core::store::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

/// A thread-safe key-value store that can hold multiple collections.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Arc<Keyspace>>,
}

impl KeyValueStore {
    /// Opens the store under `data_dir`. Persistent collections are
    /// unavailable if the keyspace cannot be opened.
    pub fn open(data_dir: &Path) -> Self {
        let keyspace = match fjall::Config::new(data_dir.join("store")).open() {
            Ok(keyspace) => Some(Arc::new(keyspace)),
            Err(e) => {
                warn!("Could not open store at {}: {e}", data_dir.display());
                None
            }
        };
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    /// A store with no disk backing; every collection lives in memory.
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    /// Returns the named collection, falling back to memory when it cannot
    /// be persisted.
    pub fn collection_or_memory(&self, name: &str) -> Arc<dyn KeyValueCollection> {
        self.get_collection(name, true).unwrap_or_else(|| {
            debug!("Using in-memory collection for {name}");
            self.get_collection(name, false)
                .unwrap_or_else(|| Arc::new(MemoryCollection::new()))
        })
    }

    fn create(&self, name: &str, persist: bool) -> Option<Arc<dyn KeyValueCollection>> {
        if !persist {
            return Some(Arc::new(MemoryCollection::new()));
        }
        let keyspace = self.keyspace.as_ref()?;
        match keyspace.open_partition(name, PartitionCreateOptions::default()) {
            Ok(partition) => Some(Arc::new(DiskCollection::new(Arc::clone(keyspace), partition))),
            Err(e) => {
                warn!("Could not open partition {name}: {e}");
                None
            }
        }
    }
}

impl Store for KeyValueStore {
    fn get_collection(&self, name: &str, persist: bool) -> Option<Arc<dyn KeyValueCollection>> {
        let key = format!("{name}:{persist}");
        if let Some(existing) = self.collections.read().ok()?.get(&key) {
            return Some(Arc::clone(existing));
        }

        let mut collections = self.collections.write().ok()?;
        if let Some(existing) = collections.get(&key) {
            return Some(Arc::clone(existing));
        }
        let collection = self.create(name, persist)?;
        collections.insert(key, Arc::clone(&collection));
        Some(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_collections_are_shared_by_name() -> Result<()> {
        let dir = tempdir()?;
        let store = KeyValueStore::open(dir.path());

        let first = store.get_collection("session", true).unwrap();
        first.put("key", b"value".to_vec()).await?;

        let second = store.get_collection("session", true).unwrap();
        assert_eq!(second.get("key").await?, Some(b"value".to_vec()));

        // The in-memory collection of the same name is separate
        let memory = store.get_collection("session", false).unwrap();
        assert!(memory.get("key").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_in_memory_store_has_no_persistent_collections() -> Result<()> {
        let store = KeyValueStore::in_memory();
        assert!(store.get_collection("session", true).is_none());

        let fallback = store.collection_or_memory("session");
        fallback.put("key", b"value".to_vec()).await?;
        let again = store.collection_or_memory("session");
        assert_eq!(again.get("key").await?, Some(b"value".to_vec()));
        Ok(())
    }
}
