use crate::core::store::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory collection, lost when the process exits.
#[derive(Default)]
pub struct MemoryCollection {
    inner: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.inner.lock().await;
        let value = entries.get(key).cloned();
        if value.is_some() {
            debug!("Store HIT for key: {key}");
        } else {
            debug!("Store MISS for key: {key}");
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut entries = self.inner.lock().await;
        debug!("Store PUT for key: {key}");
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.inner.lock().await;
        entries.remove(key);
        debug!("Store REMOVE for key: {key}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_get_put() -> Result<()> {
        let collection = MemoryCollection::new();

        // Initially, collection is empty
        assert!(collection.get("key1").await?.is_none());

        collection.put("key1", b"123".to_vec()).await?;
        assert_eq!(collection.get("key1").await?, Some(b"123".to_vec()));
        assert!(collection.get("key2").await?.is_none());

        // Overwrite
        collection.put("key1", b"456".to_vec()).await?;
        assert_eq!(collection.get("key1").await?, Some(b"456".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_remove() -> Result<()> {
        let collection = MemoryCollection::new();
        collection.put("key1", b"1".to_vec()).await?;
        collection.put("key2", b"2".to_vec()).await?;

        collection.remove("key1").await?;
        assert!(collection.get("key1").await?.is_none());
        assert!(collection.get("key2").await?.is_some());

        // Removing a missing key is not an error
        collection.remove("key1").await?;
        Ok(())
    }
}
