use crate::core::store::KeyValueCollection;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use std::sync::Arc;
use tracing::debug;

/// Collection backed by a fjall partition; writes are synced to disk.
pub struct DiskCollection {
    keyspace: Arc<Keyspace>,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Arc<Keyspace>, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn sync(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist store")
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .partition
            .get(key)
            .with_context(|| format!("Failed to read key: {key}"))?;
        if value.is_some() {
            debug!("Store HIT for key: {key}");
        } else {
            debug!("Store MISS for key: {key}");
        }
        Ok(value.map(|slice| slice.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.partition
            .insert(key, value)
            .with_context(|| format!("Failed to write key: {key}"))?;
        debug!("Store PUT for key: {key}");
        self.sync()
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.partition
            .remove(key)
            .with_context(|| format!("Failed to remove key: {key}"))?;
        debug!("Store REMOVE for key: {key}");
        self.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::PartitionCreateOptions;
    use tempfile::tempdir;

    fn open(path: &std::path::Path) -> DiskCollection {
        let keyspace = Arc::new(fjall::Config::new(path).open().unwrap());
        let partition = keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap();
        DiskCollection::new(keyspace, partition)
    }

    #[tokio::test]
    async fn test_disk_get_put_remove() -> Result<()> {
        let dir = tempdir()?;
        let collection = open(dir.path());

        assert!(collection.get("key1").await?.is_none());
        collection.put("key1", b"123".to_vec()).await?;
        assert_eq!(collection.get("key1").await?, Some(b"123".to_vec()));

        collection.remove("key1").await?;
        assert!(collection.get("key1").await?.is_none());
        Ok(())
    }
}
