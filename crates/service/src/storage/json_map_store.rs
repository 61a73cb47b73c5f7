use std::{collections::HashMap, hash::Hash, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::RwLock;

use super::{read_optional, write_atomic, StoreError, DEFAULT_IO_TIMEOUT};

/// Generic JSON file-backed key-value map store.
///
/// Keeps a `HashMap<K, V>` in memory and writes the whole map back to its JSON
/// file after every mutation. The write lock is held until the file is
/// replaced, so the on-disk order of writes matches the in-memory order.
#[derive(Clone)]
pub struct JsonMapStore<K, V> {
    inner: Arc<RwLock<HashMap<K, V>>>,
    file_path: PathBuf,
    io_timeout: Duration,
}

impl<K, V> JsonMapStore<K, V>
where
    K: Eq + Hash + serde::Serialize + serde::de::DeserializeOwned + Clone,
    V: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    /// Initialize the store from a path. Creates the file with an empty map if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StoreError> {
        Self::with_io_timeout(path, DEFAULT_IO_TIMEOUT).await
    }

    /// Same as [`JsonMapStore::new`] with an explicit bound on each file operation.
    pub async fn with_io_timeout<P: Into<PathBuf>>(path: P, io_timeout: Duration) -> Result<Arc<Self>, StoreError> {
        let file_path = path.into();

        let map: HashMap<K, V> = match read_optional(&file_path, io_timeout).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: file_path.clone(),
                reason: e.to_string(),
            })?,
            None => {
                let empty: HashMap<K, V> = HashMap::new();
                write_atomic(&file_path, &serde_json::to_vec(&empty)?, io_timeout).await?;
                empty
            }
        };

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(map)), file_path, io_timeout }))
    }

    async fn save(&self, map: &HashMap<K, V>) -> Result<(), StoreError> {
        let data = serde_json::to_vec(map)?;
        write_atomic(&self.file_path, &data, self.io_timeout).await
    }

    /// List all entries as `(key, value)` pairs.
    pub async fn list(&self) -> Vec<(K, V)> {
        let map = self.inner.read().await;
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Get value by key.
    pub async fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().await;
        map.get(key).cloned()
    }

    /// Insert only when `key` is absent; returns whether the value was stored.
    /// The check and the insert happen under one write lock.
    pub async fn insert_new(&self, key: K, value: V) -> Result<bool, StoreError> {
        let mut map = self.inner.write().await;
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key.clone(), value);
        if let Err(e) = self.save(&map).await {
            map.remove(&key);
            return Err(e);
        }
        Ok(true)
    }
}
