//! Distributed key/value store contract and the in-process implementation.
//!
//! The cache behaviors only ever talk to [`DistributedStore`]; production deployments
//! plug a networked store in behind it. [`MemoryStore`] is the process-local backend
//! used by default and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::Result;

/// Byte-oriented store shared by every concurrent pipeline invocation.
///
/// Entries expire once they have not been read for their sliding expiration.
#[async_trait]
pub trait DistributedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8], sliding_expiration: Duration) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
struct StoreEntry {
    data: Vec<u8>,
    sliding: Duration,
    last_accessed: Instant,
}

impl StoreEntry {
    fn new(data: Vec<u8>, sliding: Duration) -> Self {
        Self {
            data,
            sliding,
            last_accessed: Instant::now(),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_accessed) >= self.sliding
    }
}

/// In-process store with sliding expiration and a bounded entry count.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoreEntry>>,
    max_entries: usize,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn evict_if_needed(&self, entries: &mut HashMap<String, StoreEntry>, incoming: &str) {
        let now = Instant::now();
        entries.retain(|_, e| !e.is_expired(now));
        if entries.contains_key(incoming) {
            return;
        }
        while entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    tracing::debug!(key = %k, "evicting least recently accessed entry");
                    entries.remove(&k);
                }
                None => break,
            }
        }
    }

    /// Live entries, without refreshing their expiration.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether `key` is live, without refreshing its expiration.
    pub async fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .map(|e| !e.is_expired(now))
            .unwrap_or(false)
    }

    /// Remaining lifetime of `key` if it is not read again.
    pub async fn time_to_live(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries.read().await.get(key).and_then(|e| {
            let deadline = e.last_accessed + e.sliding;
            (deadline > now).then(|| deadline - now)
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl DistributedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if let Some(entry) = entries.get_mut(key) {
            if entry.is_expired(now) {
                entries.remove(key);
                return Ok(None);
            }
            entry.last_accessed = now;
            return Ok(Some(entry.data.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], sliding_expiration: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        self.evict_if_needed(&mut entries, key);
        entries.insert(
            key.to_string(),
            StoreEntry::new(value.to_vec(), sliding_expiration),
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips_bytes() {
        let store = MemoryStore::new(8);
        store
            .set("k", b"value", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"value".to_vec()));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reads_slide_the_expiration() {
        let store = MemoryStore::new(8);
        store.set("k", b"v", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.get("k").await.unwrap().is_some());

        // 16s after the write, but only 8s after the last read
        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_least_recently_accessed_when_full() {
        let store = MemoryStore::new(2);
        store.set("a", b"1", Duration::from_secs(60)).await.unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        store.set("b", b"2", Duration::from_secs(60)).await.unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        store.get("a").await.unwrap();
        store.set("c", b"3", Duration::from_secs(60)).await.unwrap();

        assert!(store.contains_key("a").await);
        assert!(!store.contains_key("b").await);
        assert!(store.contains_key("c").await);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn overwriting_a_key_does_not_evict_others() {
        let store = MemoryStore::new(2);
        store.set("a", b"1", Duration::from_secs(60)).await.unwrap();
        store.set("b", b"2", Duration::from_secs(60)).await.unwrap();
        store.set("b", b"3", Duration::from_secs(60)).await.unwrap();
        assert!(store.contains_key("a").await);
        assert_eq!(store.get("b").await.unwrap(), Some(b"3".to_vec()));
    }
}
