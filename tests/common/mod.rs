//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use async_trait::async_trait;
use behavior_pipeline::{DistributedStore, MemoryStore, Result, StoreError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Store operation as seen by [`CountingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Get(String),
    Set(String, Duration),
    Remove(String),
}

/// Wraps a [`MemoryStore`] and records every operation, so tests can assert what the
/// behaviors did (and did not do) to the store.
pub struct CountingStore {
    pub inner: MemoryStore,
    ops: Mutex<Vec<StoreOp>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    removes: AtomicUsize,
    fail_writes: AtomicBool,
    cancel_after_set: Mutex<Option<(String, CancellationToken)>>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(10_000),
            ops: Mutex::new(Vec::new()),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            cancel_after_set: Mutex::new(None),
        })
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    /// Number of operations that changed the store.
    pub fn mutations(&self) -> usize {
        self.sets() + self.removes()
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
        self.gets.store(0, Ordering::SeqCst);
        self.sets.store(0, Ordering::SeqCst);
        self.removes.store(0, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Cancels `token` as soon as `key` has been written, simulating a caller that
    /// goes away mid-call.
    pub fn cancel_after_set(&self, key: &str, token: CancellationToken) {
        *self.cancel_after_set.lock().unwrap() = Some((key.to_string(), token));
    }

    /// Decoded JSON value under `key`, read through the inner store without recording.
    pub async fn peek_json(&self, key: &str) -> Option<serde_json::Value> {
        let bytes = self.inner.get(key).await.ok()??;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn as_store(self: &Arc<Self>) -> Arc<dyn DistributedStore> {
        self.clone()
    }
}

#[async_trait]
impl DistributedStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.ops.lock().unwrap().push(StoreOp::Get(key.to_string()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], sliding_expiration: Duration) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()).into());
        }
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.ops
            .lock()
            .unwrap()
            .push(StoreOp::Set(key.to_string(), sliding_expiration));
        self.inner.set(key, value, sliding_expiration).await?;
        if let Some((target, token)) = self.cancel_after_set.lock().unwrap().as_ref() {
            if target == key {
                token.cancel();
            }
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.ops.lock().unwrap().push(StoreOp::Remove(key.to_string()));
        self.inner.remove(key).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}
