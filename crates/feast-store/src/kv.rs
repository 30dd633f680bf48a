//! # Key-Value Store
//!
//! The storage seam the app persists through: string keys, opaque byte
//! values. Callers decide the encoding (JSON for the cart and the profile).
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     dyn KeyValueStore                                   │
//! │                           │                                             │
//! │            ┌──────────────┴──────────────┐                              │
//! │            ▼                             ▼                              │
//! │   SqliteStore (pool.rs)          MemoryStore (this module)              │
//! │   kv_store table, on disk        HashMap, tests and previews            │
//! │                                  + injectable failures                  │
//! │                                  + read gate to hold hydration          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Trait
// =============================================================================

/// Asynchronous key-value storage.
///
/// `get` of a key that was never written is `Ok(None)`, not an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Deletes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// In-memory store.
///
/// ## Test Hooks
/// - [`fail_reads`](Self::fail_reads) / [`fail_writes`](Self::fail_writes)
///   make every read or write return [`StoreError::Unavailable`]
/// - [`pause_reads`](Self::pause_reads) holds every `get` until
///   [`resume_reads`](Self::resume_reads), to stage mutations that land
///   before hydration finishes
/// - [`write_count`](Self::write_count) counts successful `set` calls
#[derive(Debug)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    read_gate: watch::Sender<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (read_gate, _) = watch::channel(true);
        MemoryStore {
            data: RwLock::new(HashMap::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
            read_gate,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        let data = HashMap::from([(key.into(), value.into())]);
        MemoryStore {
            data: RwLock::new(data),
            ..Self::default()
        }
    }

    /// Makes subsequent reads fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Holds every `get` until [`resume_reads`](Self::resume_reads).
    pub fn pause_reads(&self) {
        self.read_gate.send_replace(false);
    }

    pub fn resume_reads(&self) {
        self.read_gate.send_replace(true);
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw value under `key`, bypassing the failure hooks and the read gate.
    pub async fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.data.read().await.get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut gate = self.read_gate.subscribe();
        gate.wait_for(|open| *open)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.data.write().await.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.data.write().await.remove(key);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_set_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", b"v1".to_vec()).await.unwrap();
        store.set("k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.write_count(), 2);

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_with_entry() {
        let store = MemoryStore::with_entry("k", "v");
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::with_entry("k", "v");

        store.fail_reads(true);
        assert!(matches!(store.get("k").await, Err(StoreError::Unavailable(_))));
        store.fail_reads(false);
        assert!(store.get("k").await.is_ok());

        store.fail_writes(true);
        assert!(store.set("k", vec![1]).await.is_err());
        assert!(store.remove("k").await.is_err());
        assert_eq!(store.peek("k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_paused_reads_wait_for_resume() {
        let store = Arc::new(MemoryStore::with_entry("k", "v"));
        store.pause_reads();

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get("k").await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_finished());

        store.resume_reads();
        let value = reader.await.unwrap().unwrap();
        assert_eq!(value, Some(b"v".to_vec()));
    }
}
