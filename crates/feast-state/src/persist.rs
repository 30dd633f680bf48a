//! # Persister
//!
//! One persisted blob: a storage key, a loader for hydration and a background
//! writer for write-back.
//!
//! ## Write-Back Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  mutation (sync, under the state lock)                                  │
//! │       │ serde_json::to_vec(snapshot)                                    │
//! │       ▼                                                                 │
//! │  mpsc (unbounded) ── Save(bytes) ── Save(bytes) ── Flush(tx) ──►        │
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                            writer task (one per key)    │
//! │                                              store.set(key, bytes)      │
//! │                                              failures: warn! + continue │
//! │                                                                         │
//! │  Snapshots are queued while the state lock is held, so the store        │
//! │  always ends with the latest one.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use feast_store::KeyValueStore;

/// What hydration found under the key.
#[derive(Debug)]
pub(crate) enum Loaded<T> {
    /// A value that parsed.
    Found(T),
    /// Nothing stored yet.
    Missing,
    /// The read or the parse failed (already logged).
    Failed,
}

enum WriteCommand {
    Save(Vec<u8>),
    Flush(oneshot::Sender<()>),
}

/// Loader and ordered writer for one key.
pub(crate) struct Persister {
    store: Arc<dyn KeyValueStore>,
    key: String,
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl Persister {
    /// Creates the persister and spawns its writer task.
    ///
    /// Must be called inside a tokio runtime. The writer exits once the
    /// persister is dropped and its queue has drained.
    pub(crate) fn spawn(store: Arc<dyn KeyValueStore>, key: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&store), key.clone(), rx));
        Persister { store, key, tx }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// Reads and parses the stored value. Never fails; problems are logged.
    pub(crate) async fn load<T: DeserializeOwned>(&self) -> Loaded<T> {
        let bytes = match self.store.get(&self.key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %self.key, "Nothing stored");
                return Loaded::Missing;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read stored state");
                return Loaded::Failed;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Loaded::Found(value),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Stored state is not valid, ignoring it");
                Loaded::Failed
            }
        }
    }

    /// Queues a snapshot for writing.
    pub(crate) fn save<T: Serialize + ?Sized>(&self, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to serialize state");
                return;
            }
        };

        if self.tx.send(WriteCommand::Save(bytes)).is_err() {
            warn!(key = %self.key, "Writer task is gone, dropping snapshot");
        }
    }

    /// Waits until every snapshot queued so far has been handed to the store.
    pub(crate) async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteCommand::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

async fn run_writer(
    store: Arc<dyn KeyValueStore>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            WriteCommand::Save(bytes) => {
                let size = bytes.len();
                match store.set(&key, bytes).await {
                    Ok(()) => debug!(key = %key, bytes = size, "State written"),
                    Err(e) => warn!(key = %key, error = %e, "Failed to write state"),
                }
            }
            WriteCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!(key = %key, "Writer stopped");
}

// =============================================================================
// Unit Tests
// =============================================================================
