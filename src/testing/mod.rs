//! In-memory collaborators for tests
//!
//! - [`MemoryIdentityStore`]: identity store with call counters and failure switches
//! - [`RecordingResponder`]: reply channel that keeps everything it was asked to send
//!
//! ```rust
//! use std::sync::Arc;
//! use stackbot::dialog::SessionStore;
//! use stackbot::testing::MemoryIdentityStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let identities = Arc::new(MemoryIdentityStore::new());
//! let store = SessionStore::new(identities.clone());
//! store.get_or_create(7, "ann", 70).await.unwrap();
//! assert_eq!(identities.loads(), 1);
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{AppError, AppResult};
use crate::dialog::{Identity, OutboundMessage, Responder};
use crate::storage::IdentityStore;

/// Identity store kept in a `HashMap`.
///
/// Stored identities are buffered until `commit`, which drops the buffer
/// when it fails.
#[derive(Default)]
pub struct MemoryIdentityStore {
    records: Mutex<HashMap<i64, Identity>>,
    pending: Mutex<Vec<Identity>>,
    loads: AtomicUsize,
    stores: AtomicUsize,
    commits: AtomicUsize,
    failing: AtomicBool,
    commit_failing: AtomicBool,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `identities`
    pub fn with_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let store = Self::new();
        if let Ok(mut records) = store.records.lock() {
            records.extend(identities.into_iter().map(|i| (i.id, i)));
        }
        store
    }

    /// Makes every following call fail with a database error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes only `commit` fail; loads and stores keep working
    pub fn set_commit_failing(&self, failing: bool) {
        self.commit_failing.store(failing, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Committed identity of `id`
    pub fn get(&self, id: i64) -> Option<Identity> {
        self.records.lock().ok()?.get(&id).cloned()
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Database(rusqlite::Error::InvalidQuery));
        }
        Ok(())
    }

    fn records(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<i64, Identity>>> {
        self.records
            .lock()
            .map_err(|_| AppError::Config("identity map lock poisoned".to_string()))
    }

    fn pending(&self) -> AppResult<std::sync::MutexGuard<'_, Vec<Identity>>> {
        self.pending
            .lock()
            .map_err(|_| AppError::Config("identity buffer lock poisoned".to_string()))
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load_identity(&self, id: i64) -> AppResult<Option<Identity>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if let Some(identity) = self.pending()?.iter().find(|i| i.id == id) {
            return Ok(Some(identity.clone()));
        }
        Ok(self.records()?.get(&id).cloned())
    }

    fn store_identity(&self, identity: &Identity) -> AppResult<()> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut pending = self.pending()?;
        pending.retain(|i| i.id != identity.id);
        pending.push(identity.clone());
        Ok(())
    }

    fn commit(&self) -> AppResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let batch = std::mem::take(&mut *self.pending()?);
        self.check()?;
        if self.commit_failing.load(Ordering::SeqCst) {
            return Err(AppError::Database(rusqlite::Error::InvalidQuery));
        }
        self.records()?.extend(batch.into_iter().map(|i| (i.id, i)));
        Ok(())
    }
}

/// Reply channel that records `(chat_id, message)` pairs
#[derive(Default)]
pub struct RecordingResponder {
    sent: Mutex<Vec<(i64, OutboundMessage)>>,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first
    pub fn sent(&self) -> Vec<(i64, OutboundMessage)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Text of the most recent message
    pub fn last_text(&self) -> Option<String> {
        self.sent.lock().ok()?.last().map(|(_, m)| m.text.clone())
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn send(&self, chat_id: i64, message: OutboundMessage) -> anyhow::Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("recording lock poisoned"))?
            .push((chat_id, message));
        Ok(())
    }
}
