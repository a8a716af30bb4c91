//! In-memory credential store for tests and demo runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::Result;
use crate::credentials::StaCredentials;
use crate::traits::CredentialStore;

#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<StaCredentials>>,
    save_calls: AtomicUsize,
    clear_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `credentials`, as if a previous run had
    /// provisioned them.
    pub fn preloaded(credentials: StaCredentials) -> Self {
        let store = Self::new();
        *store.slot.lock().unwrap() = Some(credentials);
        store
    }

    /// Current content, for assertions.
    pub fn stored(&self) -> Option<StaCredentials> {
        self.slot.lock().unwrap().clone()
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Option<StaCredentials> {
        self.slot.lock().unwrap().clone()
    }

    async fn save(&self, credentials: &StaCredentials) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}
