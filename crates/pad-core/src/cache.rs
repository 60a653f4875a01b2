//! DraftCache trait abstraction for the local crash-recovery cache.
//!
//! The cache mirrors the editor buffer per note ID. It is best-effort:
//! a save that fails against the backend lands here and is NOT retried;
//! the draft is only read back when a load can't reach the backend.
//!
//! Implementations:
//! - `MemoryCache` - For testing
//! - `DraftDir` (in pad-client) - One file per note under a state dir

use crate::note::NoteId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Local draft storage keyed by note ID.
#[async_trait]
pub trait DraftCache: Send + Sync {
    /// Read the cached draft for a note, if any.
    async fn load(&self, note_id: &NoteId) -> Result<Option<String>>;

    /// Overwrite the cached draft for a note.
    async fn store(&self, note_id: &NoteId, content: &str) -> Result<()>;
}

/// In-memory draft cache for testing.
pub struct MemoryCache {
    drafts: RwLock<HashMap<NoteId, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            drafts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftCache for MemoryCache {
    async fn load(&self, note_id: &NoteId) -> Result<Option<String>> {
        let drafts = self.drafts.read().expect("draft map lock poisoned");
        Ok(drafts.get(note_id).cloned())
    }

    async fn store(&self, note_id: &NoteId, content: &str) -> Result<()> {
        let mut drafts = self.drafts.write().expect("draft map lock poisoned");
        drafts.insert(note_id.clone(), content.to_string());
        Ok(())
    }
}
