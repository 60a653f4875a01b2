//! NoteStore trait abstraction for backend persistence.
//!
//! Implementations:
//! - `MemoryStore` - For testing (with a switchable fail mode)
//! - `RestClient` (in pad-client) - Talks to the notepad backend over HTTP

use crate::note::{NoteId, NoteSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Network-level failure: the request never produced a response.
    /// The caller falls back to the draft cache (loads) or parks the
    /// content there (saves).
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with a non-2xx status.
    #[error("Save rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body didn't match the wire contract.
    #[error("Malformed response: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Backend persistence for notes.
///
/// `note_id` is `None` on the landing page, where the backend keeps a
/// single anonymous note (`/notes` without an ID segment).
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Fetch the current note snapshot.
    async fn load(&self, note_id: Option<&NoteId>) -> Result<NoteSnapshot>;

    /// Persist content, returning the server-side timestamp (ms).
    async fn save(&self, note_id: Option<&NoteId>, content: &str) -> Result<u64>;
}

/// In-memory store for testing.
///
/// `set_unavailable(true)` makes every call fail with
/// `StoreError::Unavailable`, exercising the fallback paths.
pub struct MemoryStore {
    notes: RwLock<HashMap<String, NoteSnapshot>>,
    unavailable: AtomicBool,
    clock: AtomicU64,
}

/// Key used for the anonymous landing-page note.
const ANONYMOUS_KEY: &str = "";

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            clock: AtomicU64::new(1),
        }
    }

    /// Toggle the simulated outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of saves accepted so far (across all notes).
    pub fn save_count(&self) -> u64 {
        self.clock.load(Ordering::SeqCst).saturating_sub(1)
    }

    fn key(note_id: Option<&NoteId>) -> String {
        note_id.map(|id| id.as_str().to_string()).unwrap_or_else(|| ANONYMOUS_KEY.to_string())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn load(&self, note_id: Option<&NoteId>) -> Result<NoteSnapshot> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        let notes = self.notes.read().expect("note map lock poisoned");
        // Unknown IDs read as an empty note: notes are created implicitly
        // on first save, never 404
        Ok(notes.get(&Self::key(note_id)).cloned().unwrap_or(NoteSnapshot {
            content: String::new(),
            last_updated: None,
        }))
    }

    async fn save(&self, note_id: Option<&NoteId>, content: &str) -> Result<u64> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        let timestamp = self.clock.fetch_add(1, Ordering::SeqCst);
        let mut notes = self.notes.write().expect("note map lock poisoned");
        notes.insert(
            Self::key(note_id),
            NoteSnapshot {
                content: content.to_string(),
                last_updated: Some(timestamp),
            },
        );
        Ok(timestamp)
    }
}
