//! pad-core: Shared library for the markdown notepad sync client.
//!
//! This crate provides the core functionality for:
//! - Note identity and URL path routing
//! - The JSON wire protocol (realtime channel + REST payloads)
//! - Markdown-to-HTML rendering for the preview
//! - The sync state machine (debounce, reconnect, polling fallback)
//! - NoteStore and DraftCache trait abstractions

pub mod cache;
pub mod note;
pub mod protocol;
pub mod render;
pub mod status;
pub mod store;
pub mod sync;

pub use cache::{CacheError, DraftCache, MemoryCache};
pub use note::{ClientId, NoteId, NoteIdError, NoteSnapshot};
pub use protocol::{ContentUpdate, GetContent, InitialContent, ServerMessage};
pub use status::Status;
pub use store::{MemoryStore, NoteStore, StoreError};
pub use sync::{ConnectionState, DebounceState, PollSchedule, ReconnectSchedule, SyncConfig};
