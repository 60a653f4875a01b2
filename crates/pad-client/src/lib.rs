//! pad-client library: Exposes internal modules for testing.
//!
//! This is a thin library layer over the client components,
//! allowing integration tests to access internal types.

pub mod drafts;
pub mod preview;
pub mod realtime;
pub mod rest;
pub mod session;
pub mod watcher;

// Re-export key types for convenience
pub use drafts::DraftDir;
pub use preview::PreviewWriter;
pub use realtime::{ChannelEvent, ChannelEventKind, RealtimeConnection, realtime_url};
pub use rest::RestClient;
pub use session::{NoteSession, SessionEvent};
pub use watcher::{BufferEvent, BufferWatcher};
