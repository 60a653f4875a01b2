//! Watcher for the edited markdown file.
//!
//! The note's "editor buffer" is a local markdown file: the user edits
//! it in whatever editor they like, and changes surface here as
//! debounced events. Uses notify-debouncer-mini for efficient change
//! detection.

use anyhow::{Result, anyhow};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Change to the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    /// File was created or modified
    Modified,
    /// File was deleted
    Deleted,
}

/// Track last seen mtime to filter spurious events
type MtimeCache = Arc<Mutex<Option<SystemTime>>>;

/// Watches a single markdown file for edits.
pub struct BufferWatcher {
    /// The watched file (canonicalized)
    file_path: PathBuf,
    /// Debouncer handle (must keep alive)
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// Receiver for buffer events
    event_rx: mpsc::UnboundedReceiver<BufferEvent>,
}

impl BufferWatcher {
    /// Create a watcher for the given file.
    ///
    /// Watches the parent directory (non-recursive) and filters to the
    /// one file, since editors typically replace files on save rather
    /// than writing in place. Uses a 200ms debounce period to avoid
    /// rapid-fire events during saves.
    pub fn new(file_path: PathBuf) -> Result<Self> {
        // Canonicalize to resolve symlinks; on macOS /var/folders/... is
        // actually /private/var/folders/... and FSEvents needs the real path.
        let file_path = file_path.canonicalize().unwrap_or(file_path);
        let parent = file_path
            .parent()
            .ok_or_else(|| anyhow!("File has no parent directory: {:?}", file_path))?
            .to_path_buf();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let watched = file_path.clone();
        let mtime_cache: MtimeCache = Arc::new(Mutex::new(None));

        let mut debouncer = new_debouncer(
            Duration::from_millis(200),
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    for event in events {
                        if let Some(buffer_event) =
                            Self::process_event(&event, &watched, &mtime_cache)
                        {
                            if event_tx.send(buffer_event).is_err() {
                                // Receiver dropped
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("File watcher error: {}", e);
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&parent, RecursiveMode::NonRecursive)?;

        Ok(Self {
            file_path,
            _debouncer: debouncer,
            event_rx,
        })
    }

    /// Process a single debounced event, returning a BufferEvent if it
    /// concerns the watched file.
    fn process_event(
        event: &DebouncedEvent,
        watched: &Path,
        mtime_cache: &MtimeCache,
    ) -> Option<BufferEvent> {
        // Ignore sibling files in the directory (including our own
        // preview output)
        let path = event.path.canonicalize().unwrap_or_else(|_| event.path.clone());
        if path != watched {
            return None;
        }

        let kind = match event.kind {
            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous => {
                if path.exists() {
                    BufferEvent::Modified
                } else {
                    BufferEvent::Deleted
                }
            }
            // Handle any future event kinds (non-exhaustive enum)
            _ => {
                if path.exists() {
                    BufferEvent::Modified
                } else {
                    BufferEvent::Deleted
                }
            }
        };

        // For modifications, check mtime to filter spurious events
        match kind {
            BufferEvent::Modified => {
                if let Ok(metadata) = std::fs::metadata(&path) {
                    if let Ok(mtime) = metadata.modified() {
                        let mut cache = mtime_cache.lock().expect("mtime cache mutex poisoned");
                        if *cache == Some(mtime) {
                            // Mtime unchanged - spurious event, skip it
                            return None;
                        }
                        *cache = Some(mtime);
                    }
                }
            }
            BufferEvent::Deleted => {
                let mut cache = mtime_cache.lock().expect("mtime cache mutex poisoned");
                *cache = None;
            }
        }

        debug!("Buffer event: {:?}", kind);
        Some(kind)
    }

    /// Get the receiver for buffer events.
    pub fn event_rx(&mut self) -> &mut mpsc::UnboundedReceiver<BufferEvent> {
        &mut self.event_rx
    }

    /// Get the watched file path.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}
