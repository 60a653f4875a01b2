//! File-backed draft cache.
//!
//! One file per note under `<state>/drafts/<id>.md`. Used as the local
//! fallback when the backend can't be reached: loads read from here
//! when the initial fetch fails, and failed saves park their content
//! here (best effort, no retry).

use async_trait::async_trait;
use pad_core::cache::{CacheError, DraftCache, Result};
use pad_core::note::NoteId;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Draft cache rooted at a state directory.
pub struct DraftDir {
    dir: PathBuf,
}

impl DraftDir {
    /// Create a draft cache under the given state directory.
    ///
    /// The directory itself is created lazily on first store.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            dir: state_dir.join("drafts"),
        }
    }

    fn path_for(&self, note_id: &NoteId) -> PathBuf {
        self.dir.join(format!("{}.md", note_id))
    }
}

#[async_trait]
impl DraftCache for DraftDir {
    async fn load(&self, note_id: &NoteId) -> Result<Option<String>> {
        let path = self.path_for(note_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io(e.to_string())),
        }
    }

    async fn store(&self, note_id: &NoteId, content: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?;
        let path = self.path_for(note_id);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?;
        debug!("Draft cached: {:?}", path);
        Ok(())
    }
}
