//! HTML preview output.
//!
//! The preview pane of the browser notepad maps to a sibling `.html`
//! file regenerated whenever the buffer changes.

use anyhow::Result;
use pad_core::render::render_html;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes the rendered preview next to the note file.
pub struct PreviewWriter {
    path: PathBuf,
}

impl PreviewWriter {
    /// Preview writer for the given note file (`note.md` -> `note.html`).
    pub fn for_note_file(note_file: &Path) -> Self {
        let mut path = note_file.to_path_buf();
        path.set_extension("html");
        Self { path }
    }

    /// Render the buffer and write the preview file.
    pub async fn write(&self, markdown: &str) -> Result<()> {
        let html = render_html(markdown);
        tokio::fs::write(&self.path, html).await?;
        debug!("Preview written: {:?}", self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
