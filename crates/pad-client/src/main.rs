//! pad-client: terminal-side markdown notepad sync client.
//!
//! Edits happen in a local markdown file with whatever editor the user
//! likes; this binary keeps that file in sync with the notepad backend
//! (realtime channel with REST fallback) and maintains a rendered HTML
//! preview next to it.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pad_client::drafts::DraftDir;
use pad_client::preview::PreviewWriter;
use pad_client::rest::RestClient;
use pad_client::session::{NoteSession, SessionEvent};
use pad_client::watcher::{BufferEvent, BufferWatcher};

use pad_core::note::NoteId;
use pad_core::sync::SyncConfig;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "pad-client")]
#[command(about = "Markdown notepad sync client")]
struct Args {
    /// Markdown file to edit and keep in sync
    file: PathBuf,

    /// Backend base URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    backend: String,

    /// Note ID to sync with, as a bare ID or a path like /abc123.
    /// Without one, the file is edited locally and nothing is persisted.
    #[arg(short, long)]
    note: Option<String>,

    /// State directory for draft caching (default: .pad next to the file)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Skip the HTML preview file
    #[arg(long)]
    no_preview: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

/// Parse the --note argument: either a URL path (`/abc123`) or a bare ID.
fn parse_note(arg: &str) -> Result<NoteId> {
    if arg.starts_with('/') {
        NoteId::from_path(arg).ok_or_else(|| anyhow!("Invalid note path: {}", arg))
    } else {
        arg.parse()
            .map_err(|e| anyhow!("Invalid note ID {:?}: {}", arg, e))
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Client state holding all components.
struct Client {
    session: NoteSession,
    watcher: BufferWatcher,
    preview: Option<PreviewWriter>,
    /// Content we last wrote to the file ourselves; used to tell a
    /// watcher echo of our own write apart from a user edit
    last_written: Option<String>,
}

impl Client {
    /// Handle a change to the watched markdown file.
    async fn on_buffer_event(&mut self, event: BufferEvent) {
        match event {
            BufferEvent::Modified => {
                let content = match tokio::fs::read_to_string(self.watcher.file_path()).await {
                    Ok(content) => content,
                    Err(e) => {
                        warn!("Failed to read {:?}: {}", self.watcher.file_path(), e);
                        return;
                    }
                };

                // Check if this is an echo of a write we just applied
                if self.last_written.as_deref() == Some(content.as_str()) {
                    debug!("Skipping buffer event (own write echo)");
                    self.last_written = None;
                    return;
                }

                self.render_preview(&content).await;
                self.session.on_local_edit(content, now_ms()).await;
            }
            BufferEvent::Deleted => {
                warn!("Note file deleted; waiting for it to reappear");
            }
        }
    }

    /// Handle an event from the session.
    async fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StatusChanged(status) => {
                info!("[{}]", status);
            }
            SessionEvent::RemoteApplied { content } => {
                // Remember the content so the watcher event for this
                // write isn't fed back as a local edit
                self.last_written = Some(content.clone());
                if let Err(e) = tokio::fs::write(self.watcher.file_path(), &content).await {
                    warn!("Failed to write {:?}: {}", self.watcher.file_path(), e);
                }
                self.render_preview(&content).await;
            }
        }
    }

    async fn render_preview(&self, markdown: &str) {
        if let Some(preview) = &self.preview {
            if let Err(e) = preview.write(markdown).await {
                warn!("Failed to write preview: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,pad_client=debug"
    } else {
        "info,pad_client=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting pad-client");
    info!("Note file: {:?}", args.file);
    info!("Backend: {}", args.backend);

    let note_id = args.note.as_deref().map(parse_note).transpose()?;
    match &note_id {
        Some(id) => info!("Note ID: {}", id),
        None => info!("No note ID given; local editing only"),
    }

    // Make sure the file exists before watching its directory
    if !args.file.exists() {
        if let Some(parent) = args.file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&args.file, "").await?;
        info!("Created {:?}", args.file);
    }

    let state_dir = args.state_dir.unwrap_or_else(|| {
        args.file
            .parent()
            .map(|p| p.join(".pad"))
            .unwrap_or_else(|| PathBuf::from(".pad"))
    });
    let drafts = Arc::new(DraftDir::new(&state_dir));

    let store = Arc::new(RestClient::new(&args.backend).context("Invalid backend URL")?);

    let (mut session, mut session_events) = NoteSession::new(
        note_id,
        store,
        drafts,
        Some(args.backend.clone()),
        SyncConfig::default(),
    );

    let watcher = BufferWatcher::new(args.file.clone())?;
    info!("Watching {:?}", watcher.file_path());

    let preview = if args.no_preview {
        None
    } else {
        let preview = PreviewWriter::for_note_file(watcher.file_path());
        info!("Preview: {:?}", preview.path());
        Some(preview)
    };

    // Render the preview for whatever is in the file right now
    if let Some(preview) = &preview {
        let content = tokio::fs::read_to_string(watcher.file_path())
            .await
            .unwrap_or_default();
        if let Err(e) = preview.write(&content).await {
            warn!("Failed to write preview: {}", e);
        }
    }

    session.init(now_ms()).await;

    let mut client = Client {
        session,
        watcher,
        preview,
        last_written: None,
    };

    // Drives the debounce window, reconnect attempts, and poll fetches
    let mut tick = tokio::time::interval(std::time::Duration::from_millis(250));

    info!("Client running. Press Ctrl+C to stop.");

    // Main event loop
    loop {
        tokio::select! {
            // Handle file watcher events
            Some(event) = client.watcher.event_rx().recv() => {
                client.on_buffer_event(event).await;
            }

            // Handle realtime channel events
            Some(event) = client.session.channel_events().recv() => {
                client.session.on_channel_event(event, now_ms()).await;
            }

            // Handle session events (status line, remote content)
            Some(event) = session_events.recv() => {
                client.on_session_event(event).await;
            }

            // Advance the session timers
            _ = tick.tick() => {
                client.session.on_tick(now_ms()).await;
            }

            // Handle graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down");
    Ok(())
}
