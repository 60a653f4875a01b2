//! The note session: one note, one buffer, one sync strategy.
//!
//! Consolidates the save/load cycle, the realtime channel, the debounce
//! window, and the polling fallback behind a handful of event-loop entry
//! points (`init`, `on_local_edit`, `on_channel_event`, `on_tick`,
//! `switch_note`). Connection state is an explicit variant and all
//! timers are owned schedules, not loose globals.
//!
//! Concurrency model: everything runs on the caller's single event loop;
//! the only background work is the realtime read task, whose events come
//! back through this session tagged with a connection sequence number so
//! traffic from a superseded connection (closed channel, switched note)
//! is discarded instead of applied late.

use crate::realtime::{ChannelEvent, ChannelEventKind, RealtimeConnection, realtime_url};
use pad_core::cache::DraftCache;
use pad_core::note::{ClientId, NoteId};
use pad_core::protocol::{ContentUpdate, ServerMessage};
use pad_core::status::Status;
use pad_core::store::{NoteStore, StoreError};
use pad_core::sync::{ConnectionState, DebounceState, PollSchedule, ReconnectSchedule, SyncConfig};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Event emitted by the session for the driver loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The status line changed
    StatusChanged(Status),
    /// Remote content was applied over the buffer; the editor file and
    /// preview should be rewritten
    RemoteApplied { content: String },
}

/// Sync client for a single note.
pub struct NoteSession {
    note_id: Option<NoteId>,
    client_id: ClientId,
    config: SyncConfig,
    store: Arc<dyn NoteStore>,
    drafts: Arc<dyn DraftCache>,
    /// Backend base URL for the realtime channel (http(s) or ws(s)).
    /// None disables realtime entirely (REST saves only).
    realtime_base: Option<String>,

    state: ConnectionState,
    debounce: DebounceState,
    reconnect: ReconnectSchedule,
    poll: PollSchedule,
    buffer: String,
    status: Status,

    realtime: Option<RealtimeConnection>,
    /// Sequence number of the current connection; events from older
    /// connections are dropped.
    conn_seq: u64,
    channel_tx: mpsc::UnboundedSender<ChannelEvent>,
    channel_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl NoteSession {
    /// Create a session. Call `init` before feeding it events.
    pub fn new(
        note_id: Option<NoteId>,
        store: Arc<dyn NoteStore>,
        drafts: Arc<dyn DraftCache>,
        realtime_base: Option<String>,
        config: SyncConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (channel_tx, channel_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        (
            Self {
                note_id,
                client_id: ClientId::generate(),
                config,
                store,
                drafts,
                realtime_base,
                state: ConnectionState::Idle,
                debounce: DebounceState::new(),
                reconnect: ReconnectSchedule::new(),
                poll: PollSchedule::new(),
                buffer: String::new(),
                status: Status::Idle,
                realtime: None,
                conn_seq: 0,
                channel_tx,
                channel_rx,
                event_tx,
            },
            event_rx,
        )
    }

    /// Load the note and start the realtime channel.
    ///
    /// With no active note ID (landing page) persistence is disabled and
    /// the session is a purely local editor.
    pub async fn init(&mut self, now_ms: u64) {
        let Some(note_id) = self.note_id.clone() else {
            info!("No active note ID; persistence disabled");
            self.set_status(Status::Idle);
            return;
        };

        self.set_status(Status::Loading);
        match self.store.load(Some(&note_id)).await {
            Ok(snapshot) => {
                self.apply_remote(snapshot.content).await;
            }
            Err(e) => {
                warn!("Initial load failed ({}), falling back to draft cache", e);
                match self.drafts.load(&note_id).await {
                    Ok(Some(draft)) => self.apply_remote(draft).await,
                    Ok(None) => {}
                    Err(e) => warn!("Draft read failed: {}", e),
                }
                self.set_status(Status::Offline);
            }
        }

        self.try_connect(now_ms).await;
    }

    /// Handle an edit to the local buffer.
    ///
    /// Mirrors the content to the draft cache immediately (crash
    /// recovery) and arms the debounce window; the actual send happens
    /// on a later tick.
    pub async fn on_local_edit(&mut self, content: String, now_ms: u64) {
        if content == self.buffer {
            return;
        }
        self.buffer = content.clone();

        let Some(note_id) = self.note_id.clone() else {
            // Landing page: local editing only
            return;
        };

        if let Err(e) = self.drafts.store(&note_id, &content).await {
            warn!("Draft write failed: {}", e);
        }
        self.debounce.record_edit(content, now_ms, &self.config);
        self.set_status(Status::Saving);
    }

    /// Advance the owned timers: debounce flush, reconnect attempts,
    /// polling fetches.
    pub async fn on_tick(&mut self, now_ms: u64) {
        if let Some(content) = self.debounce.flush_due(now_ms) {
            self.push_content(content, now_ms).await;
        }

        if matches!(
            self.state,
            ConnectionState::ReconnectWait | ConnectionState::Polling
        ) && self.reconnect.due(now_ms)
        {
            self.try_connect(now_ms).await;
        }

        if self.poll.take_due(now_ms, &self.config) {
            self.poll_fetch().await;
        }
    }

    /// Handle an event from the realtime read task.
    pub async fn on_channel_event(&mut self, event: ChannelEvent, now_ms: u64) {
        if event.seq != self.conn_seq {
            debug!("Dropping event from superseded connection (seq {})", event.seq);
            return;
        }

        match event.kind {
            ChannelEventKind::Message(ServerMessage::InitialContent(msg)) => {
                self.apply_remote(msg.content).await;
            }
            ChannelEventKind::Message(ServerMessage::ContentUpdate(update)) => {
                if update.sender == self.client_id.to_string() {
                    // Our own update relayed back
                    return;
                }
                if self.note_id.as_ref() != Some(&update.note_id) {
                    debug!("Dropping update for other note {}", update.note_id);
                    return;
                }
                self.apply_remote(update.content).await;
            }
            ChannelEventKind::Message(ServerMessage::GetContent(_)) => {}
            ChannelEventKind::Closed => {
                info!("Realtime channel lost");
                self.realtime = None;
                self.state = ConnectionState::ReconnectWait;
                self.reconnect.schedule(now_ms, &self.config);
                self.set_status(Status::Reconnecting);
            }
        }
    }

    /// Switch to a different note (or to none).
    ///
    /// Closes the channel and clears every schedule before any new I/O
    /// starts, so nothing from the old note can apply to the new one.
    pub async fn switch_note(&mut self, note_id: Option<NoteId>, now_ms: u64) {
        if let Some(mut conn) = self.realtime.take() {
            conn.close().await;
        }
        // Invalidate anything still in flight from the old channel
        self.conn_seq += 1;
        self.debounce.clear();
        self.reconnect.reset();
        self.poll.stop();
        self.state = ConnectionState::Idle;
        self.buffer.clear();
        self.note_id = note_id;
        self.init(now_ms).await;
    }

    /// Attempt to open the realtime channel; on failure, fall back to
    /// polling and schedule the next attempt.
    async fn try_connect(&mut self, now_ms: u64) {
        let url = match (&self.note_id, &self.realtime_base) {
            (Some(id), Some(base)) => realtime_url(base, id),
            _ => return,
        };

        self.state = ConnectionState::Connecting;
        self.conn_seq += 1;

        match RealtimeConnection::connect(&url, self.conn_seq, self.channel_tx.clone()).await {
            Ok(conn) => {
                info!("Realtime channel established");
                self.realtime = Some(conn);
                self.state = ConnectionState::Connected;
                self.reconnect.reset();
                self.poll.stop();
                self.set_status(Status::Live);
            }
            Err(e) => {
                warn!(
                    "Realtime connect failed (attempt {}): {}",
                    self.reconnect.attempts() + 1,
                    e
                );
                self.realtime = None;
                self.reconnect.schedule(now_ms, &self.config);
                self.poll.start(now_ms);
                self.state = ConnectionState::Polling;
                self.set_status(Status::Polling);
            }
        }
    }

    /// Send the debounced buffer state: over the channel when connected,
    /// otherwise over REST. A REST failure parks the content in the
    /// draft cache and is not retried.
    async fn push_content(&mut self, content: String, now_ms: u64) {
        let Some(note_id) = self.note_id.clone() else {
            return;
        };

        if self.state == ConnectionState::Connected {
            if let Some(conn) = &self.realtime {
                let update =
                    ContentUpdate::new(note_id.clone(), content.clone(), self.client_id.to_string());
                match conn.send_update(&update).await {
                    Ok(()) => {
                        self.set_status(Status::Saved { at_ms: now_ms });
                        return;
                    }
                    Err(e) => {
                        // The read task will deliver Closed shortly;
                        // save this edit over REST meanwhile
                        warn!("Channel send failed, saving over REST: {}", e);
                    }
                }
            }
        }

        match self.store.save(Some(&note_id), &content).await {
            Ok(timestamp) => self.set_status(Status::Saved { at_ms: timestamp }),
            Err(StoreError::Unavailable(e)) => {
                warn!("Save failed ({}), content kept in draft cache", e);
                if let Err(e) = self.drafts.store(&note_id, &content).await {
                    warn!("Draft write failed: {}", e);
                }
                self.set_status(Status::SaveFailed);
            }
            Err(e) => {
                warn!("Save rejected: {}", e);
                self.set_status(Status::SaveFailed);
            }
        }
    }

    /// One polling fetch: re-read the note and overwrite the buffer if
    /// the snapshot differs (string equality, last write wins).
    async fn poll_fetch(&mut self) {
        let note_id = self.note_id.clone();
        match self.store.load(note_id.as_ref()).await {
            Ok(snapshot) => {
                if self.status == Status::Offline {
                    self.set_status(Status::Polling);
                }
                if snapshot.content != self.buffer {
                    self.apply_remote(snapshot.content).await;
                }
            }
            Err(e) => {
                warn!("Poll fetch failed: {}", e);
                self.set_status(Status::Offline);
            }
        }
    }

    /// Overwrite the buffer with remote content (no diffing) and notify
    /// the driver so the editor file and preview get rewritten.
    async fn apply_remote(&mut self, content: String) {
        if content == self.buffer {
            return;
        }
        self.buffer = content.clone();

        if let Some(note_id) = self.note_id.clone() {
            if let Err(e) = self.drafts.store(&note_id, &content).await {
                warn!("Draft write failed: {}", e);
            }
        }

        let _ = self.event_tx.send(SessionEvent::RemoteApplied { content });
    }

    fn set_status(&mut self, status: Status) {
        if self.status == status {
            return;
        }
        debug!("Status: {} -> {}", self.status, status);
        self.status = status;
        let _ = self.event_tx.send(SessionEvent::StatusChanged(status));
    }

    /// Receiver for realtime channel events, for the driver's select loop.
    pub fn channel_events(&mut self) -> &mut mpsc::UnboundedReceiver<ChannelEvent> {
        &mut self.channel_rx
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn note_id(&self) -> Option<&NoteId> {
        self.note_id.as_ref()
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Sequence number of the current connection (for tests).
    pub fn connection_seq(&self) -> u64 {
        self.conn_seq
    }
}
