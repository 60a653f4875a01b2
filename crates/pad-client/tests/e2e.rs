//! End-to-end tests for pad-client.
//!
//! Runs a real in-process WebSocket note server and exercises the
//! realtime channel and the session against it: the connect-time
//! content request, debounced outgoing updates, incoming updates from
//! other clients, and channel loss.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pad_client::realtime::{ChannelEvent, ChannelEventKind, RealtimeConnection, realtime_url};
use pad_client::session::{NoteSession, SessionEvent};
use pad_core::cache::MemoryCache;
use pad_core::note::NoteId;
use pad_core::protocol::{ContentUpdate, GetContent, InitialContent, ServerMessage};
use pad_core::status::Status;
use pad_core::store::{MemoryStore, NoteStore};
use pad_core::sync::{ConnectionState, SyncConfig};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};

fn note_id() -> NoteId {
    "abc123".parse().unwrap()
}

/// In-process note server handling a single realtime connection.
///
/// Answers `get_content` with `initial_content`, records every
/// `content_update` it receives, and can push arbitrary frames or close
/// the connection on demand.
struct NoteServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ContentUpdate>>>,
    push_tx: mpsc::UnboundedSender<String>,
    close_tx: mpsc::UnboundedSender<()>,
}

impl NoteServer {
    async fn spawn(initial: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        Self::from_listener(listener, initial)
    }

    /// Spawn on a specific address, for tests where the backend comes
    /// up after the client has already failed to connect.
    async fn spawn_at(addr: SocketAddr, initial: &str) -> Self {
        let listener = TcpListener::bind(addr).await.expect("Failed to bind");
        Self::from_listener(listener, initial)
    }

    fn from_listener(listener: TcpListener, initial: &str) -> Self {
        let addr = listener.local_addr().expect("Failed to get local addr");

        let initial = initial.to_string();
        let received = Arc::new(Mutex::new(Vec::new()));
        let (push_tx, mut push_rx) = mpsc::unbounded_channel::<String>();
        let (close_tx, mut close_rx) = mpsc::unbounded_channel::<()>();

        let recorded = received.clone();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("Failed to accept");
            let mut ws = accept_async(stream).await.expect("Failed to upgrade");

            loop {
                tokio::select! {
                    msg = ws.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if GetContent::from_json(&text).is_some() {
                                    let reply =
                                        InitialContent::new(initial.clone(), Some(1000)).to_json();
                                    let _ = ws.send(Message::Text(reply.into())).await;
                                } else if let Some(update) = ContentUpdate::from_json(&text) {
                                    recorded.lock().await.push(update);
                                }
                            }
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                            Some(Ok(_)) => {}
                        }
                    }
                    Some(frame) = push_rx.recv() => {
                        let _ = ws.send(Message::Text(frame.into())).await;
                    }
                    Some(()) = close_rx.recv() => {
                        let _ = ws.close(None).await;
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            received,
            push_tx,
            close_tx,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Push a raw text frame to the connected client.
    fn push(&self, frame: impl Into<String>) {
        self.push_tx.send(frame.into()).expect("Server task gone");
    }

    /// Close the connection from the server side.
    fn close(&self) {
        self.close_tx.send(()).expect("Server task gone");
    }

    /// Wait until the server has recorded at least one update, and
    /// return the latest.
    async fn wait_for_update(&self) -> ContentUpdate {
        timeout(Duration::from_secs(2), async {
            loop {
                if let Some(update) = self.received.lock().await.last().cloned() {
                    return update;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("Timeout waiting for update at server")
    }
}

/// Receive the next channel event with a timeout.
async fn recv_event(rx: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timeout waiting for channel event")
        .expect("Channel closed")
}

// ============================================================================
// RealtimeConnection tests
// ============================================================================

#[tokio::test]
async fn test_connect_requests_and_receives_initial_content() {
    let server = NoteServer::spawn("# from server").await;
    let url = realtime_url(&server.base_url(), &note_id());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let _conn = RealtimeConnection::connect(&url, 1, event_tx)
        .await
        .expect("Failed to connect");

    let event = recv_event(&mut event_rx).await;
    assert_eq!(event.seq, 1);
    match event.kind {
        ChannelEventKind::Message(ServerMessage::InitialContent(msg)) => {
            assert_eq!(msg.content, "# from server");
            assert_eq!(msg.last_updated, Some(1000));
        }
        other => panic!("Expected initial content, got {:?}", other),
    }
}

#[tokio::test]
async fn test_send_update_reaches_server() {
    let server = NoteServer::spawn("").await;
    let url = realtime_url(&server.base_url(), &note_id());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let conn = RealtimeConnection::connect(&url, 1, event_tx)
        .await
        .expect("Failed to connect");
    // Drain the connect-time initial content
    recv_event(&mut event_rx).await;

    let update = ContentUpdate::new(note_id(), "hello over the wire", "client-1");
    conn.send_update(&update).await.expect("Failed to send");

    let received = server.wait_for_update().await;
    assert_eq!(received, update);
}

#[tokio::test]
async fn test_server_close_emits_closed_event() {
    let server = NoteServer::spawn("").await;
    let url = realtime_url(&server.base_url(), &note_id());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let _conn = RealtimeConnection::connect(&url, 7, event_tx)
        .await
        .expect("Failed to connect");
    recv_event(&mut event_rx).await;

    server.close();

    let event = recv_event(&mut event_rx).await;
    assert_eq!(event.seq, 7);
    assert!(matches!(event.kind, ChannelEventKind::Closed));
}

#[tokio::test]
async fn test_undecodable_frames_dropped() {
    let server = NoteServer::spawn("").await;
    let url = realtime_url(&server.base_url(), &note_id());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let _conn = RealtimeConnection::connect(&url, 1, event_tx)
        .await
        .expect("Failed to connect");
    recv_event(&mut event_rx).await;

    // Garbage frames must not surface; the next decodable frame does
    server.push("not json at all");
    server.push(r#"{"type":"mystery"}"#);
    server.push(ContentUpdate::new(note_id(), "valid", "other").to_json());

    let event = recv_event(&mut event_rx).await;
    match event.kind {
        ChannelEventKind::Message(ServerMessage::ContentUpdate(update)) => {
            assert_eq!(update.content, "valid");
        }
        other => panic!("Expected the valid update, got {:?}", other),
    }
}

// ============================================================================
// Full session tests
// ============================================================================

struct SessionFixture {
    store: Arc<MemoryStore>,
    session: NoteSession,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

async fn connected_session(server: &NoteServer) -> SessionFixture {
    let store = Arc::new(MemoryStore::new());
    let (mut session, events) = NoteSession::new(
        Some(note_id()),
        store.clone(),
        Arc::new(MemoryCache::new()),
        Some(server.base_url()),
        SyncConfig::default(),
    );
    session.init(0).await;
    assert_eq!(session.status(), Status::Live);
    SessionFixture {
        store,
        session,
        events,
    }
}

/// Pump the next realtime event through the session.
async fn pump(session: &mut NoteSession, now_ms: u64) {
    let event = timeout(Duration::from_secs(2), session.channel_events().recv())
        .await
        .expect("Timeout waiting for channel event")
        .expect("Channel closed");
    session.on_channel_event(event, now_ms).await;
}

#[tokio::test]
async fn test_session_applies_initial_content() {
    let server = NoteServer::spawn("# seeded note").await;
    let mut fx = connected_session(&server).await;

    pump(&mut fx.session, 100).await;

    assert_eq!(fx.session.buffer(), "# seeded note");
}

#[tokio::test]
async fn test_session_sends_debounced_edit_over_channel() {
    let server = NoteServer::spawn("").await;
    let mut fx = connected_session(&server).await;
    pump(&mut fx.session, 100).await;

    fx.session.on_local_edit("draft one".into(), 1000).await;
    fx.session.on_local_edit("draft two".into(), 1200).await;
    fx.session.on_tick(1700).await;

    let update = server.wait_for_update().await;
    assert_eq!(update.content, "draft two");
    assert_eq!(update.note_id, note_id());
    assert_eq!(update.sender, fx.session.client_id().to_string());
    assert_eq!(server.received.lock().await.len(), 1);

    // The channel carried it; REST was never involved
    assert_eq!(fx.store.save_count(), 0);
    assert!(matches!(fx.session.status(), Status::Saved { .. }));
}

#[tokio::test]
async fn test_session_applies_update_from_other_client() {
    let server = NoteServer::spawn("").await;
    let mut fx = connected_session(&server).await;
    pump(&mut fx.session, 100).await;

    server.push(ContentUpdate::new(note_id(), "typed elsewhere", "other-client").to_json());
    pump(&mut fx.session, 200).await;

    assert_eq!(fx.session.buffer(), "typed elsewhere");

    // The driver was told to rewrite the file
    let mut saw_applied = false;
    while let Ok(event) = fx.events.try_recv() {
        if let SessionEvent::RemoteApplied { content } = event {
            saw_applied = content == "typed elsewhere";
        }
    }
    assert!(saw_applied);
}

#[tokio::test]
async fn test_reconnect_success_leaves_polling() {
    // Reserve an address that refuses connections for now
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = Arc::new(MemoryStore::new());
    let (mut session, _events) = NoteSession::new(
        Some(note_id()),
        store.clone(),
        Arc::new(MemoryCache::new()),
        Some(format!("http://{}", addr)),
        SyncConfig::default(),
    );
    session.init(0).await;
    assert_eq!(session.state(), ConnectionState::Polling);

    // The backend comes up on the same address
    let _server = NoteServer::spawn_at(addr, "# recovered").await;

    // The next reconnect attempt, one fixed delay later, succeeds and
    // the channel takes over from polling
    session.on_tick(3000).await;
    assert_eq!(session.state(), ConnectionState::Connected);
    assert_eq!(session.status(), Status::Live);
    pump(&mut session, 3100).await;
    assert_eq!(session.buffer(), "# recovered");

    // Polling is disengaged: a newer REST snapshot is no longer fetched
    store.save(Some(&note_id()), "rest only").await.unwrap();
    session.on_tick(6000).await;
    session.on_tick(10_000).await;
    assert_eq!(session.buffer(), "# recovered");
}

#[tokio::test]
async fn test_session_handles_channel_loss() {
    let server = NoteServer::spawn("").await;
    let mut fx = connected_session(&server).await;
    pump(&mut fx.session, 100).await;

    server.close();
    pump(&mut fx.session, 1000).await;

    assert_eq!(fx.session.status(), Status::Reconnecting);

    // Edits made while disconnected still save over REST
    fx.session.on_local_edit("offline edit".into(), 1100).await;
    fx.session.on_tick(1600).await;
    assert_eq!(fx.store.save_count(), 1);
    let snapshot = fx.store.load(Some(&note_id())).await.unwrap();
    assert_eq!(snapshot.content, "offline edit");
}
