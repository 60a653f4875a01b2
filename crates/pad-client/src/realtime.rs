//! Realtime channel to the notepad backend.
//!
//! One WebSocket connection per note (`ws(s)://<base>/ws/:noteId`),
//! carrying the JSON text frames defined in `pad_core::protocol`. The
//! connection splits the stream: the write half is kept for sending,
//! the read half runs in a spawned task that forwards decoded messages
//! to the session over a channel.

use anyhow::{Result, anyhow};
use futures::{SinkExt, StreamExt};
use pad_core::note::NoteId;
use pad_core::protocol::{ContentUpdate, GetContent, ServerMessage};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, error};

/// Event delivered from a realtime connection to the session.
///
/// `seq` identifies the connection the event came from; the session
/// drops events from a superseded connection so traffic from before a
/// note switch can never apply afterwards.
#[derive(Debug)]
pub struct ChannelEvent {
    pub seq: u64,
    pub kind: ChannelEventKind,
}

#[derive(Debug)]
pub enum ChannelEventKind {
    /// A decoded frame from the server
    Message(ServerMessage),
    /// The connection was closed or errored out
    Closed,
}

/// Build the realtime URL for a note from the HTTP base URL.
pub fn realtime_url(base: &str, note_id: &NoteId) -> String {
    let base = base.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        // Already a ws(s) URL, or scheme-less
        base.to_string()
    };
    format!("{}/ws/{}", ws_base, note_id)
}

/// An open realtime connection for a single note.
pub struct RealtimeConnection {
    /// Write half of the WebSocket (wrapped for sharing across tasks)
    write: Arc<Mutex<futures::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>>>,
    /// Handle to the read task
    read_task: Option<JoinHandle<()>>,
}

impl RealtimeConnection {
    /// Connect, request the current content, and start the read loop.
    ///
    /// Events arrive on `event_tx` tagged with `seq`. An `Err` here is
    /// the "channel cannot be established" edge: the caller falls back
    /// to polling.
    pub async fn connect(
        url: &str,
        seq: u64,
        event_tx: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Result<Self> {
        let (ws_stream, _) = connect_async(url).await?;
        debug!("Realtime channel open: {}", url);

        let (write, read) = ws_stream.split();
        let write = Arc::new(Mutex::new(write));

        // Ask for the current note state immediately
        {
            let mut w = write.lock().await;
            w.send(Message::Text(GetContent::new().to_json().into()))
                .await?;
        }

        let read_task = tokio::spawn(async move {
            Self::read_loop(seq, read, event_tx).await;
        });

        Ok(Self {
            write,
            read_task: Some(read_task),
        })
    }

    /// Read loop that decodes frames and forwards them to the session.
    async fn read_loop(
        seq: u64,
        mut read: futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
        event_tx: mpsc::UnboundedSender<ChannelEvent>,
    ) {
        loop {
            match read.next().await {
                Some(Ok(msg)) => {
                    let text = match msg {
                        Message::Text(text) => text.to_string(),
                        // Tolerate servers that frame JSON as binary
                        Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                            Ok(text) => text,
                            Err(_) => continue,
                        },
                        Message::Ping(_) | Message::Pong(_) => continue,
                        Message::Close(_) => {
                            debug!("Received close frame");
                            break;
                        }
                        Message::Frame(_) => continue,
                    };

                    // Malformed and unknown frames are dropped, not errors
                    match ServerMessage::decode(&text) {
                        Some(decoded) => {
                            if event_tx
                                .send(ChannelEvent {
                                    seq,
                                    kind: ChannelEventKind::Message(decoded),
                                })
                                .is_err()
                            {
                                // Session gone
                                return;
                            }
                        }
                        None => {
                            debug!("Dropping undecodable frame ({} bytes)", text.len());
                        }
                    }
                }
                Some(Err(e)) => {
                    match e {
                        WsError::ConnectionClosed | WsError::AlreadyClosed => {
                            debug!("Realtime channel closed");
                        }
                        _ => {
                            error!("Realtime channel error: {}", e);
                        }
                    }
                    break;
                }
                None => {
                    debug!("Realtime stream ended");
                    break;
                }
            }
        }

        let _ = event_tx.send(ChannelEvent {
            seq,
            kind: ChannelEventKind::Closed,
        });
    }

    /// Push a content update to the server.
    pub async fn send_update(&self, update: &ContentUpdate) -> Result<()> {
        let mut write = self.write.lock().await;
        write
            .send(Message::Text(update.to_json().into()))
            .await
            .map_err(|e| anyhow!("Failed to send update: {}", e))
    }

    /// Close the connection gracefully.
    pub async fn close(&mut self) {
        if let Ok(mut write) = self.write.try_lock() {
            let _ = write.send(Message::Close(None)).await;
        }

        if let Some(task) = self.read_task.take() {
            task.abort();
        }
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
    }
}
