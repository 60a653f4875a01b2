//! Wire protocol for the notepad backend.
//!
//! Two surfaces share these types:
//! - The realtime channel (`ws(s)://<base>/ws/:noteId`) carries JSON
//!   text frames discriminated by a `type` field.
//! - The REST endpoints (`GET`/`POST <base>/notes[/:id]`) carry the
//!   request/response bodies at the bottom of this module.
//!
//! These typed structs replace ad-hoc `serde_json::json!()` construction
//! and manual JSON parsing. Malformed or unknown frames decode to `None`
//! and are dropped by the caller rather than surfaced as errors.

use crate::note::NoteId;
use serde::{Deserialize, Serialize};

/// Maximum realtime frame size (1MB). A note is a single markdown
/// buffer; anything larger is dropped to bound memory use.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Client request for the current note content, sent once on connect.
///
/// Wire format: `{"type":"get_content"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetContent {
    #[serde(rename = "type")]
    msg_type: String,
}

impl GetContent {
    pub fn new() -> Self {
        Self {
            msg_type: "get_content".to_string(),
        }
    }

    /// Serialize to a JSON string for a text WebSocket frame.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("GetContent serialization should not fail")
    }

    /// Try to parse from a JSON frame.
    ///
    /// Returns `None` for non-JSON input or if the `type` field isn't
    /// `"get_content"`.
    pub fn from_json(data: &str) -> Option<Self> {
        let msg: Self = serde_json::from_str(data).ok()?;
        if msg.msg_type == "get_content" {
            Some(msg)
        } else {
            None
        }
    }
}

impl Default for GetContent {
    fn default() -> Self {
        Self::new()
    }
}

/// Server reply to `get_content`: the full current note state.
///
/// Wire format: `{"type":"initial_content","content":"...","lastUpdated":123}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialContent {
    #[serde(rename = "type")]
    msg_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<u64>,
}

impl InitialContent {
    pub fn new(content: impl Into<String>, last_updated: Option<u64>) -> Self {
        Self {
            msg_type: "initial_content".to_string(),
            content: content.into(),
            last_updated,
        }
    }

    /// Serialize to a JSON string for a text WebSocket frame.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("InitialContent serialization should not fail")
    }

    /// Try to parse from a JSON frame.
    pub fn from_json(data: &str) -> Option<Self> {
        let msg: Self = serde_json::from_str(data).ok()?;
        if msg.msg_type == "initial_content" {
            Some(msg)
        } else {
            None
        }
    }
}

/// A content change pushed over the realtime channel, in either direction.
///
/// Wire format:
/// `{"type":"content_update","noteId":"abc123","content":"...","sender":"..."}`
///
/// `sender` is the originating client's ID; a client ignores updates
/// whose sender is itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    #[serde(rename = "type")]
    msg_type: String,
    pub note_id: NoteId,
    pub content: String,
    pub sender: String,
}

impl ContentUpdate {
    pub fn new(note_id: NoteId, content: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            msg_type: "content_update".to_string(),
            note_id,
            content: content.into(),
            sender: sender.into(),
        }
    }

    /// Serialize to a JSON string for a text WebSocket frame.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ContentUpdate serialization should not fail")
    }

    /// Try to parse from a JSON frame.
    pub fn from_json(data: &str) -> Option<Self> {
        let msg: Self = serde_json::from_str(data).ok()?;
        if msg.msg_type == "content_update" {
            Some(msg)
        } else {
            None
        }
    }
}

/// A decoded frame received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    InitialContent(InitialContent),
    ContentUpdate(ContentUpdate),
    /// The server echoing a `get_content` (hub relay variants do this);
    /// harmless, ignored by the session.
    GetContent(GetContent),
}

impl ServerMessage {
    /// Classify an incoming text frame.
    ///
    /// Returns `None` for oversized, non-JSON, or unknown-`type` frames.
    pub fn decode(data: &str) -> Option<Self> {
        if data.len() > MAX_FRAME_SIZE {
            return None;
        }
        if let Some(msg) = InitialContent::from_json(data) {
            return Some(ServerMessage::InitialContent(msg));
        }
        if let Some(msg) = ContentUpdate::from_json(data) {
            return Some(ServerMessage::ContentUpdate(msg));
        }
        if let Some(msg) = GetContent::from_json(data) {
            return Some(ServerMessage::GetContent(msg));
        }
        None
    }
}

// ---------------------------------------------------------------------------
// REST bodies
// ---------------------------------------------------------------------------

/// `POST <base>/notes[/:id]` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub content: String,
}

/// `POST` success body: the server-side timestamp of the accepted write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub timestamp: u64,
}

/// Error body returned with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
