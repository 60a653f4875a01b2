//! REST persistence client for the notepad backend.
//!
//! Implements the `NoteStore` seam over `GET`/`POST <base>/notes[/:id]`.
//! Network-level failures map to `StoreError::Unavailable` so the
//! session can fall back to the local draft cache; non-2xx responses
//! carry the backend's error body message.

use async_trait::async_trait;
use pad_core::note::{NoteId, NoteSnapshot};
use pad_core::protocol::{ErrorResponse, SaveRequest, SaveResponse};
use pad_core::store::{NoteStore, Result, StoreError};
use std::time::Duration;
use tracing::debug;

/// Request timeout. Long enough for a slow backend, short enough that
/// the fallback paths engage while the user is still looking.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the notepad REST API.
pub struct RestClient {
    http: reqwest::Client,
    base: String,
}

impl RestClient {
    /// Create a client for the given base URL (scheme + host, with or
    /// without a trailing slash).
    pub fn new(base: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Build the `/notes[/:id]` URL for a note.
    fn notes_url(&self, note_id: Option<&NoteId>) -> String {
        match note_id {
            Some(id) => format!("{}/notes/{}", self.base, id),
            None => format!("{}/notes", self.base),
        }
    }

    /// Extract the backend's error message from a non-2xx response,
    /// falling back to the status line when the body isn't the
    /// documented `{"message": ...}` shape.
    async fn rejection(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => format!("HTTP {}", status),
        };
        StoreError::Rejected { status, message }
    }
}

#[async_trait]
impl NoteStore for RestClient {
    async fn load(&self, note_id: Option<&NoteId>) -> Result<NoteSnapshot> {
        let url = self.notes_url(note_id);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        response
            .json::<NoteSnapshot>()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn save(&self, note_id: Option<&NoteId>, content: &str) -> Result<u64> {
        let url = self.notes_url(note_id);
        debug!("POST {} ({} bytes)", url, content.len());

        let response = self
            .http
            .post(&url)
            .json(&SaveRequest {
                content: content.to_string(),
            })
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body = response
            .json::<SaveResponse>()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;
        Ok(body.timestamp)
    }
}
