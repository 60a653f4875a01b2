//! Note identity and URL path routing.
//!
//! A note is identified by a short alphanumeric ID taken from the URL
//! path of the original notepad (`/abc123`). IDs are created implicitly
//! on first save; the landing page has no ID and persistence is
//! disabled there.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NoteIdError {
    #[error("Invalid note ID length: expected 6-8 characters, got {0}")]
    InvalidLength(usize),
    #[error("Invalid note ID: must be ASCII alphanumeric")]
    InvalidCharacter,
}

/// A short alphanumeric identifier for a note.
///
/// Parsing accepts 6-8 ASCII alphanumerics; generated IDs are always
/// 6 lowercase alphanumerics so they stay routable as a URL path.
///
/// # Examples
/// ```
/// use pad_core::NoteId;
///
/// let id: NoteId = "abc123".parse().unwrap();
/// assert_eq!(id.as_str(), "abc123");
///
/// assert_eq!(NoteId::from_path("/abc123"), Some(id));
/// assert_eq!(NoteId::from_path("/"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteId(String);

/// Alphabet for generated IDs. Lowercase keeps IDs shell- and URL-friendly.
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated IDs. Matches the URL routing convention of
/// exactly one slash plus six characters.
const GENERATED_LEN: usize = 6;

impl NoteId {
    /// Generate a new random 6-character note ID.
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let id: String = (0..GENERATED_LEN)
            .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Extract a note ID from a URL path.
    ///
    /// Only a path of exactly one leading slash plus six alphanumeric
    /// characters names a note. Everything else (the root landing page,
    /// longer paths, nested paths) yields `None`, which disables
    /// persistence for the session.
    pub fn from_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix('/')?;
        if rest.len() == GENERATED_LEN && rest.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(Self(rest.to_string()))
        } else {
            None
        }
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = NoteIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !(6..=8).contains(&s.len()) {
            return Err(NoteIdError::InvalidLength(s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(NoteIdError::InvalidCharacter);
        }
        Ok(Self(s.to_string()))
    }
}

// Serialize as the plain string for consistency in logs, errors, JSON
impl serde::Serialize for NoteId {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NoteId {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A unique identifier for this client instance.
///
/// Stamped on outgoing `content_update` messages as the `sender` field
/// so a client can recognize and ignore its own echoes. Wraps a u64 but
/// displays as a 16-character hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    /// Generate a new random client ID. Never returns zero.
    pub fn generate() -> Self {
        use rand::Rng;
        loop {
            let id: u64 = rand::rng().random();
            if id != 0 {
                return Self(id);
            }
        }
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The backend's view of a note: its markdown source plus the server-side
/// timestamp of the last accepted write (ms since epoch). Some backend
/// variants omit the timestamp on reads.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSnapshot {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_six_chars() {
        let id: NoteId = "abc123".parse().unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn test_parse_eight_chars() {
        let id: NoteId = "abcd1234".parse().unwrap();
        assert_eq!(id.as_str(), "abcd1234");
    }

    #[test]
    fn test_reject_wrong_length() {
        assert!("abc12".parse::<NoteId>().is_err()); // 5 chars
        assert!("abcd12345".parse::<NoteId>().is_err()); // 9 chars
        assert!("".parse::<NoteId>().is_err());
    }

    #[test]
    fn test_reject_non_alphanumeric() {
        assert!("abc-12".parse::<NoteId>().is_err());
        assert!("abc 12".parse::<NoteId>().is_err());
        assert!("abc12é".parse::<NoteId>().is_err());
    }

    #[test]
    fn test_from_path_note() {
        let id = NoteId::from_path("/abc123").unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn test_from_path_landing_page() {
        assert_eq!(NoteId::from_path("/"), None);
        assert_eq!(NoteId::from_path(""), None);
    }

    #[test]
    fn test_from_path_wrong_length() {
        // Exactly one slash plus six characters, nothing else
        assert_eq!(NoteId::from_path("/abc12"), None);
        assert_eq!(NoteId::from_path("/abc1234"), None);
        assert_eq!(NoteId::from_path("/abc123/"), None);
        assert_eq!(NoteId::from_path("/a/b/cd"), None);
    }

    #[test]
    fn test_from_path_no_leading_slash() {
        assert_eq!(NoteId::from_path("abc123"), None);
    }

    #[test]
    fn test_generate_is_routable() {
        for _ in 0..100 {
            let id = NoteId::generate();
            let path = format!("/{}", id);
            assert_eq!(NoteId::from_path(&path), Some(id));
        }
    }

    #[test]
    fn test_note_id_serde_roundtrip() {
        let id: NoteId = "abc123".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc123\"");
        let parsed: NoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_client_id_display_hex() {
        let id = ClientId(0xa1b2c3d4e5f67890);
        assert_eq!(id.to_string(), "a1b2c3d4e5f67890");
    }

    #[test]
    fn test_client_id_zero_padded() {
        let id = ClientId(0xff);
        assert_eq!(id.to_string(), "00000000000000ff");
    }

    #[test]
    fn test_client_id_generate_not_zero() {
        for _ in 0..1000 {
            assert_ne!(ClientId::generate().0, 0);
        }
    }

    #[test]
    fn test_snapshot_optional_timestamp() {
        let json = r##"{"content":"# hi"}"##;
        let snap: NoteSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.content, "# hi");
        assert!(snap.last_updated.is_none());

        let json = r#"{"content":"x","lastUpdated":1234}"#;
        let snap: NoteSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.last_updated, Some(1234));
    }

    #[test]
    fn test_snapshot_empty_body() {
        // A fresh note comes back with no fields at all in one variant
        let snap: NoteSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snap.content, "");
    }
}
