//! The one-line sync status surfaced to the user.

use std::fmt::{self, Display, Formatter};

/// Current state of the save/sync cycle, rendered as the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing loaded yet
    Idle,
    /// Initial load in flight
    Loading,
    /// Realtime channel open
    Live,
    /// Channel down, REST polling active
    Polling,
    /// Channel down, waiting out the reconnect delay
    Reconnecting,
    /// An edit is pending or a save is in flight
    Saving,
    /// Last save accepted by the backend at this timestamp (ms)
    Saved { at_ms: u64 },
    /// Last save failed and only the local draft holds the content
    SaveFailed,
    /// Backend unreachable and no fallback succeeded; editing continues
    /// locally
    Offline,
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => write!(f, "idle"),
            Status::Loading => write!(f, "loading..."),
            Status::Live => write!(f, "live"),
            Status::Polling => write!(f, "polling"),
            Status::Reconnecting => write!(f, "reconnecting..."),
            Status::Saving => write!(f, "saving..."),
            Status::Saved { .. } => write!(f, "saved"),
            Status::SaveFailed => write!(f, "save failed"),
            Status::Offline => write!(f, "offline"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_displays_without_timestamp() {
        assert_eq!(Status::Saved { at_ms: 123 }.to_string(), "saved");
    }

    #[test]
    fn test_failure_states() {
        assert_eq!(Status::SaveFailed.to_string(), "save failed");
        assert_eq!(Status::Offline.to_string(), "offline");
    }
}
