//! Sync state machine: connection state, debounce, reconnect, polling.
//!
//! All timing state is driven by a caller-supplied `now_ms` clock so the
//! machine is testable without timers. The session owns one of each of
//! these and advances them from its event loop tick.

use std::time::Duration;
use tracing::debug;

/// State of the realtime channel for the current note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No active note, or not yet started
    Idle,
    /// Attempting to open the realtime channel
    Connecting,
    /// Channel open, updates flow both ways
    Connected,
    /// Channel lost, waiting out the fixed reconnect delay
    ReconnectWait,
    /// Channel unavailable, REST polling is the active transport.
    /// Reconnect attempts continue in the background.
    Polling,
}

/// Fixed timing configuration for the sync client.
///
/// Reconnection uses a flat delay rather than exponential backoff: the
/// channel is retried indefinitely while a note ID is current, and the
/// polling fallback keeps the note fresh in the meantime.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Quiet period that must elapse after the last edit before an
    /// outgoing save/update is sent
    pub debounce_window: Duration,
    /// Delay between reconnect attempts
    pub reconnect_delay: Duration,
    /// Interval between polling fetches while the channel is down
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(500),
            reconnect_delay: Duration::from_secs(3),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Collapses a burst of edits into a single outgoing send.
///
/// Each edit replaces the pending content and pushes the deadline out by
/// the debounce window; once the deadline passes, `flush_due` hands back
/// the final buffer state exactly once.
#[derive(Debug, Clone, Default)]
pub struct DebounceState {
    pending: Option<String>,
    deadline: Option<u64>,
}

impl DebounceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit. The pending content is replaced, not queued.
    pub fn record_edit(&mut self, content: String, now_ms: u64, config: &SyncConfig) {
        self.pending = Some(content);
        self.deadline = Some(now_ms + config.debounce_window.as_millis() as u64);
    }

    /// Take the pending content if the quiet period has elapsed.
    pub fn flush_due(&mut self, now_ms: u64) -> Option<String> {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Whether an edit is waiting to be sent.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any pending edit (used when switching notes).
    pub fn clear(&mut self) {
        self.pending = None;
        self.deadline = None;
    }
}

/// Fixed-delay reconnect schedule for the realtime channel.
#[derive(Debug, Clone, Default)]
pub struct ReconnectSchedule {
    attempts: u32,
    next_attempt_at: Option<u64>,
}

impl ReconnectSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the next attempt one reconnect delay from now.
    pub fn schedule(&mut self, now_ms: u64, config: &SyncConfig) {
        self.attempts += 1;
        self.next_attempt_at = Some(now_ms + config.reconnect_delay.as_millis() as u64);
        debug!("Reconnect attempt {} scheduled", self.attempts);
    }

    /// Check if it's time to attempt a reconnect.
    pub fn due(&self, now_ms: u64) -> bool {
        self.next_attempt_at.map(|t| now_ms >= t).unwrap_or(false)
    }

    /// Reset after a successful connection (or a note switch).
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.next_attempt_at = None;
    }

    /// Number of attempts since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Fixed-interval schedule for the polling fallback.
#[derive(Debug, Clone, Default)]
pub struct PollSchedule {
    next_fetch_at: Option<u64>,
}

impl PollSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling. The first fetch is due immediately.
    pub fn start(&mut self, now_ms: u64) {
        if self.next_fetch_at.is_none() {
            debug!("Polling fallback engaged");
            self.next_fetch_at = Some(now_ms);
        }
    }

    /// Stop polling (channel recovered, or note switched).
    pub fn stop(&mut self) {
        if self.next_fetch_at.take().is_some() {
            debug!("Polling fallback disengaged");
        }
    }

    pub fn is_active(&self) -> bool {
        self.next_fetch_at.is_some()
    }

    /// If a fetch is due, advance to the next interval and return true.
    pub fn take_due(&mut self, now_ms: u64, config: &SyncConfig) -> bool {
        match self.next_fetch_at {
            Some(at) if now_ms >= at => {
                self.next_fetch_at = Some(now_ms + config.poll_interval.as_millis() as u64);
                true
            }
            _ => false,
        }
    }
}
