//! Clipboard poll loop for platforms without change notifications.
//!
//! The platform clipboard is behind [`ClipboardAccess`]; the embedding
//! application supplies the real one and applies inbound events
//! through the same implementation. The watcher only reads: change
//! detection and echo suppression happen inside
//! [`ConnectionHandle::poll_clipboard`], so the poll task and the
//! inbound-event task never race on the last known value.

use std::time::Duration;

use tracing::debug;

use crate::connection::ConnectionHandle;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Read/write access to the platform clipboard.
pub trait ClipboardAccess: Send + Sync {
    /// Current text content, `None` when empty or unreadable.
    fn read_text(&self) -> Option<String>;
    fn write_text(&self, content: &str);
}

pub struct ClipboardWatcher<A: ClipboardAccess> {
    access: A,
    handle: ConnectionHandle,
    interval: Duration,
}

impl<A: ClipboardAccess> ClipboardWatcher<A> {
    pub fn new(access: A, handle: ConnectionHandle) -> Self {
        Self {
            access,
            handle,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One poll step. Returns whether a change was submitted.
    pub async fn poll_once(&self) -> bool {
        let Some(text) = self.access.read_text() else {
            return false;
        };
        let submitted = self.handle.poll_clipboard(&text).await;
        if submitted {
            debug!(size = text.len(), "Local clipboard change submitted");
        }
        submitted
    }

    /// Poll until the connection driver goes away.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}
