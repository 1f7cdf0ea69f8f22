//! Self-echo suppression.
//!
//! Two cooperating pieces share one owner: the last-applied clipboard
//! value, compared on every poll so an inbound apply is never
//! re-detected as a local change, and a one-shot flag that swallows
//! the next inbound image after a local image submission. Both poll
//! and inbound apply go through this struct, which keeps the two
//! racing tasks from re-broadcasting each other's writes.

use clipsync_shared::types::ClipboardKind;

#[derive(Debug, Default)]
pub struct LocalClipboard {
    last_value: Option<String>,
    block_next_image: bool,
}

impl LocalClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the poll loop with the current clipboard content.
    /// Returns `Some` only when the value is genuinely new and should
    /// be submitted.
    pub fn detect_change(&mut self, current: &str) -> Option<String> {
        if current.is_empty() {
            return None;
        }
        if self.last_value.as_deref() == Some(current) {
            return None;
        }
        self.last_value = Some(current.to_string());
        Some(current.to_string())
    }

    /// Called after a local submission so the next poll does not
    /// re-detect it. Arming the image block here mirrors the original
    /// client: the relay may reflect image metadata straight back.
    pub fn note_submitted(&mut self, content: &str, kind: ClipboardKind) {
        self.last_value = Some(content.to_string());
        if kind == ClipboardKind::Image {
            self.block_next_image = true;
        }
    }

    /// Called with an inbound event before applying it. Returns `false`
    /// when the event must be swallowed (one-shot image block). An
    /// accepted event becomes the last known value so the poll loop
    /// will not echo it back.
    pub fn accept_inbound(&mut self, content: &str, kind: ClipboardKind) -> bool {
        if kind == ClipboardKind::Image && self.block_next_image {
            self.block_next_image = false;
            return false;
        }
        self.last_value = Some(content.to_string());
        true
    }

    /// Connection teardown clears the one-shot flag unconditionally.
    pub fn reset_on_close(&mut self) {
        self.block_next_image = false;
    }

    pub fn last_value(&self) -> Option<&str> {
        self.last_value.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_detects_new_value_once() {
        let mut clip = LocalClipboard::new();
        assert_eq!(clip.detect_change("hello"), Some("hello".to_string()));
        assert_eq!(clip.detect_change("hello"), None);
        assert_eq!(clip.detect_change("world"), Some("world".to_string()));
    }

    #[test]
    fn test_empty_never_detected() {
        let mut clip = LocalClipboard::new();
        assert_eq!(clip.detect_change(""), None);
    }

    #[test]
    fn test_inbound_apply_not_rebroadcast() {
        let mut clip = LocalClipboard::new();
        assert!(clip.accept_inbound("from-peer", ClipboardKind::Text));
        // The poll sees the applied value and stays quiet.
        assert_eq!(clip.detect_change("from-peer"), None);
    }

    #[test]
    fn test_image_block_is_one_shot() {
        let mut clip = LocalClipboard::new();
        clip.note_submitted("img-a", ClipboardKind::Image);

        assert!(!clip.accept_inbound("img-echo", ClipboardKind::Image));
        // Consumed; the next image goes through.
        assert!(clip.accept_inbound("img-b", ClipboardKind::Image));
    }

    #[test]
    fn test_image_block_does_not_swallow_text() {
        let mut clip = LocalClipboard::new();
        clip.note_submitted("img-a", ClipboardKind::Image);
        assert!(clip.accept_inbound("plain text", ClipboardKind::Text));
        // Flag still armed for the next image.
        assert!(!clip.accept_inbound("img-echo", ClipboardKind::Image));
    }

    #[test]
    fn test_close_clears_block() {
        let mut clip = LocalClipboard::new();
        clip.note_submitted("img-a", ClipboardKind::Image);
        clip.reset_on_close();
        assert!(clip.accept_inbound("img-b", ClipboardKind::Image));
    }

    #[test]
    fn test_submission_not_redetected() {
        let mut clip = LocalClipboard::new();
        clip.note_submitted("local", ClipboardKind::Text);
        assert_eq!(clip.detect_change("local"), None);
    }
}
