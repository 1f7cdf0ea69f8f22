//! Payload size gating.
//!
//! The transfer limit mirrors the server's ceiling; the local limit
//! can be lower on a constrained device. The two are checked
//! independently: outbound against both, inbound against the local
//! limit only (the server already enforced its own). Oversized
//! payloads are dropped with a log, never an error.

use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct PayloadGate {
    max_transfer_bytes: usize,
    max_local_bytes: usize,
}

impl PayloadGate {
    pub fn new(max_transfer_bytes: usize, max_local_bytes: usize) -> Self {
        Self {
            max_transfer_bytes,
            max_local_bytes,
        }
    }

    /// Whether a locally produced payload may be submitted.
    pub fn admit_outbound(&self, content: &str) -> bool {
        if content.is_empty() {
            return false;
        }
        let size = content.len();
        if size > self.max_transfer_bytes || size > self.max_local_bytes {
            warn!(size, "Dropping oversized outbound payload");
            return false;
        }
        true
    }

    /// Whether a received payload may be applied locally.
    pub fn admit_inbound(&self, content: &str) -> bool {
        if content.len() > self.max_local_bytes {
            warn!(size = content.len(), "Dropping oversized inbound payload");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_within_limits() {
        let gate = PayloadGate::new(100, 100);
        assert!(gate.admit_outbound("hello"));
        assert!(!gate.admit_outbound(""));
        assert!(!gate.admit_outbound(&"x".repeat(101)));
    }

    #[test]
    fn test_local_limit_lower_than_transfer() {
        let gate = PayloadGate::new(100, 10);
        assert!(!gate.admit_outbound(&"x".repeat(50)));
        assert!(!gate.admit_inbound(&"x".repeat(50)));
        assert!(gate.admit_inbound(&"x".repeat(10)));
    }

    #[test]
    fn test_inbound_ignores_transfer_limit() {
        // The server enforced its own ceiling already.
        let gate = PayloadGate::new(10, 100);
        assert!(gate.admit_inbound(&"x".repeat(50)));
    }
}
