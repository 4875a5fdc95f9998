use std::time::Duration;

/// Hard cap on buffered, unwritten message payload bytes.
pub const MAX_QUEUE_SIZE: u64 = 16 * 1024 * 1024;

/// Per-session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Keepalive ping period. Zero disables keepalive entirely.
    pub ping_interval: Duration,
    /// Backpressure cap: a message whose admission would push the queued
    /// byte total past this triggers a self-initiated 1001 close.
    pub max_queue_size: u64,
    /// After sending a close, how long to wait for the peer's close frame
    /// before forcibly cancelling the connection.
    pub close_grace_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ping_interval: Duration::ZERO,
            max_queue_size: MAX_QUEUE_SIZE,
            close_grace_period: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    /// Sets the keepalive ping period.
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Sets the outbound queue cap in bytes.
    pub fn with_max_queue_size(mut self, bytes: u64) -> Self {
        self.max_queue_size = bytes;
        self
    }

    /// Sets the close-handshake grace period.
    pub fn with_close_grace_period(mut self, grace: Duration) -> Self {
        self.close_grace_period = grace;
        self
    }
}
