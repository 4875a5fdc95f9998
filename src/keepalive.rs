/// Ping/pong liveness accounting.
///
/// Invariant: `awaiting_pong` is true iff a ping was sent and no pong has
/// arrived since. The timer itself lives in the writer task; this is only
/// the state it consults each tick.
#[derive(Debug, Default)]
pub(crate) struct KeepaliveState {
    sent_ping_count: u64,
    received_ping_count: u64,
    received_pong_count: u64,
    awaiting_pong: bool,
}

/// What a keepalive tick decided.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Send a fresh empty ping.
    SendPing,
    /// The previous ping was never answered; fail the session. Carries the
    /// count of prior successful exchanges for the error message.
    MissedPong { successful: u64 },
}

impl KeepaliveState {
    pub(crate) fn on_tick(&mut self) -> Tick {
        if self.awaiting_pong {
            return Tick::MissedPong {
                successful: self.received_pong_count,
            };
        }

        self.sent_ping_count += 1;
        self.awaiting_pong = true;

        Tick::SendPing
    }

    pub(crate) fn record_ping_received(&mut self) {
        self.received_ping_count += 1;
    }

    pub(crate) fn record_pong_received(&mut self) {
        self.awaiting_pong = false;
        self.received_pong_count += 1;
    }

    pub(crate) fn sent_ping_count(&self) -> u64 {
        self.sent_ping_count
    }

    pub(crate) fn received_ping_count(&self) -> u64 {
        self.received_ping_count
    }

    pub(crate) fn received_pong_count(&self) -> u64 {
        self.received_pong_count
    }
}
