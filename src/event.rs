use tokio::sync::mpsc;

use crate::{Error, Message};

/// What the session reports back to its owner.
///
/// Events are delivered over a channel rather than through reentrant
/// callbacks, so caller code never runs under the session's internal lock.
/// Exactly one of [`Event::Closed`] / [`Event::Failure`] is emitted per
/// session lifetime, never both and never twice.
#[derive(Debug)]
pub enum Event {
    /// An inbound text or binary message.
    Message(Message),
    /// The peer sent a close frame; the session is shutting down.
    Closing {
        /// The peer's close code, or 1005 if its frame carried none.
        code: u16,
        /// The peer's close reason, possibly empty.
        reason: String,
    },
    /// Both directions of the close handshake completed cleanly.
    Closed {
        /// The peer's close code, or 1005 if its frame carried none.
        code: u16,
        /// The peer's close reason, possibly empty.
        reason: String,
    },
    /// The session failed; no further events follow.
    Failure(Error),
}

/// Receiving side of the session's event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub(crate) type EventSender = mpsc::UnboundedSender<Event>;
