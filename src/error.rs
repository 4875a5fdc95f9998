use crate::http::Response;

/// Errors produced by the session engine.
///
/// [`Error::InvalidRequest`] and [`Error::IllegalArgument`] are surfaced
/// synchronously and leave the session untouched. The remaining variants are
/// terminal: they are routed through the idempotent failure path and end the
/// session with a single [`Event::Failure`](crate::Event::Failure).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The upgrade request is not a no-body GET.
    #[error("invalid upgrade request: {0}")]
    InvalidRequest(String),

    /// The server's upgrade response violated the WebSocket handshake.
    #[error("{message}")]
    Protocol {
        /// What the handshake expected versus what arrived.
        message: String,
        /// The offending response, when one was read off the wire.
        response: Option<Box<Response>>,
    },

    /// A close code or close reason that is illegal to send.
    #[error("{0}")]
    IllegalArgument(String),

    /// A ping went unanswered for a full keepalive interval.
    #[error(
        "sent ping but didn't receive pong within {interval_ms}ms (after {successful_pings} successful ping/pongs)"
    )]
    PongTimeout {
        /// The configured keepalive period.
        interval_ms: u64,
        /// Ping/pong exchanges completed before the miss.
        successful_pings: u64,
    },

    /// Read or write fault on the underlying stream.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The session was torn down by [`WebSocket::cancel`](crate::WebSocket::cancel)
    /// or by the close-handshake grace period expiring.
    #[error("canceled")]
    Canceled,
}

impl Error {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol {
            message: message.into(),
            response: None,
        }
    }

    pub(crate) fn protocol_with_response(message: impl Into<String>, response: &Response) -> Self {
        Error::Protocol {
            message: message.into(),
            response: Some(Box::new(response.clone())),
        }
    }
}
