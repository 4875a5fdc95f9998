//! The seam between the session engine and the frame codec.
//!
//! The engine drives the codec but does not define the byte format: any
//! implementation that can read one frame at a time and write control/data
//! frames can carry a session. The reader and writer halves are separate
//! objects (the "stream pair") owned exclusively by the session's reader
//! and writer tasks once the session starts.

use std::future::Future;
use std::io;

use bytes::Bytes;

use crate::{Error, OpCode};

/// Callbacks the reader dispatches into, one frame per
/// [`FrameReader::process_next_frame`] call.
///
/// Implementations must be quick and non-blocking; the session's own
/// implementation only touches in-memory state and channels.
pub trait FrameCallback: Send {
    /// A complete text message.
    fn on_text(&mut self, text: String);

    /// A complete binary message.
    fn on_binary(&mut self, payload: Bytes);

    /// A ping frame; the session answers it with a pong.
    fn on_ping(&mut self, payload: Bytes);

    /// A pong frame.
    fn on_pong(&mut self, payload: Bytes);

    /// A close frame. `code` is the peer's close code, or 1005 when the
    /// frame carried no payload.
    fn on_close(&mut self, code: u16, reason: String);
}

/// The inbound half of the frame codec.
pub trait FrameReader: Send + 'static {
    /// Reads exactly one frame and dispatches it into `callback`.
    ///
    /// Resolves after the callback returns. Errors on a malformed frame
    /// ([`Error::Protocol`]) or a dead stream ([`Error::Io`]); either ends
    /// the session through the failure path.
    fn process_next_frame(
        &mut self,
        callback: &mut dyn FrameCallback,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// The outbound half of the frame codec.
///
/// The session guarantees these are never invoked concurrently: all writes
/// are funneled through one writer task.
pub trait FrameWriter: Send + 'static {
    /// Writes one ping frame.
    fn write_ping(&mut self, payload: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Writes one pong frame.
    fn write_pong(&mut self, payload: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Writes one close frame carrying `code` and `reason`.
    fn write_close(
        &mut self,
        code: u16,
        reason: &str,
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Writes one complete data frame: opens a message sink for `opcode`,
    /// writes the full payload and closes the sink.
    fn write_message(
        &mut self,
        opcode: OpCode,
        payload: &[u8],
    ) -> impl Future<Output = io::Result<()>> + Send;
}
