//! An event-driven WebSocket client session engine for `tokio`.
//!
//! This crate owns the *session*: the HTTP/1.1 opening handshake, an ordered
//! single-writer outbound queue, keepalive pings, the bidirectional close
//! handshake and exactly-once teardown. It deliberately does not own the
//! frame codec; any reader/writer pair implementing [`FrameReader`] and
//! [`FrameWriter`] can carry a session, and the `mock` module ships a
//! scripted pair for tests.
//!
//! The caller talks to a session through two halves: a cloneable
//! [`WebSocket`] handle whose operations ([`WebSocket::send_text`],
//! [`WebSocket::close`], ...) never block, and an [`EventReceiver`] on which
//! messages and lifecycle events arrive.

#![deny(missing_debug_implementations)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Example
//!
//! Driving a session over the scripted mock codec; a real client would call
//! [`WebSocket::connect`] with a TCP or TLS stream and its codec instead.
//!
//! ```
//! use wsession::{Event, SessionConfig, WebSocket, mock};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let (reader, writer, script, log) = mock::pair();
//!     let (socket, mut events) = WebSocket::start(reader, writer, SessionConfig::default());
//!
//!     assert!(socket.send_text("hello"));
//!
//!     // The peer closes; we answer, and the session winds down cleanly.
//!     script.close(1000, "bye");
//!     match events.recv().await {
//!         Some(Event::Closing { code, .. }) => assert_eq!(code, 1000),
//!         other => panic!("unexpected event: {other:?}"),
//!     }
//!
//!     socket.close(1000, "bye").expect("legal close code");
//!     match events.recv().await {
//!         Some(Event::Closed { code, .. }) => assert_eq!(code, 1000),
//!         other => panic!("unexpected event: {other:?}"),
//!     }
//!
//!     // Everything we wrote, in order.
//!     assert_eq!(log.frames().len(), 2);
//! }
//! ```

mod close_code;
pub use close_code::CloseCode;

mod codec;
pub use codec::{FrameCallback, FrameReader, FrameWriter};

mod error;
pub use error::Error;

mod event;
pub use event::{Event, EventReceiver};

pub mod handshake;

pub mod http;

mod keepalive;

mod message;
pub use message::Message;

#[doc(hidden)]
pub mod mock;

mod opcode;
pub use opcode::OpCode;

mod options;
pub use options::{MAX_QUEUE_SIZE, SessionConfig};

mod queue;

mod session;
pub use session::WebSocket;
