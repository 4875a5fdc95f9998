use bytes::Bytes;

use crate::OpCode;

/// An inbound data message delivered to the caller.
///
/// Control frames (ping/pong/close) are handled by the session itself and
/// never surface as a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A complete UTF-8 text message.
    Text(String),
    /// A complete binary message.
    Binary(Bytes),
}

impl Message {
    /// Indicates whether this is a text message.
    pub fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    /// Indicates whether this is a binary message.
    pub fn is_binary(&self) -> bool {
        matches!(self, Message::Binary(_))
    }

    /// The data opcode this message travels under.
    pub const fn opcode(&self) -> OpCode {
        match self {
            Message::Text(_) => OpCode::Text,
            Message::Binary(_) => OpCode::Binary,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Message::Text(text) => text.len(),
            Message::Binary(payload) => payload.len(),
        }
    }

    /// Returns true if the message has no content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
