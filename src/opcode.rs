/// The opcode of a WebSocket frame.
///
/// Fragmentation is the codec's concern, so continuation frames never cross
/// the codec seam and have no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// A UTF-8 text frame.
    Text,
    /// A binary frame.
    Binary,
    /// A close control frame.
    Close,
    /// A ping control frame.
    Ping,
    /// A pong control frame.
    Pong,
}

impl OpCode {
    /// Whether this is a control opcode.
    pub fn is_control(&self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}
