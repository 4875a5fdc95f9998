use crate::error::Error;

/// A WebSocket close code, as carried by a close frame.
#[repr(u16)]
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// Normal closure; the purpose of the connection has been fulfilled.
    Normal = 1000,
    /// The endpoint is going away (server shutdown, page navigated away,
    /// or, in this crate, the outbound queue overflowed its cap).
    Away = 1001,
    /// Terminating because of a protocol error.
    Protocol = 1002,
    /// Received a type of data the endpoint cannot accept.
    Unsupported = 1003,
    /// Reserved: no close code was present in the close frame.
    Status = 1005,
    /// Reserved: the connection dropped without a close frame.
    Abnormal = 1006,
    /// Received data inconsistent with the message type.
    Invalid = 1007,
    /// Received a message that violates the endpoint's policy.
    Policy = 1008,
    /// Received a message too big to process.
    Size = 1009,
    /// The server did not negotiate a required extension.
    Extension = 1010,
    /// The server encountered an unexpected condition.
    Error = 1011,
    /// The server is restarting.
    Restart = 1012,
    /// The server is overloaded; try again later or elsewhere.
    Again = 1013,
    #[doc(hidden)]
    Tls = 1015,
    #[doc(hidden)]
    Reserved(u16),
    #[doc(hidden)]
    Iana(u16),
    #[doc(hidden)]
    Library(u16),
    #[doc(hidden)]
    Bad(u16),
}

impl CloseCode {
    /// Whether this code may legally be sent in a close frame.
    ///
    /// The reserved codes (1004–1006, 1015 and the unassigned 1xxx range)
    /// exist only for reporting and must never be put on the wire.
    pub const fn is_allowed(self) -> bool {
        !matches!(
            self,
            CloseCode::Bad(_)
                | CloseCode::Reserved(_)
                | CloseCode::Status
                | CloseCode::Abnormal
                | CloseCode::Tls
        )
    }

    /// Classifies a raw close code.
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::Away,
            1002 => Self::Protocol,
            1003 => Self::Unsupported,
            1005 => Self::Status,
            1006 => Self::Abnormal,
            1007 => Self::Invalid,
            1008 => Self::Policy,
            1009 => Self::Size,
            1010 => Self::Extension,
            1011 => Self::Error,
            1012 => Self::Restart,
            1013 => Self::Again,
            1015 => Self::Tls,
            1004 | 1014 | 1016..=2999 => Self::Reserved(code),
            3000..=3999 => Self::Iana(code),
            4000..=4999 => Self::Library(code),
            _ => Self::Bad(code),
        }
    }

    /// The raw close code.
    pub const fn into_u16(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::Away => 1001,
            Self::Protocol => 1002,
            Self::Unsupported => 1003,
            Self::Status => 1005,
            Self::Abnormal => 1006,
            Self::Invalid => 1007,
            Self::Policy => 1008,
            Self::Size => 1009,
            Self::Extension => 1010,
            Self::Error => 1011,
            Self::Restart => 1012,
            Self::Again => 1013,
            Self::Tls => 1015,
            Self::Reserved(code) => code,
            Self::Iana(code) => code,
            Self::Library(code) => code,
            Self::Bad(code) => code,
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> u16 {
        code.into_u16()
    }
}

/// Validates a close code for sending, with the offending value in the error.
pub(crate) fn validate_close_code(code: u16) -> Result<(), Error> {
    if !(1000..5000).contains(&code) {
        return Err(Error::IllegalArgument(format!(
            "code must be in range [1000, 5000): {code}"
        )));
    }

    if !CloseCode::from_u16(code).is_allowed() {
        return Err(Error::IllegalArgument(format!(
            "code {code} is reserved and may not be used"
        )));
    }

    Ok(())
}
