use thiserror::Error;

/// Errors while decoding a datagram
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("Empty datagram")]
    Empty,

    #[error("Unknown packet tag: 0x{0:02x}")]
    UnknownTag(u8),

    #[error("Packet 0x{tag:02x} must be {expected} bytes, got {actual}")]
    LengthMismatch {
        tag: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Malformed button command: {0}")]
    MalformedCommand(String),

    #[error("Unknown button: {0}")]
    UnknownButton(String),

    #[error("Invalid button state: {0}")]
    InvalidState(u8),
}
