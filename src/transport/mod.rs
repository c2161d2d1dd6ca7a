//! Datagram transport to the consumer
//!
//! Sending is best effort: one attempt per event, no acknowledgement, no retry,
//! no queue. Failures only come back to the caller so they can be counted.

pub mod udp_sender;

pub use udp_sender::UdpSender;

// Transport errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransportError {
    #[error("Failed to bind socket: {0}")]
    BindError(String),

    #[error("Socket buffer full, datagram dropped")]
    WouldBlock,

    #[error("Failed to send datagram: {0}")]
    SendError(String),

    #[error("Socket already closed")]
    Closed,
}

/// Destination for encoded datagrams
pub trait PacketSink: Send {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, TransportError>;

    // Release the underlying socket; later sends fail with `Closed`
    fn close(&mut self);
}
