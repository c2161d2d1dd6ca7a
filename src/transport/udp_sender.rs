use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tracing::{debug, info};

use crate::transport::{PacketSink, TransportError};

/// Fire-and-forget UDP sender.
///
/// The socket is non-blocking: a datagram the kernel cannot take right now is
/// reported back as an error for counting and never retried.
#[derive(Debug)]
pub struct UdpSender {
    socket: Option<UdpSocket>,
    destination: SocketAddr,
    sent: u64,
}

impl UdpSender {
    pub fn bind(destination: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if destination.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket =
            UdpSocket::bind(local).map_err(|e| TransportError::BindError(e.to_string()))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::BindError(e.to_string()))?;

        info!("UDP socket ready; sending to {}", destination);
        Ok(Self {
            socket: Some(socket),
            destination,
            sent: 0,
        })
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl PacketSink for UdpSender {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::Closed)?;
        match socket.send_to(datagram, self.destination) {
            Ok(written) => {
                self.sent += 1;
                Ok(written)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(TransportError::WouldBlock),
            Err(e) => Err(TransportError::SendError(e.to_string())),
        }
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!(
                "Closed UDP socket to {} after {} datagrams",
                self.destination, self.sent
            );
        }
    }
}
