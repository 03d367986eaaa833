use crate::capture::{Injector, PacketSource, TransportError};
use crate::rawsocket::socket;
use std::net::Ipv4Addr;
use std::os::fd::OwnedFd;
use std::time::Duration;

const MAX_DATAGRAM: usize = 65535;

/// Captures IP traffic in both directions through a packet socket.
#[derive(Debug)]
pub struct RawCapture {
    recv_fd: OwnedFd,
    buf: Vec<u8>,
}

impl RawCapture {
    pub fn open() -> Result<Self, TransportError> {
        Ok(RawCapture {
            recv_fd: socket::new_packet_socket()?,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }
}

impl PacketSource for RawCapture {
    fn next_packet(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        socket::set_timeout(&self.recv_fd, timeout)?;
        let received = socket::recv_datagram(&self.recv_fd, &mut self.buf)?;
        Ok(received.map(|n| self.buf[..n].to_vec()))
    }
}

/// Sends forged datagrams through an IPPROTO_RAW socket.
#[derive(Debug)]
pub struct RawInjector {
    send_fd: OwnedFd,
}

impl RawInjector {
    pub fn open() -> Result<Self, TransportError> {
        Ok(RawInjector {
            send_fd: socket::new_send_socket()?,
        })
    }
}

impl Injector for RawInjector {
    fn send(&mut self, datagram: &[u8], dst: Ipv4Addr) -> Result<(), TransportError> {
        let sent = socket::send_datagram(&self.send_fd, datagram, dst)?;
        if sent != datagram.len() {
            return Err(TransportError::ShortSend { sent, expected: datagram.len() });
        }
        Ok(())
    }
}
