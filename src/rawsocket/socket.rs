use nix::errno::Errno;
use nix::sys::socket::sockopt::{RcvBuf, ReceiveTimeout};
use nix::sys::socket::{
    bind, recv, send, sendto, setsockopt, socket, AddressFamily, MsgFlags, NetlinkAddr, SockFlag, SockProtocol,
    SockType, SockaddrIn,
};
use nix::sys::time::{TimeVal, TimeValLike};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Duration;

const RECV_BUF_SIZE: usize = 1024 * 1024 * 2;

/// Raw IPv4 socket for complete datagrams; IPPROTO_RAW implies IP_HDRINCL.
pub fn new_send_socket() -> Result<OwnedFd, Errno> {
    socket(AddressFamily::Inet, SockType::Raw, SockFlag::empty(), SockProtocol::Raw)
}

/// Link-layer socket with the link header stripped: every IP datagram sent
/// or received on any interface, outgoing ones included. Non-IPv4 payloads
/// (ARP, IPv6) arrive too and are left for the caller to discard.
pub fn new_packet_socket() -> Result<OwnedFd, Errno> {
    let sock_fd = socket(AddressFamily::Packet, SockType::Datagram, SockFlag::empty(), SockProtocol::EthAll)?;
    setsockopt(&sock_fd, RcvBuf, &RECV_BUF_SIZE)?;
    Ok(sock_fd)
}

/// Netlink socket bound to a kernel-assigned port id.
pub fn new_netlink_socket(protocol: SockProtocol) -> Result<OwnedFd, Errno> {
    let sock_fd = socket(AddressFamily::Netlink, SockType::Raw, SockFlag::empty(), protocol)?;
    bind(sock_fd.as_raw_fd(), &NetlinkAddr::new(0, 0))?;
    setsockopt(&sock_fd, RcvBuf, &RECV_BUF_SIZE)?;
    Ok(sock_fd)
}

/// Bound the next blocking receives on `fd` by `duration`.
pub fn set_timeout(fd: &OwnedFd, duration: Duration) -> Result<(), Errno> {
    // Zero would mean "no timeout" to the kernel
    let micros = duration.as_micros().clamp(1, i64::MAX as u128) as i64;
    setsockopt(fd, ReceiveTimeout, &TimeVal::microseconds(micros))
}

/// Send a datagram that already carries its IP header.
pub fn send_datagram(fd: &OwnedFd, datagram: &[u8], dst: Ipv4Addr) -> Result<usize, Errno> {
    let addr = SockaddrIn::from(SocketAddrV4::new(dst, 0));
    sendto(fd.as_raw_fd(), datagram, &addr, MsgFlags::empty())
}

/// Send on a connected or bound socket (netlink requests).
pub fn send_message(fd: &OwnedFd, message: &[u8]) -> Result<usize, Errno> {
    send(fd.as_raw_fd(), message, MsgFlags::empty())
}

/// Receive one datagram into `buf`, or `None` if the receive timeout expired.
pub fn recv_datagram(fd: &OwnedFd, buf: &mut [u8]) -> Result<Option<usize>, Errno> {
    loop {
        match recv(fd.as_raw_fd(), buf, MsgFlags::empty()) {
            Ok(n) => return Ok(Some(n)),
            Err(Errno::EINTR) => continue,
            Err(Errno::EAGAIN) => return Ok(None),
            Err(err) => return Err(err),
        }
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_socket_opens_when_permitted() {
        match new_packet_socket() {
            Ok(fd) => set_timeout(&fd, Duration::from_millis(10)).unwrap(),
            // Needs CAP_NET_RAW
            Err(Errno::EPERM) | Err(Errno::EACCES) => {}
            Err(err) => panic!("unexpected error: {}", err),
        }
    }
}
