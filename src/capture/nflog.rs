use crate::capture::{PacketSource, TransportError};
use crate::rawsocket::socket;
use log::{debug, trace};
use nix::errno::Errno;
use nix::libc;
use nix::sys::socket::SockProtocol;
use std::collections::VecDeque;
use std::os::fd::OwnedFd;
use std::time::{Duration, Instant};

// linux/netlink.h
const NLMSG_HDRLEN: usize = 16;
const NLMSG_ERROR: u16 = 2;
const NLM_F_REQUEST: u16 = 0x1;
const NLM_F_ACK: u16 = 0x4;
const NLA_HDRLEN: usize = 4;
const NLA_TYPE_MASK: u16 = 0x3fff; // Strip NLA_F_NESTED / NLA_F_NET_BYTEORDER

// linux/netfilter/nfnetlink.h, nfnetlink_log.h
const NFGENMSG_LEN: usize = 4;
const NFNL_SUBSYS_ULOG: u16 = 4;
const NFULNL_MSG_PACKET: u16 = NFNL_SUBSYS_ULOG << 8;
const NFULNL_MSG_CONFIG: u16 = (NFNL_SUBSYS_ULOG << 8) | 1;
const NFULA_PAYLOAD: u16 = 9;
const NFULA_CFG_CMD: u16 = 1;
const NFULA_CFG_MODE: u16 = 2;
const NFULNL_CFG_CMD_BIND: u8 = 1;
const NFULNL_CFG_CMD_PF_BIND: u8 = 3;
const NFULNL_CFG_CMD_PF_UNBIND: u8 = 4;
const NFULNL_COPY_PACKET: u8 = 2;

const COPY_RANGE: u32 = 0xffff;
const ACK_TIMEOUT: Duration = Duration::from_secs(1);
const RECV_BUF: usize = 128 * 1024;

fn align4(len: usize) -> usize {
    (len + 3) & !3
}

/// A `NFULNL_MSG_CONFIG` request carrying one attribute.
pub fn config_message(seq: u32, family: u8, group: u16, attr_type: u16, attr: &[u8]) -> Vec<u8> {
    let attr_len = NLA_HDRLEN + attr.len();
    let total = NLMSG_HDRLEN + NFGENMSG_LEN + align4(attr_len);

    let mut buf = Vec::with_capacity(total);
    // nlmsghdr, host byte order
    buf.extend_from_slice(&(total as u32).to_ne_bytes());
    buf.extend_from_slice(&NFULNL_MSG_CONFIG.to_ne_bytes());
    buf.extend_from_slice(&(NLM_F_REQUEST | NLM_F_ACK).to_ne_bytes());
    buf.extend_from_slice(&seq.to_ne_bytes());
    buf.extend_from_slice(&0u32.to_ne_bytes());
    // nfgenmsg, res_id in network order
    buf.push(family);
    buf.push(0);
    buf.extend_from_slice(&group.to_be_bytes());
    // nlattr
    buf.extend_from_slice(&(attr_len as u16).to_ne_bytes());
    buf.extend_from_slice(&attr_type.to_ne_bytes());
    buf.extend_from_slice(attr);
    buf.resize(total, 0);
    buf
}

/// Payload of `NFULA_CFG_MODE`: copy whole packets up to `copy_range` bytes.
fn copy_mode(copy_range: u32) -> [u8; 6] {
    let range = copy_range.to_be_bytes();
    [range[0], range[1], range[2], range[3], NFULNL_COPY_PACKET, 0]
}

/// Split a receive buffer into `(type, body)` pairs.
fn split_messages(mut buf: &[u8]) -> Vec<(u16, &[u8])> {
    let mut messages = Vec::new();
    while buf.len() >= NLMSG_HDRLEN {
        let len = u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if len < NLMSG_HDRLEN || len > buf.len() {
            break;
        }
        let msg_type = u16::from_ne_bytes([buf[4], buf[5]]);
        messages.push((msg_type, &buf[NLMSG_HDRLEN..len]));
        buf = &buf[align4(len).min(buf.len())..];
    }
    messages
}

fn find_attr(mut attrs: &[u8], wanted: u16) -> Option<&[u8]> {
    while attrs.len() >= NLA_HDRLEN {
        let len = u16::from_ne_bytes([attrs[0], attrs[1]]) as usize;
        let attr_type = u16::from_ne_bytes([attrs[2], attrs[3]]) & NLA_TYPE_MASK;
        if len < NLA_HDRLEN || len > attrs.len() {
            return None;
        }
        if attr_type == wanted {
            return Some(&attrs[NLA_HDRLEN..len]);
        }
        attrs = &attrs[align4(len).min(attrs.len())..];
    }
    None
}

/// The `nlmsgerr.error` of an `NLMSG_ERROR` body; 0 is an ack.
fn error_code(body: &[u8]) -> Option<i32> {
    match body {
        [a, b, c, d, ..] => Some(i32::from_ne_bytes([*a, *b, *c, *d])),
        _ => None,
    }
}

fn netlink_failure(code: i32) -> TransportError {
    TransportError::Netlink(format!("kernel returned errno {}", -code))
}

/// Pull the logged datagrams out of a receive buffer.
pub fn parse_packets(buf: &[u8]) -> Result<Vec<Vec<u8>>, TransportError> {
    let mut payloads = Vec::new();
    for (msg_type, body) in split_messages(buf) {
        match msg_type {
            NLMSG_ERROR => match error_code(body) {
                Some(0) | None => {}
                Some(code) => return Err(netlink_failure(code)),
            },
            NFULNL_MSG_PACKET if body.len() >= NFGENMSG_LEN => {
                if let Some(payload) = find_attr(&body[NFGENMSG_LEN..], NFULA_PAYLOAD) {
                    payloads.push(payload.to_vec());
                }
            }
            _ => {}
        }
    }
    Ok(payloads)
}

/// Captures datagrams delivered to an NFLOG group (`-j NFLOG --nflog-group N`).
#[derive(Debug)]
pub struct NflogCapture {
    fd: OwnedFd,
    seq: u32,
    pending: VecDeque<Vec<u8>>,
    buf: Vec<u8>,
}

impl NflogCapture {
    pub fn open(group: u16) -> Result<Self, TransportError> {
        let mut capture = NflogCapture {
            fd: socket::new_netlink_socket(SockProtocol::NetlinkNetFilter)?,
            seq: 0,
            pending: VecDeque::new(),
            buf: vec![0u8; RECV_BUF],
        };

        let inet = libc::AF_INET as u8;
        let unspec = libc::AF_UNSPEC as u8;

        // Only pre-3.17 kernels need the AF_INET handler rebound; later ones may refuse
        for (name, cmd) in [("PF_UNBIND", NFULNL_CFG_CMD_PF_UNBIND), ("PF_BIND", NFULNL_CFG_CMD_PF_BIND)] {
            if let Err(err) = capture.configure(inet, 0, NFULA_CFG_CMD, &[cmd]) {
                trace!("Ignoring nflog {} failure: {}", name, err);
            }
        }

        capture.configure(unspec, group, NFULA_CFG_CMD, &[NFULNL_CFG_CMD_BIND])?;
        capture.configure(unspec, group, NFULA_CFG_MODE, &copy_mode(COPY_RANGE))?;
        debug!("Listening on NFLOG group {}", group);

        Ok(capture)
    }

    /// Send one config request and wait for its ack.
    fn configure(&mut self, family: u8, group: u16, attr_type: u16, attr: &[u8]) -> Result<(), TransportError> {
        self.seq += 1;
        let message = config_message(self.seq, family, group, attr_type, attr);
        socket::send_message(&self.fd, &message)?;
        socket::set_timeout(&self.fd, ACK_TIMEOUT)?;

        loop {
            let Some(n) = socket::recv_datagram(&self.fd, &mut self.buf)? else {
                return Err(TransportError::Netlink("no ack for nflog config request".to_string()));
            };
            for (msg_type, body) in split_messages(&self.buf[..n]) {
                if msg_type == NLMSG_ERROR {
                    return match error_code(body) {
                        Some(0) | None => Ok(()),
                        Some(code) => Err(netlink_failure(code)),
                    };
                }
            }
        }
    }
}

impl PacketSource for NflogCapture {
    fn next_packet(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(datagram) = self.pending.pop_front() {
                return Ok(Some(datagram));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            socket::set_timeout(&self.fd, deadline - now)?;

            match socket::recv_datagram(&self.fd, &mut self.buf) {
                Ok(Some(n)) => {
                    let packets = parse_packets(&self.buf[..n])?;
                    self.pending.extend(packets);
                }
                Ok(None) => return Ok(None),
                // Receive queue overrun, some copies were dropped
                Err(Errno::ENOBUFS) => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

// -- Unit tests --
