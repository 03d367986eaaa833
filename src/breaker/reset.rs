use crate::packet::errors::HeaderError;
use crate::packet::ip_header::{IPHeader, IPV4_MIN_LEN};
use crate::packet::tcp_header::{TCPHeader, TCP_MIN_LEN};
use crate::packet::{CapturedSegment, TCPFlags};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

/// A forged reset, always addressed from the local endpoint to the remote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSegment {
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    pub seq: u32,
    pub ack: u32,
    pub flags: TCPFlags,
    pub window: u16,
}

/// Forge a reset from the last captured segment of the connection.
///
/// A segment travelling towards `remote` is taken as is; one coming from it
/// has its endpoints swapped and its ack used as our sequence number, since
/// that is the next byte the remote side expects from us. The ack field is
/// left at zero: only RST is set, so the receiver ignores it.
pub fn synthesize(captured: &CapturedSegment, remote: Ipv4Addr) -> ResetSegment {
    let from = SocketAddrV4::new(captured.src_ip, captured.sport);
    let to = SocketAddrV4::new(captured.dst_ip, captured.dport);

    let (src, dst, seq) = if captured.dst_ip == remote {
        (from, to, captured.seq)
    } else {
        (to, from, captured.ack)
    };

    ResetSegment {
        src,
        dst,
        seq,
        ack: 0,
        flags: TCPFlags::RST,
        window: captured.window,
    }
}

impl ResetSegment {
    pub const DATAGRAM_LEN: usize = IPV4_MIN_LEN + TCP_MIN_LEN;

    /// Serialize into a complete IPv4 datagram with identification `id`.
    pub fn build(&self, id: u16) -> Result<Vec<u8>, HeaderError> {
        let mut buf = vec![0u8; Self::DATAGRAM_LEN];

        let iph = IPHeader::for_tcp(*self.src.ip(), *self.dst.ip(), TCP_MIN_LEN, id);
        let n = iph.serialize(&mut buf)?;

        let tcph = TCPHeader {
            src_port: self.src.port(),
            dst_port: self.dst.port(),
            seq_no: self.seq,
            ack_no: self.ack,
            data_offset: 5,
            flags: self.flags,
            window: self.window,
            checksum: 0,
            urgent: 0,
        };
        tcph.serialize(&mut buf[n..], *self.src.ip(), *self.dst.ip())?;

        Ok(buf)
    }
}

impl fmt::Display for ResetSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} > {} {:?} seq={} ack={} win={}",
            self.src, self.dst, self.flags, self.seq, self.ack, self.window
        )
    }
}

// -- Unit tests --
