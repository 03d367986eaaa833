use crate::packet::errors::HeaderError;
use crate::packet::flags::TCPFlags;
use crate::packet::ip_header::{IPHeader, PROTO_TCP};
use crate::packet::tcp_header::TCPHeader;
use std::fmt;
use std::net::Ipv4Addr;

/// The fields of one observed TCP/IPv4 packet that matter for forging a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedSegment {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub sport: u16,
    pub dport: u16,
    pub seq: u32,
    pub ack: u32,
    pub window: u16,
    pub flags: TCPFlags,
}

impl CapturedSegment {
    /// Extract a segment from a raw IPv4 datagram as delivered by the capture socket.
    pub fn parse(datagram: &[u8]) -> Result<Self, HeaderError> {
        let iph = IPHeader::parse(datagram)?;
        if iph.protocol != PROTO_TCP {
            return Err(HeaderError::NotTcp(iph.protocol));
        }
        if iph.frag_offset != 0 {
            return Err(HeaderError::Fragment);
        }

        let tcph = TCPHeader::parse(&datagram[iph.header_len()..])?;

        Ok(CapturedSegment {
            src_ip: iph.src_ip,
            dst_ip: iph.dst_ip,
            sport: tcph.src_port,
            dport: tcph.dst_port,
            seq: tcph.seq_no,
            ack: tcph.ack_no,
            window: tcph.window,
            flags: tcph.flags,
        })
    }
}

impl fmt::Display for CapturedSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} > {}:{} {:?} seq={} ack={} win={}",
            self.src_ip, self.sport, self.dst_ip, self.dport, self.flags, self.seq, self.ack, self.window
        )
    }
}

// -- Unit tests --
