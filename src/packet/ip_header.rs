use crate::packet::errors::HeaderError;
use crate::packet::flags::IPFlags;
use crate::packet::{fold, sum_words};
use std::net::Ipv4Addr;

pub const IPV4_MIN_LEN: usize = 20;
pub const PROTO_TCP: u8 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct IPHeader {
    pub version: u8, // 4
    pub ihl: u8,     // Header length in 32-bit words, 5 when we send
    pub tos: u8,
    pub total_len: u16,
    pub id: u16,
    pub flags: IPFlags,   // 3 bits, part of u16
    pub frag_offset: u16, // 13 bits, part of u16
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
}

impl IPHeader {
    /// Header template for an outgoing TCP datagram without IP options.
    pub fn for_tcp(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, payload_len: usize, id: u16) -> Self {
        IPHeader {
            version: 4,
            ihl: 5,
            tos: 0,
            total_len: (IPV4_MIN_LEN + payload_len) as u16,
            id,
            flags: IPFlags::DF,
            frag_offset: 0,
            ttl: 64,
            protocol: PROTO_TCP,
            checksum: 0,
            src_ip,
            dst_ip,
        }
    }

    /// Length of the header in bytes, options included.
    pub fn header_len(&self) -> usize {
        self.ihl as usize * 4
    }

    /// Write the fixed 20-byte header into `buf` with a freshly computed checksum.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, HeaderError> {
        if buf.len() < IPV4_MIN_LEN {
            return Err(HeaderError::BufferTooSmall { expected: IPV4_MIN_LEN, found: buf.len() });
        }

        buf[0] = (self.version << 4) | 5;
        buf[1] = self.tos;
        buf[2..4].copy_from_slice(&self.total_len.to_be_bytes());
        buf[4..6].copy_from_slice(&self.id.to_be_bytes());
        buf[6..8].copy_from_slice(&self.flags.pack(self.frag_offset).to_be_bytes());
        buf[8] = self.ttl;
        buf[9] = self.protocol;
        buf[10..12].fill(0);
        buf[12..16].copy_from_slice(&self.src_ip.octets());
        buf[16..20].copy_from_slice(&self.dst_ip.octets());

        let checksum = Self::checksum(&buf[..IPV4_MIN_LEN]);
        buf[10..12].copy_from_slice(&checksum.to_be_bytes());

        Ok(IPV4_MIN_LEN)
    }

    /// Parse an IPv4 header. The checksum is read but not verified: captured
    /// outbound traffic often carries offloaded, not yet computed checksums.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        if buf.len() < IPV4_MIN_LEN {
            return Err(HeaderError::BufferTooSmall { expected: IPV4_MIN_LEN, found: buf.len() });
        }

        let version = buf[0] >> 4;
        if version != 4 {
            return Err(HeaderError::UnsupportedVersion(version));
        }

        let ihl = buf[0] & 0x0f;
        let header_len = ihl as usize * 4;
        if header_len < IPV4_MIN_LEN {
            return Err(HeaderError::BadLength { field: "IHL", value: header_len });
        }
        if buf.len() < header_len {
            return Err(HeaderError::BufferTooSmall { expected: header_len, found: buf.len() });
        }

        let (flags, frag_offset) = IPFlags::unpack(u16::from_be_bytes([buf[6], buf[7]]));

        Ok(IPHeader {
            version,
            ihl,
            tos: buf[1],
            total_len: u16::from_be_bytes([buf[2], buf[3]]),
            id: u16::from_be_bytes([buf[4], buf[5]]),
            flags,
            frag_offset,
            ttl: buf[8],
            protocol: buf[9],
            checksum: u16::from_be_bytes([buf[10], buf[11]]),
            src_ip: Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15]),
            dst_ip: Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19]),
        })
    }

    /// One's complement checksum over a serialized header; 0 means valid.
    /// Wiki: https://en.wikipedia.org/wiki/IPv4_header_checksum.
    pub fn checksum(data: &[u8]) -> u16 {
        fold(sum_words(data, 0))
    }
}

// -- Unit tests --
