use crate::packet::errors::HeaderError;
use crate::packet::flags::TCPFlags;
use crate::packet::ip_header::PROTO_TCP;
use crate::packet::{fold, sum_words};
use std::net::Ipv4Addr;

pub const TCP_MIN_LEN: usize = 20;

/// Fixed part of a TCP header. Options and payload are never kept: a captured
/// segment only contributes its numbers, a forged one carries neither.
#[derive(Debug, Clone, PartialEq)]
pub struct TCPHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_no: u32,
    pub ack_no: u32,
    pub data_offset: u8, // Upper 4 bits, header length in 32-bit words
    pub flags: TCPFlags,
    pub window: u16,
    pub checksum: u16,
    pub urgent: u16,
}

impl TCPHeader {
    /// Write an option-less header into `buf`, checksummed against the pseudo-header.
    pub fn serialize(&self, buf: &mut [u8], src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Result<usize, HeaderError> {
        if buf.len() < TCP_MIN_LEN {
            return Err(HeaderError::BufferTooSmall { expected: TCP_MIN_LEN, found: buf.len() });
        }

        buf[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        buf[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        buf[4..8].copy_from_slice(&self.seq_no.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ack_no.to_be_bytes());
        buf[12] = 5 << 4;
        buf[13] = self.flags.bits();
        buf[14..16].copy_from_slice(&self.window.to_be_bytes());
        buf[16..18].fill(0);
        buf[18..20].copy_from_slice(&self.urgent.to_be_bytes());

        let checksum = Self::checksum(&buf[..TCP_MIN_LEN], src_ip, dst_ip);
        buf[16..18].copy_from_slice(&checksum.to_be_bytes());

        Ok(TCP_MIN_LEN)
    }

    /// Parse the fixed header fields, skipping over any options.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        if buf.len() < TCP_MIN_LEN {
            return Err(HeaderError::BufferTooSmall { expected: TCP_MIN_LEN, found: buf.len() });
        }

        let data_offset = buf[12] >> 4;
        let header_len = data_offset as usize * 4;
        if header_len < TCP_MIN_LEN {
            return Err(HeaderError::BadLength { field: "data offset", value: header_len });
        }

        Ok(TCPHeader {
            src_port: u16::from_be_bytes([buf[0], buf[1]]),
            dst_port: u16::from_be_bytes([buf[2], buf[3]]),
            seq_no: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ack_no: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            data_offset,
            flags: TCPFlags::from_bits_truncate(buf[13]),
            window: u16::from_be_bytes([buf[14], buf[15]]),
            checksum: u16::from_be_bytes([buf[16], buf[17]]),
            urgent: u16::from_be_bytes([buf[18], buf[19]]),
        })
    }

    /// Checksum of a whole TCP segment (header, options, payload) including
    /// the IPv4 pseudo-header; 0 means valid.
    pub fn checksum(segment: &[u8], src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> u16 {
        let mut sum = sum_words(&src_ip.octets(), 0);
        sum = sum_words(&dst_ip.octets(), sum);
        sum += PROTO_TCP as u32;
        sum += segment.len() as u32;
        fold(sum_words(segment, sum))
    }
}

// -- Unit tests --
