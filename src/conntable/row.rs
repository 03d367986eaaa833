use crate::errors::BreakerError;
use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;

/// One data line of `/proc/net/tcp`, with the endpoints still hex-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionTableRow {
    pub local: String,  // Field 1, "0500000A:0FA0"
    pub remote: String, // Field 2
    pub inode: String,  // Field 9
}

impl ConnectionTableRow {
    /// Split a table line into its fields. `line_no` is only used for error reports.
    pub fn parse(line: &str, line_no: usize) -> Result<Self, BreakerError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            return Err(BreakerError::MalformedRow {
                line: line_no,
                reason: format!("expected at least 10 fields, found {}", fields.len()),
            });
        }

        Ok(ConnectionTableRow {
            local: fields[1].to_string(),
            remote: fields[2].to_string(),
            inode: fields[9].to_string(),
        })
    }

    pub fn local_endpoint(&self, line_no: usize) -> Result<SocketAddrV4, BreakerError> {
        decode_endpoint(&self.local).ok_or_else(|| bad_endpoint(&self.local, line_no))
    }

    pub fn remote_endpoint(&self, line_no: usize) -> Result<SocketAddrV4, BreakerError> {
        decode_endpoint(&self.remote).ok_or_else(|| bad_endpoint(&self.remote, line_no))
    }
}

fn bad_endpoint(raw: &str, line_no: usize) -> BreakerError {
    BreakerError::MalformedRow { line: line_no, reason: format!("bad endpoint {:?}", raw) }
}

/// Decode `ADDR:PORT` as written by the kernel. The address is the raw
/// in-memory `u32` printed as hex, so on little-endian hosts its bytes come
/// out reversed: `0500000A` is 10.0.0.5.
pub fn decode_endpoint(raw: &str) -> Option<SocketAddrV4> {
    let (addr, port) = raw.split_once(':')?;
    if addr.len() != 8 {
        return None;
    }
    let addr = u32::from_str_radix(addr, 16).ok()?;
    let port = u16::from_str_radix(port, 16).ok()?;
    Some(SocketAddrV4::new(Ipv4Addr::from(addr.to_le_bytes()), port))
}

/// Read every data row of a connection table, skipping the header line.
/// Rows are returned with their 1-based line numbers.
pub fn read_table(path: &Path) -> Result<Vec<(usize, ConnectionTableRow)>, BreakerError> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| ConnectionTableRow::parse(line, i + 1).map(|row| (i + 1, row)))
        .collect()
}

// -- Unit tests --
