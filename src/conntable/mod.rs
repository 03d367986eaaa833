pub mod resolver;
pub mod row;

pub use resolver::Resolver;
pub use row::ConnectionTableRow;

use crate::errors::BreakerError;
use std::fmt;
use std::net::SocketAddrV4;

/// Which end of the connection a port number names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

/// How to pick the connection to break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Port { port: u16, side: Side },
    Pid(u32),
}

/// A live TCP connection as seen from this host. Ports may coincide on loopback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
}

impl Connection {
    pub fn from_row(row: &ConnectionTableRow, line_no: usize) -> Result<Self, BreakerError> {
        Ok(Connection {
            local: row.local_endpoint(line_no)?,
            remote: row.remote_endpoint(line_no)?,
        })
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.local, self.remote)
    }
}

// Unit test helpers
