use crate::capture::TransportError;
use crate::conntable::Connection;
use crate::ipset::ExclusionOp;
use crate::packet::errors::HeaderError;
use std::io;
use std::net::SocketAddrV4;
use thiserror::Error;

/// Every failure is fatal to the run; nothing is retried.
#[derive(Error, Debug)]
pub enum BreakerError {
    #[error("No connection matches the given criteria")]
    ConnectionNotFound,

    #[error("{} connections match the given criteria", .0.len())]
    MultipleConnectionsMatched(Vec<Connection>),

    #[error("Failed to {op} {endpoint} in exclusion set: {reason}")]
    ExclusionHookFailure {
        op: ExclusionOp,
        endpoint: SocketAddrV4,
        reason: String,
    },

    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    #[error("Malformed connection table line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Header error: {0}")]
    Header(#[from] HeaderError),
}
