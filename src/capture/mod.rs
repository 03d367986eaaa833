pub mod event_loop;
pub mod nflog;
pub mod raw;

pub use event_loop::run;
pub use nflog::NflogCapture;
pub use raw::{RawCapture, RawInjector};

use nix::errno::Errno;
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Socket error: {0}")]
    Socket(#[from] Errno),

    #[error("Netlink error: {0}")]
    Netlink(String),

    #[error("Short send: {sent} of {expected} bytes")]
    ShortSend { sent: usize, expected: usize },
}

/// A stream of captured IPv4 datagrams.
pub trait PacketSource {
    /// Block for at most `timeout`; `None` means nothing arrived in time.
    fn next_packet(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError>;
}

/// Emits complete IPv4 datagrams.
pub trait Injector {
    fn send(&mut self, datagram: &[u8], dst: Ipv4Addr) -> Result<(), TransportError>;
}

/// Where captured traffic comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CaptureDriver {
    /// Packet socket on every interface; sees both directions of traffic the firewall lets through
    Raw,
    /// Netfilter NFLOG group; sees traffic the firewall logs before dropping it
    Nflog,
}

/// Open the capture side for `driver`.
pub fn open_source(driver: CaptureDriver, nflog_group: u16) -> Result<Box<dyn PacketSource>, TransportError> {
    Ok(match driver {
        CaptureDriver::Raw => Box::new(RawCapture::open()?),
        CaptureDriver::Nflog => Box::new(NflogCapture::open(nflog_group)?),
    })
}
