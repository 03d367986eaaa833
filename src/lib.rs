//! Break an established TCP connection from the host it runs on.
//!
//! The connection is resolved from the kernel's connection table, its traffic
//! is intercepted until the current sequence numbers are known, and a forged
//! reset is sent to the remote peer.

pub mod breaker;
pub mod capture;
pub mod config;
pub mod conntable;
pub mod errors;
pub mod ipset;
pub mod observer;
pub mod packet;
pub mod rawsocket;

use crate::capture::RawInjector;
use crate::config::Config;
use crate::conntable::Resolver;
use crate::errors::BreakerError;
use crate::ipset::{ExclusionSet, Ipset, NoExclusion};
use crate::observer::Observer;

/// Resolve the configured connection and break it.
pub fn run(config: &Config, observer: &dyn Observer) -> Result<(), BreakerError> {
    let conn = Resolver::default().resolve(&config.criterion, observer)?;
    observer.connection_resolved(&conn);

    let mut source = capture::open_source(config.capture, config.nflog_group)?;
    let mut injector = RawInjector::open()?;

    let exclusion: Box<dyn ExclusionSet> = match &config.ipset_name {
        Some(name) => Box::new(Ipset::new(name.as_str())),
        None => Box::new(NoExclusion),
    };

    breaker::break_connection(
        &conn,
        exclusion.as_ref(),
        source.as_mut(),
        &mut injector,
        config.options,
        observer,
    )
}
