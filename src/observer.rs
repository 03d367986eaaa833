use crate::breaker::reset::ResetSegment;
use crate::conntable::Connection;
use crate::ipset::ExclusionOp;
use crate::packet::CapturedSegment;
use log::{debug, info};
use std::net::{Ipv4Addr, SocketAddrV4};

/// Sink for the structured events of a run. Components receive one by
/// reference instead of logging on their own; every hook defaults to a no-op.
pub trait Observer {
    fn connection_candidate(&self, _conn: &Connection) {}
    fn connection_resolved(&self, _conn: &Connection) {}
    fn exclusion_updated(&self, _op: ExclusionOp, _endpoint: SocketAddrV4) {}
    fn seeking(&self) {}
    fn packet_checked(&self, _segment: &CapturedSegment) {}
    fn session_found(&self, _remote: Ipv4Addr) {}
    fn segment_collected(&self, _segment: &CapturedSegment) {}
    fn interception_done(&self) {}
    fn reset_sent(&self, _reset: &ResetSegment, _datagram: &[u8]) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn connection_candidate(&self, conn: &Connection) {
        debug!("Candidate connection: {}", conn);
    }

    fn connection_resolved(&self, conn: &Connection) {
        info!("Found connection: {}", conn);
    }

    fn exclusion_updated(&self, op: ExclusionOp, endpoint: SocketAddrV4) {
        debug!("Updating exclusion set ({} {})", op, endpoint);
    }

    fn seeking(&self) {
        debug!("Waiting for noise on the session");
    }

    fn packet_checked(&self, segment: &CapturedSegment) {
        debug!("Session check, packet: {}", segment);
    }

    fn session_found(&self, remote: Ipv4Addr) {
        debug!("Found session (remote: {})", remote);
    }

    fn segment_collected(&self, segment: &CapturedSegment) {
        debug!("Collected: {}", segment);
    }

    fn interception_done(&self) {
        debug!("Captured seq, proceeding to termination");
    }

    fn reset_sent(&self, reset: &ResetSegment, datagram: &[u8]) {
        info!("Sent RST: {}", reset);
        debug!("RST datagram: {}", hex::encode(datagram));
    }
}
