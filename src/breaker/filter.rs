use crate::packet::CapturedSegment;
use std::net::Ipv4Addr;

/// Decide whether `segment` belongs to the connection between `local_port`
/// and `remote_port`, and if so which of its addresses is the remote one.
///
/// Only ports are compared, in either order; addresses are never checked.
pub fn remote_address(segment: &CapturedSegment, local_port: u16, remote_port: u16) -> Option<Ipv4Addr> {
    let outbound = segment.sport == local_port && segment.dport == remote_port;
    let inbound = segment.sport == remote_port && segment.dport == local_port;
    if !(outbound || inbound) {
        return None;
    }

    if segment.sport == local_port {
        Some(segment.dst_ip)
    } else {
        Some(segment.src_ip)
    }
}

// -- Unit tests --
