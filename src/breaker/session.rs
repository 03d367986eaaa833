use crate::packet::CapturedSegment;
use std::net::Ipv4Addr;

/// Mutable state of one interception run.
#[derive(Debug, Clone)]
pub struct InterceptionSession {
    pub local_port: u16,
    pub remote_port: u16,
    remote: Option<Ipv4Addr>,          // First match wins, never overwritten
    intercept: Option<CapturedSegment>, // Only the last one matters
    persist: bool,
}

impl InterceptionSession {
    pub fn new(local_port: u16, remote_port: u16, persist: bool) -> Self {
        InterceptionSession {
            local_port,
            remote_port,
            remote: None,
            intercept: None,
            persist,
        }
    }

    /// Record the remote address unless one is already known. Returns the
    /// address in effect and whether this call set it.
    pub fn record_remote(&mut self, candidate: Ipv4Addr) -> (Ipv4Addr, bool) {
        match self.remote {
            Some(remote) => (remote, false),
            None => {
                self.remote = Some(candidate);
                (candidate, true)
            }
        }
    }

    pub fn capture(&mut self, segment: CapturedSegment) {
        self.intercept = Some(segment);
    }

    pub fn remote(&self) -> Option<Ipv4Addr> {
        self.remote
    }

    pub fn intercepted(&self) -> Option<&CapturedSegment> {
        self.intercept.as_ref()
    }

    pub fn persist(&self) -> bool {
        self.persist
    }

    /// The snapshot and remote address, once both are known.
    pub fn ready(&self) -> Option<(CapturedSegment, Ipv4Addr)> {
        Some((self.intercept?, self.remote?))
    }
}
