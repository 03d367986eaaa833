pub mod filter;
pub mod machine;
pub mod reset;
pub mod session;

pub use machine::{Action, Event, Machine, State};
pub use reset::ResetSegment;
pub use session::InterceptionSession;

use crate::capture::{self, Injector, PacketSource};
use crate::conntable::Connection;
use crate::errors::BreakerError;
use crate::ipset::{ExclusionOp, ExclusionSet};
use crate::observer::Observer;
use std::time::Duration;

/// Tunables of one interception run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakOptions {
    pub interval: Duration, // Timer period
    pub persist: bool,      // Keep refreshing the snapshot until the timer fires
}

impl Default for BreakOptions {
    fn default() -> Self {
        BreakOptions {
            interval: Duration::from_secs(1),
            persist: true,
        }
    }
}

/// Block the local endpoint, intercept until a reset goes out, unblock.
///
/// The endpoint is removed from the exclusion set whatever the outcome of
/// the interception. An interception error wins over a removal error.
pub fn break_connection(
    conn: &Connection,
    exclusion: &dyn ExclusionSet,
    source: &mut dyn PacketSource,
    injector: &mut dyn Injector,
    options: BreakOptions,
    observer: &dyn Observer,
) -> Result<(), BreakerError> {
    observer.exclusion_updated(ExclusionOp::Add, conn.local);
    exclusion.add(conn.local)?;

    let session = InterceptionSession::new(conn.local.port(), conn.remote.port(), options.persist);
    let mut machine = Machine::new(session, observer);
    let outcome = capture::run(&mut machine, source, injector, options.interval);

    observer.exclusion_updated(ExclusionOp::Remove, conn.local);
    let cleanup = exclusion.remove(conn.local);

    outcome.and(cleanup)
}

// Unit test helpers

#[cfg(test)]
pub mod test_utils {
    use crate::ipset::ExclusionOp;
    use crate::observer::Observer;
    use crate::packet::{CapturedSegment, TCPFlags};
    use std::cell::RefCell;
    use std::net::{Ipv4Addr, SocketAddrV4};

    /// An ACK segment with a window of 64.
    pub fn segment(src_ip: Ipv4Addr, sport: u16, dst_ip: Ipv4Addr, dport: u16, seq: u32, ack: u32) -> CapturedSegment {
        CapturedSegment {
            src_ip,
            dst_ip,
            sport,
            dport,
            seq,
            ack,
            window: 64,
            flags: TCPFlags::ACK,
        }
    }

    /// Keeps a short tag per event, in order.
    #[derive(Default)]
    pub struct RecordingObserver {
        events: RefCell<Vec<String>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<String> {
            self.events.borrow().clone()
        }

        fn push(&self, event: String) {
            self.events.borrow_mut().push(event);
        }
    }

    impl Observer for RecordingObserver {
        fn exclusion_updated(&self, op: ExclusionOp, endpoint: SocketAddrV4) {
            self.push(format!("{} {}", op, endpoint));
        }

        fn seeking(&self) {
            self.push("seeking".to_string());
        }

        fn packet_checked(&self, _segment: &CapturedSegment) {
            self.push("checked".to_string());
        }

        fn session_found(&self, remote: Ipv4Addr) {
            self.push(format!("found {}", remote));
        }

        fn segment_collected(&self, _segment: &CapturedSegment) {
            self.push("collected".to_string());
        }

        fn interception_done(&self) {
            self.push("done".to_string());
        }
    }
}
