use crate::breaker::{Action, Event, Machine};
use crate::capture::{Injector, PacketSource};
use crate::errors::BreakerError;
use crate::packet::CapturedSegment;
use log::trace;
use std::time::{Duration, Instant};

/// Feed captured segments and timer ticks into `machine` until it halts.
///
/// Ticks follow a fixed schedule of one per `interval` from the start of the
/// run, whatever the traffic. Datagrams that are not parseable TCP are skipped.
/// Returns once the reset is on the wire.
pub fn run(
    machine: &mut Machine,
    source: &mut dyn PacketSource,
    injector: &mut dyn Injector,
    interval: Duration,
) -> Result<(), BreakerError> {
    let mut deadline = Instant::now() + interval;

    loop {
        let now = Instant::now();
        let event = if now >= deadline {
            deadline += interval;
            if deadline <= now {
                deadline = now + interval;
            }
            Event::Timer
        } else {
            let Some(datagram) = source.next_packet(deadline - now)? else {
                continue;
            };
            match CapturedSegment::parse(&datagram) {
                Ok(segment) => Event::Packet(segment),
                Err(err) => {
                    trace!("Skipping datagram: {}", err);
                    continue;
                }
            }
        };

        match machine.handle(event) {
            Action::Wait => {}
            Action::SendReset(reset) => {
                let datagram = reset.build(rand::random())?;
                injector.send(&datagram, *reset.dst.ip())?;
                machine.observer().reset_sent(&reset, &datagram);
                return Ok(());
            }
            Action::Halt => return Ok(()),
        }
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::{InterceptionSession, State};
    use crate::capture::TransportError;
    use crate::observer::NullObserver;
    use crate::packet::ip_header::IPHeader;
    use crate::packet::tcp_header::TCPHeader;
    use crate::packet::TCPFlags;
    use std::collections::VecDeque;
    use std::net::Ipv4Addr;
    use std::thread;

    const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
    const REMOTE: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);
    const TICK: Duration = Duration::from_millis(20);

    /// Replays its queue, then reports timeouts after sleeping them out.
    struct ScriptedSource {
        queue: VecDeque<Result<Vec<u8>, TransportError>>,
    }

    impl ScriptedSource {
        fn new(datagrams: Vec<Vec<u8>>) -> Self {
            ScriptedSource {
                queue: datagrams.into_iter().map(Ok).collect(),
            }
        }
    }

    impl PacketSource for ScriptedSource {
        fn next_packet(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
            match self.queue.pop_front() {
                Some(item) => item.map(Some),
                None => {
                    thread::sleep(timeout);
                    Ok(None)
                }
            }
        }
    }

    #[derive(Default)]
    struct CapturingInjector {
        sent: Vec<(Vec<u8>, Ipv4Addr)>,
        fail: bool,
    }

    impl Injector for CapturingInjector {
        fn send(&mut self, datagram: &[u8], dst: Ipv4Addr) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::ShortSend { sent: 0, expected: datagram.len() });
            }
            self.sent.push((datagram.to_vec(), dst));
            Ok(())
        }
    }

    fn datagram(src: Ipv4Addr, sport: u16, dst: Ipv4Addr, dport: u16, seq: u32, ack: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 40];
        IPHeader::for_tcp(src, dst, 20, 1).serialize(&mut buf).unwrap();
        let tcph = TCPHeader {
            src_port: sport,
            dst_port: dport,
            seq_no: seq,
            ack_no: ack,
            data_offset: 5,
            flags: TCPFlags::ACK,
            window: 64,
            checksum: 0,
            urgent: 0,
        };
        tcph.serialize(&mut buf[20..], src, dst).unwrap();
        buf
    }

    fn sent_header(injector: &CapturingInjector) -> TCPHeader {
        assert_eq!(injector.sent.len(), 1);
        TCPHeader::parse(&injector.sent[0].0[20..]).unwrap()
    }

    #[test]
    fn test_single_shot_sends_on_first_match() {
        let observer = NullObserver;
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, false), &observer);
        let mut source = ScriptedSource::new(vec![datagram(LOCAL, 4000, REMOTE, 80, 1000, 2000)]);
        let mut injector = CapturingInjector::default();

        run(&mut machine, &mut source, &mut injector, TICK).unwrap();

        assert_eq!(machine.state(), State::Terminating);
        assert_eq!(injector.sent[0].1, REMOTE);
        let tcph = sent_header(&injector);
        assert_eq!(tcph.seq_no, 1000);
        assert_eq!(tcph.ack_no, 0);
        assert_eq!(tcph.flags, TCPFlags::RST);
    }

    #[test]
    fn test_persist_waits_for_timer_and_uses_latest() {
        let observer = NullObserver;
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, true), &observer);
        let mut source = ScriptedSource::new(vec![
            datagram(LOCAL, 4000, REMOTE, 80, 1000, 2000),
            datagram(REMOTE, 80, LOCAL, 4000, 2000, 1010),
        ]);
        let mut injector = CapturingInjector::default();

        run(&mut machine, &mut source, &mut injector, TICK).unwrap();

        assert_eq!(injector.sent[0].1, REMOTE);
        let tcph = sent_header(&injector);
        assert_eq!(tcph.src_port, 4000);
        assert_eq!(tcph.dst_port, 80);
        assert_eq!(tcph.seq_no, 1010);
    }

    #[test]
    fn test_garbage_and_foreign_traffic_are_skipped() {
        let observer = NullObserver;
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, false), &observer);
        let mut source = ScriptedSource::new(vec![
            vec![0x60, 0, 0],
            vec![0xde, 0xad, 0xbe, 0xef],
            datagram(LOCAL, 5555, REMOTE, 443, 1, 1),
            datagram(LOCAL, 4000, REMOTE, 80, 7, 8),
        ]);
        let mut injector = CapturingInjector::default();

        run(&mut machine, &mut source, &mut injector, TICK).unwrap();

        assert_eq!(sent_header(&injector).seq_no, 7);
    }

    #[test]
    fn test_link_layer_noise_then_outbound_segment() {
        let observer = NullObserver;
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, false), &observer);

        // ARP request body, IPv6 header start, IPv4 UDP
        let arp = hex::decode("0001080006040001").unwrap();
        let ipv6 = hex::decode("6000000000140640").unwrap();
        let mut udp = datagram(LOCAL, 4000, REMOTE, 80, 1, 1);
        udp[9] = 17;

        let mut source = ScriptedSource::new(vec![arp, ipv6, udp, datagram(LOCAL, 4000, REMOTE, 80, 1000, 2000)]);
        let mut injector = CapturingInjector::default();

        run(&mut machine, &mut source, &mut injector, TICK).unwrap();

        assert_eq!(injector.sent[0].1, REMOTE);
        let tcph = sent_header(&injector);
        assert_eq!(tcph.src_port, 4000);
        assert_eq!(tcph.dst_port, 80);
        assert_eq!(tcph.seq_no, 1000);
    }

    #[test]
    fn test_injector_failure_is_reported() {
        let observer = NullObserver;
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, false), &observer);
        let mut source = ScriptedSource::new(vec![datagram(LOCAL, 4000, REMOTE, 80, 1, 2)]);
        let mut injector = CapturingInjector {
            fail: true,
            ..Default::default()
        };

        let result = run(&mut machine, &mut source, &mut injector, TICK);
        assert!(matches!(result, Err(BreakerError::TransportFailure(_))));
    }

    #[test]
    fn test_source_failure_is_reported() {
        let observer = NullObserver;
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, true), &observer);
        let mut source = ScriptedSource {
            queue: VecDeque::from(vec![Err(TransportError::Netlink("gone".to_string()))]),
        };
        let mut injector = CapturingInjector::default();

        let result = run(&mut machine, &mut source, &mut injector, TICK);
        assert!(matches!(result, Err(BreakerError::TransportFailure(_))));
        assert!(injector.sent.is_empty());
    }
}
