use crate::breaker::filter;
use crate::breaker::reset::{self, ResetSegment};
use crate::breaker::session::InterceptionSession;
use crate::observer::Observer;
use crate::packet::CapturedSegment;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Seeking,     // Waiting for traffic on the connection
    Collecting,  // Storing a matched segment; never outlives one event
    Terminating, // Reset issued, nothing left to do
}

/// What the capture loop delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Packet(CapturedSegment),
    Timer,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Wait,
    SendReset(ResetSegment),
    Halt,
}

/// The interception state machine. Each event runs one transition to
/// completion and yields the action the caller must carry out.
pub struct Machine<'a> {
    state: State,
    session: InterceptionSession,
    observer: &'a dyn Observer,
}

impl<'a> Machine<'a> {
    pub fn new(session: InterceptionSession, observer: &'a dyn Observer) -> Self {
        observer.seeking();
        Machine {
            state: State::Seeking,
            session,
            observer,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn session(&self) -> &InterceptionSession {
        &self.session
    }

    pub fn observer(&self) -> &'a dyn Observer {
        self.observer
    }

    pub fn handle(&mut self, event: Event) -> Action {
        let (next, action) = match (self.state, event) {
            (State::Seeking, Event::Packet(segment)) => self.check_packet(segment),
            (State::Seeking, Event::Timer) => self.check_timeout(),
            (State::Collecting, _) | (State::Terminating, _) => (self.state, Action::Halt),
        };
        self.state = next;
        action
    }

    fn check_packet(&mut self, segment: CapturedSegment) -> (State, Action) {
        self.observer.packet_checked(&segment);

        let Some(candidate) = filter::remote_address(&segment, self.session.local_port, self.session.remote_port)
        else {
            return (State::Seeking, Action::Wait);
        };

        let (remote, first) = self.session.record_remote(candidate);
        if first {
            self.observer.session_found(remote);
        }

        self.state = State::Collecting;
        self.collect(segment, remote)
    }

    fn collect(&mut self, segment: CapturedSegment, remote: Ipv4Addr) -> (State, Action) {
        self.observer.segment_collected(&segment);
        self.session.capture(segment);

        if self.session.persist() {
            self.observer.seeking();
            (State::Seeking, Action::Wait)
        } else {
            self.terminate(segment, remote)
        }
    }

    fn check_timeout(&mut self) -> (State, Action) {
        match self.session.ready() {
            Some((segment, remote)) => self.terminate(segment, remote),
            None => (State::Seeking, Action::Wait),
        }
    }

    fn terminate(&mut self, segment: CapturedSegment, remote: Ipv4Addr) -> (State, Action) {
        self.observer.interception_done();
        (State::Terminating, Action::SendReset(reset::synthesize(&segment, remote)))
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::test_utils::{segment, RecordingObserver};
    use crate::observer::NullObserver;
    use crate::packet::TCPFlags;
    use std::net::SocketAddrV4;

    const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
    const REMOTE: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

    fn outbound(seq: u32, ack: u32) -> Event {
        Event::Packet(segment(LOCAL, 4000, REMOTE, 80, seq, ack))
    }

    fn inbound(seq: u32, ack: u32) -> Event {
        Event::Packet(segment(REMOTE, 80, LOCAL, 4000, seq, ack))
    }

    fn resets(actions: &[Action]) -> Vec<ResetSegment> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::SendReset(rst) => Some(*rst),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_shot_resets_on_first_match() {
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, false), &NullObserver);

        let action = machine.handle(outbound(1000, 2000));
        assert_eq!(machine.state(), State::Terminating);

        match action {
            Action::SendReset(rst) => {
                assert_eq!(rst.src, SocketAddrV4::new(LOCAL, 4000));
                assert_eq!(rst.dst, SocketAddrV4::new(REMOTE, 80));
                assert_eq!(rst.seq, 1000);
                assert_eq!(rst.ack, 0);
                assert_eq!(rst.flags, TCPFlags::RST);
                assert_eq!(rst.window, 64);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_single_shot_sends_exactly_one_reset() {
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, false), &NullObserver);

        let actions: Vec<Action> = [outbound(1, 2), inbound(2, 3), Event::Timer, outbound(3, 4), Event::Timer]
            .into_iter()
            .map(|e| machine.handle(e))
            .collect();

        assert_eq!(resets(&actions).len(), 1);
        assert!(actions[1..].iter().all(|a| *a == Action::Halt));
        assert_eq!(machine.state(), State::Terminating);
    }

    #[test]
    fn test_foreign_packets_are_ignored() {
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, false), &NullObserver);

        let stray = Event::Packet(segment(LOCAL, 5000, REMOTE, 80, 1, 2));
        assert_eq!(machine.handle(stray), Action::Wait);
        assert_eq!(machine.state(), State::Seeking);
        assert_eq!(machine.session().remote(), None);
        assert!(machine.session().intercepted().is_none());
    }

    #[test]
    fn test_timer_without_capture_does_nothing() {
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, true), &NullObserver);

        for _ in 0..5 {
            assert_eq!(machine.handle(Event::Timer), Action::Wait);
            assert_eq!(machine.state(), State::Seeking);
        }
    }

    #[test]
    fn test_persist_waits_for_timer() {
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, true), &NullObserver);

        assert_eq!(machine.handle(outbound(1000, 2000)), Action::Wait);
        assert_eq!(machine.state(), State::Seeking);
        assert_eq!(machine.handle(inbound(2000, 1500)), Action::Wait);
        assert_eq!(machine.handle(outbound(1500, 2100)), Action::Wait);

        match machine.handle(Event::Timer) {
            Action::SendReset(rst) => assert_eq!(rst.seq, 1500), // freshest snapshot
            other => panic!("unexpected action: {:?}", other),
        }
        assert_eq!(machine.state(), State::Terminating);
        assert_eq!(machine.handle(Event::Timer), Action::Halt);
    }

    #[test]
    fn test_persist_reverse_snapshot() {
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, true), &NullObserver);

        machine.handle(inbound(2000, 1000));
        match machine.handle(Event::Timer) {
            Action::SendReset(rst) => {
                assert_eq!(rst.src, SocketAddrV4::new(LOCAL, 4000));
                assert_eq!(rst.seq, 1000);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_remote_is_never_overwritten() {
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, true), &NullObserver);
        let spoofer = Ipv4Addr::new(6, 6, 6, 6);

        machine.handle(outbound(1, 2));
        machine.handle(Event::Packet(segment(spoofer, 80, LOCAL, 4000, 9, 9)));
        assert_eq!(machine.session().remote(), Some(REMOTE));
    }

    #[test]
    fn test_observer_sees_transitions() {
        let observer = RecordingObserver::default();
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, true), &observer);

        machine.handle(Event::Packet(segment(LOCAL, 1, REMOTE, 2, 0, 0)));
        machine.handle(outbound(1, 2));
        machine.handle(outbound(2, 3));
        machine.handle(Event::Timer);

        assert_eq!(
            observer.events(),
            vec![
                "seeking",
                "checked",
                "checked",
                "found 93.184.216.34",
                "collected",
                "seeking",
                "checked",
                "collected",
                "seeking",
                "done",
            ]
        );
    }

    #[test]
    fn test_single_shot_reports_done() {
        let observer = RecordingObserver::default();
        let mut machine = Machine::new(InterceptionSession::new(4000, 80, false), &observer);

        let action = machine.handle(outbound(1, 2));
        assert!(matches!(action, Action::SendReset(_)));

        assert_eq!(
            observer.events(),
            vec!["seeking", "checked", "found 93.184.216.34", "collected", "done"]
        );
    }
}
