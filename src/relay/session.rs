//! Relay Session
//!
//! The broadcaster/viewer state machine. `Session::handle` is a pure
//! transition: it mutates the two slots and the connection table, and returns
//! the sends and closes the transport must perform, in order.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::MalformedPolicy;
use crate::protocol::{
    Envelope, Payload, ProtocolError, Role, CLOSE_GOING_AWAY, CLOSE_INVALID_PAYLOAD,
    CLOSE_NORMAL, CLOSE_POLICY_VIOLATION, CLOSE_TRY_AGAIN_LATER, REASON_COUNTERPART_GONE,
    REASON_INVALID_ROLE, REASON_MALFORMED, REASON_SHUTTING_DOWN, REASON_SLOT_OCCUPIED,
};

/// Identity of one client link, assigned by the engine
pub type ConnectionId = u64;

/// Where a connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unassigned,
    Assigned(Role),
    /// Closed by the relay; waiting for the transport's terminal event
    Closed,
}

/// Lifecycle event delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect,
    Message(Payload),
    Disconnect,
    Error(String),
}

/// Action the transport must carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send {
        to: ConnectionId,
        payload: Payload,
    },
    Close {
        to: ConnectionId,
        code: u16,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    SlotOccupied(Role),
    InvalidRole,
    Malformed,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::SlotOccupied(_) => "slot_occupied",
            RejectReason::InvalidRole => "invalid_role",
            RejectReason::Malformed => "malformed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NoCounterpart,
    Unassigned,
    Malformed,
    Closed,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::NoCounterpart => "no_counterpart",
            DropReason::Unassigned => "unassigned",
            DropReason::Malformed => "malformed",
            DropReason::Closed => "closed",
        }
    }
}

/// What a transition did, for logging and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Connected,
    Admitted(Role),
    Rejected(RejectReason),
    Relayed { from: Role, bytes: usize },
    Dropped(DropReason),
    Released { role: Option<Role>, cascaded: bool },
    Ignored,
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub effects: Vec<Effect>,
    pub outcome: Outcome,
}

impl Transition {
    fn new(outcome: Outcome) -> Self {
        Self {
            effects: Vec::new(),
            outcome,
        }
    }

    fn with_effects(outcome: Outcome, effects: Vec<Effect>) -> Self {
        Self { effects, outcome }
    }
}

/// The one-to-one signaling session
#[derive(Debug)]
pub struct Session {
    broadcaster: Option<ConnectionId>,
    viewer: Option<ConnectionId>,
    connections: HashMap<ConnectionId, ConnectionState>,
    malformed_policy: MalformedPolicy,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(MalformedPolicy::default())
    }
}

impl Session {
    pub fn new(malformed_policy: MalformedPolicy) -> Self {
        Self {
            broadcaster: None,
            viewer: None,
            connections: HashMap::new(),
            malformed_policy,
        }
    }

    /// Apply one transport event
    pub fn handle(&mut self, id: ConnectionId, event: Event) -> Transition {
        match event {
            Event::Connect => self.on_connect(id),
            Event::Message(payload) => self.on_message(id, payload),
            Event::Disconnect => self.on_disconnect(id),
            Event::Error(reason) => {
                debug!(connection_id = id, %reason, "Transport error, treating as disconnect");
                self.on_disconnect(id)
            }
        }
    }

    /// Close every live connection, for server shutdown
    pub fn shutdown(&mut self) -> Vec<Effect> {
        self.broadcaster = None;
        self.viewer = None;

        let mut effects = Vec::new();
        for (&id, state) in self.connections.iter_mut() {
            if *state != ConnectionState::Closed {
                *state = ConnectionState::Closed;
                effects.push(Effect::Close {
                    to: id,
                    code: CLOSE_GOING_AWAY,
                    reason: REASON_SHUTTING_DOWN,
                });
            }
        }
        effects
    }

    /// Current holder of a slot
    pub fn slot(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::Broadcaster => self.broadcaster,
            Role::Viewer => self.viewer,
        }
    }

    pub fn broadcaster(&self) -> Option<ConnectionId> {
        self.broadcaster
    }

    pub fn viewer(&self) -> Option<ConnectionId> {
        self.viewer
    }

    pub fn state_of(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.connections.get(&id).copied()
    }

    /// Connections the transport has not yet reported as gone
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionId> {
        match role {
            Role::Broadcaster => &mut self.broadcaster,
            Role::Viewer => &mut self.viewer,
        }
    }

    fn on_connect(&mut self, id: ConnectionId) -> Transition {
        if self.connections.contains_key(&id) {
            warn!(connection_id = id, "Duplicate connect event ignored");
            return Transition::new(Outcome::Ignored);
        }

        self.connections.insert(id, ConnectionState::Unassigned);
        debug!(connection_id = id, "Connection awaiting identify");
        Transition::new(Outcome::Connected)
    }

    fn on_message(&mut self, id: ConnectionId, payload: Payload) -> Transition {
        let state = match self.connections.get(&id) {
            Some(ConnectionState::Closed) | None => {
                return Transition::new(Outcome::Dropped(DropReason::Closed));
            }
            Some(state) => *state,
        };

        let envelope = match Envelope::parse(payload.as_bytes()) {
            Ok(envelope) => envelope,
            Err(e) => return self.on_malformed(id, state, e),
        };

        match state {
            ConnectionState::Unassigned if envelope.is_identify() => self.identify(id, &envelope),
            ConnectionState::Unassigned => {
                debug!(
                    connection_id = id,
                    msg_type = envelope.kind(),
                    "Ignoring message from unidentified connection"
                );
                Transition::new(Outcome::Dropped(DropReason::Unassigned))
            }
            ConnectionState::Assigned(role) => self.relay(role, envelope.kind(), payload),
            ConnectionState::Closed => Transition::new(Outcome::Dropped(DropReason::Closed)),
        }
    }

    fn identify(&mut self, id: ConnectionId, envelope: &Envelope) -> Transition {
        let role = match envelope.requested_role() {
            Ok(role) => role,
            Err(e) => {
                warn!(connection_id = id, error = %e, "Rejecting identify");
                return self.reject(
                    id,
                    RejectReason::InvalidRole,
                    CLOSE_POLICY_VIOLATION,
                    REASON_INVALID_ROLE,
                );
            }
        };

        if let Some(holder) = self.slot(role) {
            warn!(
                connection_id = id,
                holder, %role,
                "Rejecting identify, slot already occupied"
            );
            return self.reject(
                id,
                RejectReason::SlotOccupied(role),
                CLOSE_TRY_AGAIN_LATER,
                REASON_SLOT_OCCUPIED,
            );
        }

        *self.slot_mut(role) = Some(id);
        self.connections.insert(id, ConnectionState::Assigned(role));
        info!(connection_id = id, %role, "{} connected", role);
        Transition::new(Outcome::Admitted(role))
    }

    fn reject(
        &mut self,
        id: ConnectionId,
        reason: RejectReason,
        code: u16,
        text: &'static str,
    ) -> Transition {
        self.connections.insert(id, ConnectionState::Closed);
        Transition::with_effects(
            Outcome::Rejected(reason),
            vec![Effect::Close {
                to: id,
                code,
                reason: text,
            }],
        )
    }

    fn relay(&mut self, from: Role, msg_type: &str, payload: Payload) -> Transition {
        match self.slot(from.counterpart()) {
            Some(peer) => {
                let bytes = payload.len();
                debug!(%from, msg_type, bytes, "Relaying message");
                Transition::with_effects(
                    Outcome::Relayed { from, bytes },
                    vec![Effect::Send { to: peer, payload }],
                )
            }
            None => {
                debug!(%from, msg_type, "No counterpart connected, dropping message");
                Transition::new(Outcome::Dropped(DropReason::NoCounterpart))
            }
        }
    }

    fn on_malformed(
        &mut self,
        id: ConnectionId,
        state: ConnectionState,
        error: ProtocolError,
    ) -> Transition {
        match self.malformed_policy {
            MalformedPolicy::Drop => {
                warn!(connection_id = id, error = %error, "Dropping malformed message");
                Transition::new(Outcome::Dropped(DropReason::Malformed))
            }
            MalformedPolicy::Close => {
                warn!(connection_id = id, error = %error, "Closing connection on malformed message");
                self.connections.insert(id, ConnectionState::Closed);
                let mut effects = vec![Effect::Close {
                    to: id,
                    code: CLOSE_INVALID_PAYLOAD,
                    reason: REASON_MALFORMED,
                }];
                if let ConnectionState::Assigned(role) = state {
                    effects.extend(self.vacate(id, role));
                }
                Transition::with_effects(Outcome::Rejected(RejectReason::Malformed), effects)
            }
        }
    }

    fn on_disconnect(&mut self, id: ConnectionId) -> Transition {
        match self.connections.remove(&id) {
            None => Transition::new(Outcome::Ignored),
            Some(ConnectionState::Unassigned) | Some(ConnectionState::Closed) => {
                debug!(connection_id = id, "Connection without a role closed");
                Transition::new(Outcome::Released {
                    role: None,
                    cascaded: false,
                })
            }
            Some(ConnectionState::Assigned(role)) => {
                info!(connection_id = id, %role, "{} disconnected", role);
                let effects = self.vacate(id, role);
                let cascaded = !effects.is_empty();
                Transition::with_effects(
                    Outcome::Released {
                        role: Some(role),
                        cascaded,
                    },
                    effects,
                )
            }
        }
    }

    /// Clear the slot held by `id` and, when the broadcaster leaves, close the viewer
    fn vacate(&mut self, id: ConnectionId, role: Role) -> Vec<Effect> {
        let slot = self.slot_mut(role);
        if *slot != Some(id) {
            return Vec::new();
        }
        *slot = None;

        if role != Role::Broadcaster {
            return Vec::new();
        }

        match self.viewer.take() {
            Some(viewer) => {
                info!(connection_id = viewer, "Closing viewer, broadcaster is gone");
                self.connections.insert(viewer, ConnectionState::Closed);
                vec![Effect::Close {
                    to: viewer,
                    code: CLOSE_NORMAL,
                    reason: REASON_COUNTERPART_GONE,
                }]
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn text(s: &str) -> Event {
        Event::Message(Payload::Text(s.to_string()))
    }

    fn identify(role: &str) -> Event {
        text(&format!(r#"{{"type":"identify","role":"{}"}}"#, role))
    }

    fn connect_as(session: &mut Session, id: ConnectionId, role: &str) -> Transition {
        session.handle(id, Event::Connect);
        session.handle(id, identify(role))
    }

    #[test]
    fn test_connect_starts_unassigned() {
        let mut session = Session::default();
        let t = session.handle(1, Event::Connect);
        assert_eq!(t.outcome, Outcome::Connected);
        assert!(t.effects.is_empty());
        assert_eq!(session.state_of(1), Some(ConnectionState::Unassigned));
        assert_eq!(session.broadcaster(), None);
        assert_eq!(session.viewer(), None);
    }

    #[test]
    fn test_identify_assigns_role() {
        let mut session = Session::default();
        let t = connect_as(&mut session, 1, "broadcaster");
        assert_eq!(t.outcome, Outcome::Admitted(Role::Broadcaster));
        assert!(t.effects.is_empty());
        assert_eq!(session.broadcaster(), Some(1));
        assert_eq!(
            session.state_of(1),
            Some(ConnectionState::Assigned(Role::Broadcaster))
        );

        connect_as(&mut session, 2, "viewer");
        assert_eq!(session.viewer(), Some(2));
    }

    #[test]
    fn test_second_broadcaster_rejected() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");

        let t = connect_as(&mut session, 2, "broadcaster");
        assert_eq!(
            t.outcome,
            Outcome::Rejected(RejectReason::SlotOccupied(Role::Broadcaster))
        );
        assert_eq!(
            t.effects,
            vec![Effect::Close {
                to: 2,
                code: 1013,
                reason: REASON_SLOT_OCCUPIED
            }]
        );
        assert_eq!(session.broadcaster(), Some(1));
        assert_eq!(session.state_of(2), Some(ConnectionState::Closed));
    }

    #[test]
    fn test_second_viewer_rejected() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "viewer");
        let t = connect_as(&mut session, 2, "viewer");
        assert_eq!(t.effects.len(), 1);
        assert!(matches!(t.effects[0], Effect::Close { to: 2, code: 1013, .. }));
        assert_eq!(session.viewer(), Some(1));
    }

    #[test]
    fn test_invalid_role_rejected() {
        let mut session = Session::default();
        let t = connect_as(&mut session, 1, "moderator");
        assert_eq!(t.outcome, Outcome::Rejected(RejectReason::InvalidRole));
        assert!(matches!(t.effects[0], Effect::Close { to: 1, code: 1008, .. }));

        session.handle(2, Event::Connect);
        let t = session.handle(2, text(r#"{"type":"identify"}"#));
        assert!(matches!(t.effects[0], Effect::Close { to: 2, code: 1008, .. }));

        assert_eq!(session.broadcaster(), None);
        assert_eq!(session.viewer(), None);
    }

    #[test]
    fn test_unassigned_messages_ignored() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "viewer");
        session.handle(2, Event::Connect);

        let t = session.handle(2, text(r#"{"type":"offer","sdp":"v=0"}"#));
        assert_eq!(t.outcome, Outcome::Dropped(DropReason::Unassigned));
        assert!(t.effects.is_empty());
        assert_eq!(session.state_of(2), Some(ConnectionState::Unassigned));
    }

    #[test]
    fn test_relay_is_verbatim_in_both_directions() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");
        connect_as(&mut session, 2, "viewer");

        let offer = r#"{ "type": "offer",  "sdp": "v=0\r\no=- 1 2 IN IP4 127.0.0.1" }"#;
        let t = session.handle(1, text(offer));
        assert_eq!(
            t.effects,
            vec![Effect::Send {
                to: 2,
                payload: Payload::Text(offer.to_string())
            }]
        );
        assert_eq!(
            t.outcome,
            Outcome::Relayed {
                from: Role::Broadcaster,
                bytes: offer.len()
            }
        );

        let answer = Bytes::from_static(br#"{"type":"answer","sdp":"v=0"}"#);
        let t = session.handle(2, Event::Message(Payload::Binary(answer.clone())));
        assert_eq!(
            t.effects,
            vec![Effect::Send {
                to: 1,
                payload: Payload::Binary(answer)
            }]
        );
    }

    #[test]
    fn test_relay_without_counterpart_drops() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");

        for _ in 0..100 {
            let t = session.handle(1, text(r#"{"type":"ice-candidate","candidate":"c"}"#));
            assert_eq!(t.outcome, Outcome::Dropped(DropReason::NoCounterpart));
            assert!(t.effects.is_empty());
        }
        assert_eq!(session.connection_count(), 1);
    }

    #[test]
    fn test_identify_after_assignment_is_relayed() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");
        connect_as(&mut session, 2, "viewer");

        let t = session.handle(2, identify("broadcaster"));
        assert!(matches!(&t.effects[..], [Effect::Send { to: 1, .. }]));
        assert_eq!(
            session.state_of(2),
            Some(ConnectionState::Assigned(Role::Viewer))
        );
        assert_eq!(session.broadcaster(), Some(1));
    }

    #[test]
    fn test_broadcaster_disconnect_cascades_to_viewer() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");
        connect_as(&mut session, 2, "viewer");

        let t = session.handle(1, Event::Disconnect);
        assert_eq!(
            t.outcome,
            Outcome::Released {
                role: Some(Role::Broadcaster),
                cascaded: true
            }
        );
        assert_eq!(
            t.effects,
            vec![Effect::Close {
                to: 2,
                code: 1000,
                reason: REASON_COUNTERPART_GONE
            }]
        );
        assert_eq!(session.broadcaster(), None);
        assert_eq!(session.viewer(), None);

        // the cascaded viewer is closed, its late messages go nowhere
        let t = session.handle(2, text(r#"{"type":"answer"}"#));
        assert_eq!(t.outcome, Outcome::Dropped(DropReason::Closed));

        let t = connect_as(&mut session, 3, "broadcaster");
        assert_eq!(t.outcome, Outcome::Admitted(Role::Broadcaster));
    }

    #[test]
    fn test_stale_viewer_disconnect_keeps_new_viewer() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");
        connect_as(&mut session, 2, "viewer");
        session.handle(1, Event::Disconnect);

        connect_as(&mut session, 3, "broadcaster");
        connect_as(&mut session, 4, "viewer");

        let t = session.handle(2, Event::Disconnect);
        assert!(t.effects.is_empty());
        assert_eq!(session.viewer(), Some(4));
        assert_eq!(session.broadcaster(), Some(3));
    }

    #[test]
    fn test_viewer_disconnect_keeps_broadcaster() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");
        connect_as(&mut session, 2, "viewer");

        let t = session.handle(2, Event::Error("connection reset".to_string()));
        assert!(t.effects.is_empty());
        assert_eq!(
            t.outcome,
            Outcome::Released {
                role: Some(Role::Viewer),
                cascaded: false
            }
        );
        assert_eq!(session.broadcaster(), Some(1));
        assert_eq!(session.viewer(), None);

        let t = connect_as(&mut session, 3, "viewer");
        assert_eq!(t.outcome, Outcome::Admitted(Role::Viewer));
        let t = session.handle(1, text(r#"{"type":"offer"}"#));
        assert!(matches!(&t.effects[..], [Effect::Send { to: 3, .. }]));
    }

    #[test]
    fn test_broadcaster_disconnect_without_viewer() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");
        let t = session.handle(1, Event::Disconnect);
        assert!(t.effects.is_empty());
        assert_eq!(
            t.outcome,
            Outcome::Released {
                role: Some(Role::Broadcaster),
                cascaded: false
            }
        );
    }

    #[test]
    fn test_unassigned_disconnect_touches_nothing() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");
        connect_as(&mut session, 2, "viewer");
        session.handle(3, Event::Connect);

        let t = session.handle(3, Event::Disconnect);
        assert!(t.effects.is_empty());
        assert_eq!(session.broadcaster(), Some(1));
        assert_eq!(session.viewer(), Some(2));
        assert_eq!(session.state_of(3), None);
    }

    #[test]
    fn test_repeated_disconnect_is_idempotent() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "viewer");
        session.handle(1, Event::Disconnect);
        let t = session.handle(1, Event::Error("late".to_string()));
        assert_eq!(t.outcome, Outcome::Ignored);
        assert_eq!(session.viewer(), None);
    }

    #[test]
    fn test_malformed_dropped_by_default() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");
        connect_as(&mut session, 2, "viewer");

        let t = session.handle(1, text("{not json"));
        assert_eq!(t.outcome, Outcome::Dropped(DropReason::Malformed));
        assert!(t.effects.is_empty());
        assert_eq!(session.broadcaster(), Some(1));

        session.handle(3, Event::Connect);
        let t = session.handle(3, text(r#"{"role":"viewer"}"#));
        assert_eq!(t.outcome, Outcome::Dropped(DropReason::Malformed));
        assert_eq!(session.state_of(3), Some(ConnectionState::Unassigned));
    }

    #[test]
    fn test_malformed_close_policy() {
        let mut session = Session::new(MalformedPolicy::Close);
        connect_as(&mut session, 1, "broadcaster");
        connect_as(&mut session, 2, "viewer");

        let t = session.handle(1, text("garbage"));
        assert_eq!(t.outcome, Outcome::Rejected(RejectReason::Malformed));
        assert_eq!(
            t.effects,
            vec![
                Effect::Close {
                    to: 1,
                    code: 1007,
                    reason: REASON_MALFORMED
                },
                Effect::Close {
                    to: 2,
                    code: 1000,
                    reason: REASON_COUNTERPART_GONE
                },
            ]
        );
        assert_eq!(session.broadcaster(), None);
        assert_eq!(session.viewer(), None);

        // terminal events for both arrive later and change nothing
        assert!(session.handle(1, Event::Disconnect).effects.is_empty());
        assert!(session.handle(2, Event::Disconnect).effects.is_empty());
        assert_eq!(session.connection_count(), 0);
    }

    #[test]
    fn test_shutdown_closes_everyone() {
        let mut session = Session::default();
        connect_as(&mut session, 1, "broadcaster");
        connect_as(&mut session, 2, "viewer");
        session.handle(3, Event::Connect);
        connect_as(&mut session, 4, "viewer");

        let mut effects = session.shutdown();
        effects.sort_by_key(|e| match e {
            Effect::Close { to, .. } | Effect::Send { to, .. } => *to,
        });
        let closed: Vec<ConnectionId> = effects
            .iter()
            .map(|e| match e {
                Effect::Close { to, code, .. } => {
                    assert_eq!(*code, 1001);
                    *to
                }
                other => panic!("unexpected effect {:?}", other),
            })
            .collect();
        // 4 was already closed by rejection
        assert_eq!(closed, vec![1, 2, 3]);
        assert_eq!(session.broadcaster(), None);
        assert_eq!(session.viewer(), None);
    }

    #[test]
    fn test_example_scenario() {
        let mut session = Session::default();
        session.handle(10, Event::Connect);
        session.handle(10, identify("broadcaster"));
        session.handle(20, Event::Connect);
        session.handle(20, identify("viewer"));

        let offer = r#"{"type":"offer","sdp":"..."}"#;
        let t = session.handle(10, text(offer));
        assert_eq!(
            t.effects,
            vec![Effect::Send {
                to: 20,
                payload: Payload::Text(offer.to_string())
            }]
        );

        let t = session.handle(10, Event::Disconnect);
        assert!(matches!(
            &t.effects[..],
            [Effect::Close { to: 20, code: 1000, .. }]
        ));
    }

    #[test]
    fn test_slots_stay_exclusive_under_churn() {
        let mut session = Session::default();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..5000 {
            let id = next() % 8;
            let event = match next() % 5 {
                0 => Event::Connect,
                1 => identify("broadcaster"),
                2 => identify("viewer"),
                3 => text(r#"{"type":"offer"}"#),
                _ => Event::Disconnect,
            };
            let t = session.handle(id, event);

            for effect in &t.effects {
                if let Effect::Send { to, .. } = effect {
                    assert!(matches!(
                        session.state_of(*to),
                        Some(ConnectionState::Assigned(_))
                    ));
                }
            }

            let holders = |role: Role| {
                (0..8)
                    .filter(|c| session.state_of(*c) == Some(ConnectionState::Assigned(role)))
                    .count()
            };
            assert!(holders(Role::Broadcaster) <= 1);
            assert!(holders(Role::Viewer) <= 1);
            if let Some(b) = session.broadcaster() {
                assert_eq!(
                    session.state_of(b),
                    Some(ConnectionState::Assigned(Role::Broadcaster))
                );
            }
            if let Some(v) = session.viewer() {
                assert_eq!(
                    session.state_of(v),
                    Some(ConnectionState::Assigned(Role::Viewer))
                );
            }
        }
    }
}
