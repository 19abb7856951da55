//! Event Fan-out
//!
//! Translates lobby and engine outcomes into outbound [`ServerMessage`]s and
//! hands them to the transport through the [`Outbox`] boundary.
//!
//! Delivery is fire-and-forget. A player without a live connection simply
//! misses the event; the game does not wait for them.

use std::sync::Arc;

use tracing::debug;

use crate::core::grid::Cell;
use crate::core::ids::{ConnectionId, PlayerId, SessionId};
use crate::game::combat::{AttackReport, AttackStatus};
use crate::game::ship::Ship;
use crate::lobby::registry::PlayerRegistry;
use crate::lobby::rooms::RoomManager;
use crate::network::protocol::{
    AttackPayload, CreateGamePayload, FinishPayload, RoomPayload, RoomUserPayload, ServerMessage,
    ShipPayload, StartGamePayload, TurnPayload, WinnerPayload,
};

/// Transport boundary.
pub trait Outbox: Send + Sync {
    /// Deliver to one connection.
    fn send(&self, to: ConnectionId, message: ServerMessage);

    /// Deliver to every open connection.
    fn broadcast(&self, message: ServerMessage);
}

/// Addressing on top of an [`Outbox`].
#[derive(Clone)]
pub struct Fanout {
    outbox: Arc<dyn Outbox>,
}

impl Fanout {
    /// Wrap a transport.
    pub fn new(outbox: Arc<dyn Outbox>) -> Self {
        Self { outbox }
    }

    /// Reply on a connection.
    pub fn send(&self, to: ConnectionId, message: ServerMessage) {
        self.outbox.send(to, message);
    }

    /// Deliver to every open connection.
    pub fn broadcast(&self, message: ServerMessage) {
        self.outbox.broadcast(message);
    }

    /// Deliver to a player's live connection. Returns false if they have none.
    pub fn to_player(&self, players: &PlayerRegistry, player: &PlayerId, message: ServerMessage) -> bool {
        match players.connection_of(player) {
            Some(conn) => {
                self.outbox.send(conn, message);
                true
            }
            None => {
                debug!("Player {} offline, dropping {:?}", player.short(), message);
                false
            }
        }
    }

    /// Deliver the same sequence to each player, in order.
    pub fn to_players(&self, players: &PlayerRegistry, recipients: &[PlayerId], messages: &[ServerMessage]) {
        for recipient in recipients {
            for message in messages {
                self.to_player(players, recipient, message.clone());
            }
        }
    }
}

// =============================================================================
// EVENT BUILDERS
// =============================================================================

/// Current open-room listing.
pub fn room_list(rooms: &RoomManager) -> ServerMessage {
    ServerMessage::UpdateRoom(
        rooms
            .available_rooms()
            .into_iter()
            .map(|room| RoomPayload {
                room_id: room.id,
                room_users: room
                    .members
                    .iter()
                    .map(|m| RoomUserPayload {
                        name: m.name.clone(),
                        index: m.player_id,
                    })
                    .collect(),
            })
            .collect(),
    )
}

/// Current win table.
pub fn winners_table(players: &PlayerRegistry) -> ServerMessage {
    ServerMessage::UpdateWinners(
        players
            .winners()
            .into_iter()
            .map(|(name, wins)| WinnerPayload { name, wins })
            .collect(),
    )
}

/// `create_game` for one participant.
pub fn create_game(session: SessionId, player: PlayerId) -> ServerMessage {
    ServerMessage::CreateGame(CreateGamePayload {
        id_game: session,
        id_player: player,
    })
}

/// `start_game` for one participant, carrying their own fleet.
pub fn start_game(ships: &[Ship], player: PlayerId) -> ServerMessage {
    ServerMessage::StartGame(StartGamePayload {
        ships: ships.iter().map(ShipPayload::from).collect(),
        current_player_index: player,
    })
}

/// `turn` event.
pub fn turn(player: PlayerId) -> ServerMessage {
    ServerMessage::Turn(TurnPayload { current_player: player })
}

/// Events both participants receive for one shot.
///
/// A kill reports every hull cell as `killed` and every auto-filled buffer
/// cell as `miss`. The trailing event is `turn`, or `finish` if the shot
/// ended the game.
pub fn attack_events(report: &AttackReport) -> Vec<ServerMessage> {
    let attack = |cell: Cell, status: AttackStatus| {
        ServerMessage::Attack(AttackPayload {
            position: cell.into(),
            current_player: report.attacker,
            status,
        })
    };

    let mut events = Vec::new();
    match report.status {
        AttackStatus::Killed => {
            events.extend(report.sunk_cells.iter().map(|c| attack(*c, AttackStatus::Killed)));
            events.extend(report.zone_cells.iter().map(|c| attack(*c, AttackStatus::Miss)));
        }
        status => events.push(attack(report.cell, status)),
    }

    if let Some(winner) = report.winner {
        events.push(ServerMessage::Finish(FinishPayload { win_player: winner }));
    } else if let Some(next) = report.turn_owner {
        events.push(turn(next));
    }
    events
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::network::protocol::Position;
    use parking_lot::Mutex;

    /// Where a recorded message went.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Target {
        One(ConnectionId),
        All,
    }

    /// Outbox that keeps everything it is handed.
    #[derive(Default)]
    pub(crate) struct RecordingOutbox {
        sent: Mutex<Vec<(Target, ServerMessage)>>,
    }

    impl RecordingOutbox {
        /// Everything recorded so far, clearing the log.
        pub(crate) fn take(&self) -> Vec<(Target, ServerMessage)> {
            std::mem::take(&mut *self.sent.lock())
        }

        /// Messages a connection would have received (direct or broadcast), clearing nothing.
        pub(crate) fn received_by(&self, conn: ConnectionId) -> Vec<ServerMessage> {
            self.sent
                .lock()
                .iter()
                .filter(|(t, _)| *t == Target::One(conn) || *t == Target::All)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    impl Outbox for RecordingOutbox {
        fn send(&self, to: ConnectionId, message: ServerMessage) {
            self.sent.lock().push((Target::One(to), message));
        }

        fn broadcast(&self, message: ServerMessage) {
            self.sent.lock().push((Target::All, message));
        }
    }

    const ALICE: PlayerId = PlayerId::new([1; 16]);
    const BOB: PlayerId = PlayerId::new([2; 16]);

    fn report(status: AttackStatus) -> AttackReport {
        AttackReport {
            attacker: ALICE,
            defender: BOB,
            cell: Cell::new(1, 0),
            status,
            sunk_cells: Vec::new(),
            zone_cells: Vec::new(),
            turn_owner: Some(ALICE),
            winner: None,
        }
    }

    fn status_at(message: &ServerMessage) -> Option<(Position, AttackStatus)> {
        match message {
            ServerMessage::Attack(a) => Some((a.position, a.status)),
            _ => None,
        }
    }

    #[test]
    fn test_hit_then_turn() {
        let events = attack_events(&report(AttackStatus::Hit));
        assert_eq!(events.len(), 2);
        assert_eq!(status_at(&events[0]), Some((Position { x: 1, y: 0 }, AttackStatus::Hit)));
        assert_eq!(events[1], turn(ALICE));
    }

    #[test]
    fn test_kill_expands_to_cells() {
        let mut r = report(AttackStatus::Killed);
        r.sunk_cells = vec![Cell::new(0, 0), Cell::new(1, 0)];
        r.zone_cells = vec![Cell::new(0, 1), Cell::new(1, 1), Cell::new(2, 0), Cell::new(2, 1)];

        let events = attack_events(&r);
        let statuses: Vec<AttackStatus> = events.iter().filter_map(status_at).map(|(_, s)| s).collect();
        assert_eq!(
            statuses,
            vec![
                AttackStatus::Killed,
                AttackStatus::Killed,
                AttackStatus::Miss,
                AttackStatus::Miss,
                AttackStatus::Miss,
                AttackStatus::Miss,
            ]
        );
        assert_eq!(events.last(), Some(&turn(ALICE)));
    }

    #[test]
    fn test_winning_shot_ends_with_finish() {
        let mut r = report(AttackStatus::Killed);
        r.sunk_cells = vec![Cell::new(1, 0)];
        r.turn_owner = None;
        r.winner = Some(ALICE);

        let events = attack_events(&r);
        assert_eq!(
            events.last(),
            Some(&ServerMessage::Finish(FinishPayload { win_player: ALICE }))
        );
        assert!(!events.iter().any(|e| matches!(e, ServerMessage::Turn(_))));
    }

    #[test]
    fn test_room_list_hides_full_rooms() {
        let mut rooms = RoomManager::new();
        let open = rooms.create_room(ALICE, "alice").unwrap();
        let ServerMessage::UpdateRoom(list) = room_list(&rooms) else {
            panic!("expected update_room");
        };
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].room_id, open.id);
        assert_eq!(list[0].room_users[0].name, "alice");

        rooms.join_room(&open.id, BOB, "bob").unwrap();
        assert_eq!(room_list(&rooms), ServerMessage::UpdateRoom(Vec::new()));
    }

    #[test]
    fn test_to_player_skips_offline() {
        let outbox = Arc::new(RecordingOutbox::default());
        let fanout = Fanout::new(outbox.clone());
        let mut players = PlayerRegistry::new();
        let alice = players.register("alice", "pw", ConnectionId(7)).unwrap();

        assert!(fanout.to_player(&players, &alice.id, turn(alice.id)));
        assert!(!fanout.to_player(&players, &BOB, turn(alice.id)));
        assert_eq!(outbox.take(), vec![(Target::One(ConnectionId(7)), turn(alice.id))]);
    }
}
