//! Session State
//!
//! A session is one two-player game. It moves through three phases:
//!
//! ```text
//! AwaitingFleets ──both fleets valid──▶ InProgress { turn_owner } ──fleet sunk──▶ Finished { winner }
//! ```
//!
//! The session is a plain state machine: it never blocks, performs no I/O
//! and owns its RNG, so a seed fully determines turn order and random shots.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::grid::Cell;
use crate::core::ids::{PlayerId, SessionId};
use crate::core::rng::DeterministicRng;
use crate::game::fleet::{Fleet, FleetError};
use crate::game::ship::Ship;

// =============================================================================
// PHASES & POLICY
// =============================================================================

/// Session phase, with the data each phase owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for both players to place their fleets.
    AwaitingFleets,
    /// Combat; only `turn_owner` may fire.
    InProgress {
        /// The player allowed to attack.
        turn_owner: PlayerId,
    },
    /// Terminal.
    Finished {
        /// The player who sank the opposing fleet.
        winner: PlayerId,
    },
}

/// Who fires next after a hit or a kill. A miss always passes the turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPolicy {
    /// The attacker keeps the turn after a hit or kill.
    #[default]
    ShootAgainOnHit,
    /// The turn passes after every shot.
    AlwaysAlternate,
}

impl TurnPolicy {
    /// Parse a policy name as used in configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "shoot_again" | "shoot_again_on_hit" => Some(Self::ShootAgainOnHit),
            "alternate" | "always_alternate" => Some(Self::AlwaysAlternate),
            _ => None,
        }
    }
}

// =============================================================================
// PLAYER SLOT
// =============================================================================

/// One seat at the table.
#[derive(Clone, Debug)]
pub struct PlayerSlot {
    /// Seated player.
    pub player_id: PlayerId,
    /// Placed fleet, absent until accepted.
    pub fleet: Option<Fleet>,
    /// Every cell this player has fired at (or had auto-filled).
    pub shots_fired: BTreeSet<Cell>,
    /// The subset of `shots_fired` that struck the opponent's fleet.
    pub confirmed_hits: BTreeSet<Cell>,
}

impl PlayerSlot {
    fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            fleet: None,
            shots_fired: BTreeSet::new(),
            confirmed_hits: BTreeSet::new(),
        }
    }

    /// Whether a fleet has been accepted.
    pub fn has_fleet(&self) -> bool {
        self.fleet.is_some()
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Rejected session commands. No rejection mutates the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The player is not seated in this session.
    #[error("You are not a participant of this game")]
    NotParticipant,

    /// Fleets can only be placed before combat starts.
    #[error("Ships can no longer be placed in this game")]
    FleetsLocked,

    /// The player already placed a fleet.
    #[error("Ships already placed")]
    FleetAlreadySubmitted,

    /// The fleet broke a placement rule.
    #[error("Invalid ship configuration: {0}")]
    InvalidFleet(#[from] FleetError),

    /// Attack before both fleets are placed.
    #[error("Game has not started yet")]
    GameNotStarted,

    /// Attack after the game ended.
    #[error("Game is already finished")]
    GameAlreadyFinished,

    /// Attack out of turn.
    #[error("Not your turn")]
    NotYourTurn,

    /// The attacker already fired at this cell.
    #[error("Cell ({}, {}) was already attacked", .0.x, .0.y)]
    CellAlreadyAttacked(Cell),

    /// The target is off the board.
    #[error("Cell ({}, {}) is outside the board", .0.x, .0.y)]
    OutOfBounds(Cell),

    /// Random attack requested with no unshot cell left.
    #[error("No cells left to attack")]
    NoCellsRemaining,
}

// =============================================================================
// SESSION
// =============================================================================

/// Outcome of a fleet submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FleetOutcome {
    /// Accepted; the opponent has not placed yet.
    Waiting,
    /// Accepted and combat began.
    Started {
        /// The randomly chosen first attacker.
        turn_owner: PlayerId,
    },
}

/// A two-player game.
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    pub(crate) slots: [PlayerSlot; 2],
    pub(crate) phase: SessionPhase,
    pub(crate) policy: TurnPolicy,
    pub(crate) rng: DeterministicRng,
}

impl Session {
    /// Create a session for two players.
    pub fn new(id: SessionId, players: [PlayerId; 2], seed: u64, policy: TurnPolicy) -> Self {
        Self {
            id,
            slots: players.map(PlayerSlot::new),
            phase: SessionPhase::AwaitingFleets,
            policy,
            rng: DeterministicRng::new(seed),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Turn policy in force.
    pub fn policy(&self) -> TurnPolicy {
        self.policy
    }

    /// Player allowed to attack, if combat is running.
    pub fn turn_owner(&self) -> Option<PlayerId> {
        match self.phase {
            SessionPhase::InProgress { turn_owner } => Some(turn_owner),
            _ => None,
        }
    }

    /// Winner, once finished.
    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            SessionPhase::Finished { winner } => Some(winner),
            _ => None,
        }
    }

    /// Whether the session reached its terminal phase.
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, SessionPhase::Finished { .. })
    }

    /// Both participants, in seat order.
    pub fn players(&self) -> [PlayerId; 2] {
        [self.slots[0].player_id, self.slots[1].player_id]
    }

    /// Whether `player_id` is seated here.
    pub fn is_participant(&self, player_id: &PlayerId) -> bool {
        self.slots.iter().any(|s| &s.player_id == player_id)
    }

    /// A player's slot.
    pub fn slot(&self, player_id: &PlayerId) -> Option<&PlayerSlot> {
        self.slots.iter().find(|s| &s.player_id == player_id)
    }

    /// The other player.
    pub fn opponent_of(&self, player_id: &PlayerId) -> Option<PlayerId> {
        let seat = self.seat_of(player_id)?;
        Some(self.slots[1 - seat].player_id)
    }

    pub(crate) fn seat_of(&self, player_id: &PlayerId) -> Option<usize> {
        self.slots.iter().position(|s| &s.player_id == player_id)
    }

    /// Place a fleet.
    ///
    /// Once both slots hold a valid fleet, combat starts and the first
    /// attacker is drawn with a fair coin.
    pub fn submit_fleet(
        &mut self,
        player_id: &PlayerId,
        ships: Vec<Ship>,
    ) -> Result<FleetOutcome, SessionError> {
        let seat = self.seat_of(player_id).ok_or(SessionError::NotParticipant)?;

        if self.phase != SessionPhase::AwaitingFleets {
            return Err(SessionError::FleetsLocked);
        }
        if self.slots[seat].has_fleet() {
            return Err(SessionError::FleetAlreadySubmitted);
        }

        let fleet = Fleet::new(ships)?;
        self.slots[seat].fleet = Some(fleet);

        if !self.slots.iter().all(PlayerSlot::has_fleet) {
            return Ok(FleetOutcome::Waiting);
        }

        let first = self.rng.next_int(2) as usize;
        let turn_owner = self.slots[first].player_id;
        self.phase = SessionPhase::InProgress { turn_owner };

        Ok(FleetOutcome::Started { turn_owner })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::fleet::tests::{standard_fleet, vertical_fleet};

    pub(crate) const ALICE: PlayerId = PlayerId::new([1; 16]);
    pub(crate) const BOB: PlayerId = PlayerId::new([2; 16]);

    pub(crate) fn new_session(seed: u64) -> Session {
        Session::new(SessionId::new([9; 16]), [ALICE, BOB], seed, TurnPolicy::default())
    }

    /// A session in combat: Alice holds the standard fleet, Bob the vertical one.
    pub(crate) fn started_session(seed: u64, policy: TurnPolicy) -> Session {
        let mut session = Session::new(SessionId::new([9; 16]), [ALICE, BOB], seed, policy);
        session.submit_fleet(&ALICE, standard_fleet()).unwrap();
        session.submit_fleet(&BOB, vertical_fleet()).unwrap();
        session
    }

    #[test]
    fn test_initial_phase() {
        let session = new_session(1);
        assert_eq!(session.phase(), SessionPhase::AwaitingFleets);
        assert_eq!(session.turn_owner(), None);
        assert_eq!(session.winner(), None);
        assert_eq!(session.opponent_of(&ALICE), Some(BOB));
        assert_eq!(session.opponent_of(&PlayerId::new([7; 16])), None);
    }

    #[test]
    fn test_first_fleet_waits_for_opponent() {
        let mut session = new_session(1);
        let outcome = session.submit_fleet(&ALICE, standard_fleet()).unwrap();
        assert_eq!(outcome, FleetOutcome::Waiting);
        assert_eq!(session.phase(), SessionPhase::AwaitingFleets);
        assert!(session.slot(&ALICE).unwrap().has_fleet());
    }

    #[test]
    fn test_both_fleets_start_combat() {
        let mut session = new_session(1);
        session.submit_fleet(&ALICE, standard_fleet()).unwrap();
        let outcome = session.submit_fleet(&BOB, vertical_fleet()).unwrap();

        let FleetOutcome::Started { turn_owner } = outcome else {
            panic!("combat should have started");
        };
        assert!(turn_owner == ALICE || turn_owner == BOB);
        assert_eq!(session.turn_owner(), Some(turn_owner));
    }

    #[test]
    fn test_fleet_rejections() {
        let mut session = new_session(1);
        let stranger = PlayerId::new([7; 16]);

        assert_eq!(
            session.submit_fleet(&stranger, standard_fleet()),
            Err(SessionError::NotParticipant)
        );

        let mut bad = standard_fleet();
        bad.pop();
        assert!(matches!(
            session.submit_fleet(&ALICE, bad),
            Err(SessionError::InvalidFleet(FleetError::WrongShipCount(9)))
        ));
        assert!(!session.slot(&ALICE).unwrap().has_fleet());

        session.submit_fleet(&ALICE, standard_fleet()).unwrap();
        assert_eq!(
            session.submit_fleet(&ALICE, vertical_fleet()),
            Err(SessionError::FleetAlreadySubmitted)
        );

        session.submit_fleet(&BOB, standard_fleet()).unwrap();
        assert_eq!(
            session.submit_fleet(&BOB, standard_fleet()),
            Err(SessionError::FleetsLocked)
        );
    }

    #[test]
    fn test_first_turn_is_fair_over_seeds() {
        let trials = 2_000;
        let alice_first = (0..trials)
            .filter(|seed| {
                let mut session = new_session(*seed);
                session.submit_fleet(&ALICE, standard_fleet()).unwrap();
                session.submit_fleet(&BOB, standard_fleet()).unwrap();
                session.turn_owner() == Some(ALICE)
            })
            .count();

        // 50% ± ~4.5 standard deviations
        assert!((900..=1_100).contains(&alice_first), "alice first {alice_first}/{trials}");
    }

    #[test]
    fn test_same_seed_same_first_turn() {
        let run = |seed| {
            let mut session = new_session(seed);
            session.submit_fleet(&ALICE, standard_fleet()).unwrap();
            session.submit_fleet(&BOB, standard_fleet()).unwrap();
            session.turn_owner()
        };
        for seed in 0..50 {
            assert_eq!(run(seed), run(seed));
        }
    }

    #[test]
    fn test_turn_policy_names() {
        assert_eq!(TurnPolicy::from_name("shoot_again"), Some(TurnPolicy::ShootAgainOnHit));
        assert_eq!(TurnPolicy::from_name(" Alternate "), Some(TurnPolicy::AlwaysAlternate));
        assert_eq!(TurnPolicy::from_name("coin"), None);
    }
}
