//! Combat
//!
//! Shot resolution on a running [`Session`]. A shot either misses, hits a
//! ship, or kills it. Killing a ship marks its whole one-cell buffer as shot
//! for the attacker, since no ship can lie there.

use serde::{Deserialize, Serialize};

use crate::core::grid::{all_cells, buffer_zone, Cell};
use crate::core::ids::PlayerId;
use crate::game::ship::Ship;
use crate::game::state::{Session, SessionError, SessionPhase, TurnPolicy};

/// Result of a single shot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackStatus {
    /// Open water.
    Miss,
    /// Struck a ship that is still afloat.
    #[serde(rename = "shot")]
    Hit,
    /// Struck the last intact cell of a ship.
    Killed,
}

/// Everything that changed because of one shot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttackReport {
    /// Who fired.
    pub attacker: PlayerId,
    /// Who was fired upon.
    pub defender: PlayerId,
    /// Target cell.
    pub cell: Cell,
    /// Outcome.
    pub status: AttackStatus,
    /// Hull of the sunk ship, when `status` is `Killed`.
    pub sunk_cells: Vec<Cell>,
    /// Buffer cells auto-filled as misses after a kill.
    pub zone_cells: Vec<Cell>,
    /// Player to move next. `None` once the game is over.
    pub turn_owner: Option<PlayerId>,
    /// Set when this shot sank the last ship.
    pub winner: Option<PlayerId>,
}

impl Session {
    /// Fire at `(x, y)`.
    ///
    /// Checks run in order: participant, phase, turn, repeated cell, bounds.
    /// A rejected shot leaves the session untouched.
    pub fn attack(&mut self, attacker: &PlayerId, x: i32, y: i32) -> Result<AttackReport, SessionError> {
        let seat = self.check_shooter(attacker)?;
        let cell = Cell::new(x, y);

        if self.slots[seat].shots_fired.contains(&cell) {
            return Err(SessionError::CellAlreadyAttacked(cell));
        }
        if !cell.in_bounds() {
            return Err(SessionError::OutOfBounds(cell));
        }

        Ok(self.resolve(seat, cell))
    }

    /// Fire at a uniformly chosen cell the attacker has not shot yet.
    pub fn random_attack(&mut self, attacker: &PlayerId) -> Result<AttackReport, SessionError> {
        let seat = self.check_shooter(attacker)?;
        let candidates = self.remaining_targets(attacker);
        let cell = *self
            .rng
            .choose(&candidates)
            .ok_or(SessionError::NoCellsRemaining)?;

        Ok(self.resolve(seat, cell))
    }

    /// Board cells `player_id` has not fired at, row-major.
    pub fn remaining_targets(&self, player_id: &PlayerId) -> Vec<Cell> {
        match self.slot(player_id) {
            Some(slot) => all_cells().filter(|c| !slot.shots_fired.contains(c)).collect(),
            None => Vec::new(),
        }
    }

    /// Participant, phase and turn checks shared by both attack forms.
    fn check_shooter(&self, attacker: &PlayerId) -> Result<usize, SessionError> {
        let seat = self.seat_of(attacker).ok_or(SessionError::NotParticipant)?;
        match self.phase {
            SessionPhase::AwaitingFleets => Err(SessionError::GameNotStarted),
            SessionPhase::Finished { .. } => Err(SessionError::GameAlreadyFinished),
            SessionPhase::InProgress { turn_owner } if turn_owner != *attacker => {
                Err(SessionError::NotYourTurn)
            }
            SessionPhase::InProgress { .. } => Ok(seat),
        }
    }

    /// Apply a validated shot.
    fn resolve(&mut self, seat: usize, cell: Cell) -> AttackReport {
        let attacker = self.slots[seat].player_id;
        let defender = self.slots[1 - seat].player_id;

        // Both fleets are present once combat has started.
        let hull: Option<Vec<Cell>> = self.slots[1 - seat]
            .fleet
            .as_ref()
            .and_then(|fleet| fleet.ship_at(&cell))
            .map(Ship::cells);

        let slot = &mut self.slots[seat];
        slot.shots_fired.insert(cell);

        let mut sunk_cells = Vec::new();
        let mut zone_cells = Vec::new();

        let status = match hull {
            None => AttackStatus::Miss,
            Some(hull) => {
                slot.confirmed_hits.insert(cell);
                if hull.iter().all(|c| slot.confirmed_hits.contains(c)) {
                    zone_cells = buffer_zone(&hull)
                        .into_iter()
                        .filter(|c| slot.shots_fired.insert(*c))
                        .collect();
                    sunk_cells = hull;
                    AttackStatus::Killed
                } else {
                    AttackStatus::Hit
                }
            }
        };

        let fleet_sunk = self.slots[1 - seat]
            .fleet
            .as_ref()
            .is_some_and(|fleet| fleet.cells().is_subset(&self.slots[seat].confirmed_hits));

        let (turn_owner, winner) = if fleet_sunk {
            self.phase = SessionPhase::Finished { winner: attacker };
            (None, Some(attacker))
        } else {
            let next = match (status, self.policy) {
                (AttackStatus::Miss, _) | (_, TurnPolicy::AlwaysAlternate) => defender,
                _ => attacker,
            };
            self.phase = SessionPhase::InProgress { turn_owner: next };
            (Some(next), None)
        };

        AttackReport {
            attacker,
            defender,
            cell,
            status,
            sunk_cells,
            zone_cells,
            turn_owner,
            winner,
        }
    }
}
