//! Game Logic Module
//!
//! The rules of a single game. Synchronous and deterministic for a given
//! seed; no I/O happens here.
//!
//! ## Module Structure
//!
//! - `ship`: Ship classes and hull geometry
//! - `fleet`: Placement rules for a full fleet
//! - `state`: Session phases, seats and fleet submission
//! - `combat`: Shot resolution, kill zones, turn passing and victory

pub mod combat;
pub mod fleet;
pub mod ship;
pub mod state;

// Re-export key types
pub use combat::{AttackReport, AttackStatus};
pub use fleet::{check as check_fleet, validate as validate_fleet, Fleet, FleetError, FLEET_SIZE};
pub use ship::{Orientation, Ship, ShipClass};
pub use state::{FleetOutcome, PlayerSlot, Session, SessionError, SessionPhase, TurnPolicy};
