//! Identity Registry
//!
//! Player records, name/password checks, connection bindings and win tallies.
//! Players are never removed; bindings come and go with connections.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::ids::{ConnectionId, PlayerId};

/// A registered player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable identity, assigned at first registration.
    pub id: PlayerId,
    /// Unique, case-sensitive display name.
    pub name: String,
    /// Stored verbatim and compared verbatim.
    password: String,
    /// Games won.
    pub wins: u32,
}

/// Registration rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Empty name or password.
    #[error("Name and password are required")]
    MissingCredentials,

    /// Name exists with a different password.
    #[error("Invalid password")]
    InvalidCredentials,

    /// No player with that id.
    #[error("Unknown player")]
    UnknownPlayer,
}

/// All known players plus the live connection bindings.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, Player>,
    /// Registration order, for stable tie-breaking in the winners table.
    order: Vec<PlayerId>,
    by_name: BTreeMap<String, PlayerId>,
    by_connection: BTreeMap<ConnectionId, PlayerId>,
    connections: BTreeMap<PlayerId, ConnectionId>,
}

impl PlayerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or log in, binding `connection` to the player.
    ///
    /// A new name creates a player with zero wins. A known name must present
    /// the same password; the existing record is returned and rebound.
    pub fn register(
        &mut self,
        name: &str,
        password: &str,
        connection: ConnectionId,
    ) -> Result<Player, RegistryError> {
        if name.is_empty() || password.is_empty() {
            return Err(RegistryError::MissingCredentials);
        }

        let id = match self.by_name.get(name) {
            Some(id) => {
                let existing = self.players.get(id).ok_or(RegistryError::UnknownPlayer)?;
                if existing.password != password {
                    return Err(RegistryError::InvalidCredentials);
                }
                *id
            }
            None => {
                let id = PlayerId::random();
                self.players.insert(
                    id,
                    Player {
                        id,
                        name: name.to_string(),
                        password: password.to_string(),
                        wins: 0,
                    },
                );
                self.order.push(id);
                self.by_name.insert(name.to_string(), id);
                id
            }
        };

        self.bind(id, connection);
        self.players.get(&id).cloned().ok_or(RegistryError::UnknownPlayer)
    }

    /// Keep bindings one-to-one in both directions.
    fn bind(&mut self, id: PlayerId, connection: ConnectionId) {
        if let Some(old_conn) = self.connections.insert(id, connection) {
            if old_conn != connection {
                self.by_connection.remove(&old_conn);
            }
        }
        if let Some(old_player) = self.by_connection.insert(connection, id) {
            if old_player != id {
                self.connections.remove(&old_player);
            }
        }
    }

    /// Player bound to `connection`.
    pub fn lookup_by_connection(&self, connection: ConnectionId) -> Option<&Player> {
        self.by_connection
            .get(&connection)
            .and_then(|id| self.players.get(id))
    }

    /// Live connection of `player_id`.
    pub fn connection_of(&self, player_id: &PlayerId) -> Option<ConnectionId> {
        self.connections.get(player_id).copied()
    }

    /// Player record.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Drop the binding for a closed connection. Returns the player it was bound to.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<PlayerId> {
        let id = self.by_connection.remove(&connection)?;
        self.connections.remove(&id);
        Some(id)
    }

    /// Increment the win counter. Call exactly once per game won.
    pub fn record_win(&mut self, player_id: &PlayerId) -> Result<u32, RegistryError> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(RegistryError::UnknownPlayer)?;
        player.wins += 1;
        Ok(player.wins)
    }

    /// `(name, wins)` for every player, most wins first, ties in registration order.
    pub fn winners(&self) -> Vec<(String, u32)> {
        let mut table: Vec<(String, u32)> = self
            .order
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|p| (p.name.clone(), p.wins))
            .collect();
        table.sort_by(|a, b| b.1.cmp(&a.1));
        table
    }

    /// Number of registered players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no player has registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C1: ConnectionId = ConnectionId(1);
    const C2: ConnectionId = ConnectionId(2);

    #[test]
    fn test_register_new_player() {
        let mut reg = PlayerRegistry::new();
        let player = reg.register("alice", "pw", C1).unwrap();

        assert_eq!(player.name, "alice");
        assert_eq!(player.wins, 0);
        assert_eq!(reg.lookup_by_connection(C1).map(|p| p.id), Some(player.id));
        assert_eq!(reg.connection_of(&player.id), Some(C1));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_wrong_password_rejected() {
        let mut reg = PlayerRegistry::new();
        let alice = reg.register("A", "p1", C1).unwrap();
        reg.record_win(&alice.id).unwrap();

        assert_eq!(reg.register("A", "p2", C1), Err(RegistryError::InvalidCredentials));
        assert_eq!(reg.get(&alice.id).unwrap().wins, 1);
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let mut reg = PlayerRegistry::new();
        assert_eq!(reg.register("", "pw", C1), Err(RegistryError::MissingCredentials));
        assert_eq!(reg.register("bob", "", C1), Err(RegistryError::MissingCredentials));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut reg = PlayerRegistry::new();
        let lower = reg.register("bob", "x", C1).unwrap();
        let upper = reg.register("Bob", "y", C2).unwrap();
        assert_ne!(lower.id, upper.id);
    }

    #[test]
    fn test_reconnect_keeps_identity_and_wins() {
        let mut reg = PlayerRegistry::new();
        let first = reg.register("alice", "pw", C1).unwrap();
        reg.record_win(&first.id).unwrap();

        let again = reg.register("alice", "pw", C2).unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.wins, 1);

        // The old connection no longer resolves.
        assert!(reg.lookup_by_connection(C1).is_none());
        assert_eq!(reg.connection_of(&first.id), Some(C2));
    }

    #[test]
    fn test_connection_switches_player() {
        let mut reg = PlayerRegistry::new();
        let alice = reg.register("alice", "pw", C1).unwrap();
        let bob = reg.register("bob", "pw", C1).unwrap();

        assert_eq!(reg.lookup_by_connection(C1).map(|p| p.id), Some(bob.id));
        assert_eq!(reg.connection_of(&alice.id), None);
    }

    #[test]
    fn test_unbind() {
        let mut reg = PlayerRegistry::new();
        let alice = reg.register("alice", "pw", C1).unwrap();

        assert_eq!(reg.unbind(C1), Some(alice.id));
        assert_eq!(reg.unbind(C1), None);
        assert!(reg.lookup_by_connection(C1).is_none());
        assert!(reg.get(&alice.id).is_some());
    }

    #[test]
    fn test_winners_sorted_with_stable_ties() {
        let mut reg = PlayerRegistry::new();
        let a = reg.register("a", "pw", ConnectionId(1)).unwrap();
        let _b = reg.register("b", "pw", ConnectionId(2)).unwrap();
        let c = reg.register("c", "pw", ConnectionId(3)).unwrap();
        let _d = reg.register("d", "pw", ConnectionId(4)).unwrap();

        reg.record_win(&c.id).unwrap();
        reg.record_win(&c.id).unwrap();
        reg.record_win(&a.id).unwrap();

        assert_eq!(
            reg.winners(),
            vec![
                ("c".to_string(), 2),
                ("a".to_string(), 1),
                ("b".to_string(), 0),
                ("d".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_record_win_unknown_player() {
        let mut reg = PlayerRegistry::new();
        assert_eq!(
            reg.record_win(&PlayerId::new([5; 16])),
            Err(RegistryError::UnknownPlayer)
        );
    }
}
