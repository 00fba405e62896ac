//! The room registry : creation, lookup, membership and destruction of [`Game`] sessions.
//!
//! The [`GameManager`] owns every live session, keyed by room id, plus a reverse index from connection to room id.
//! The reverse index replaces a linear scan of all rooms for membership questions ; behavior is identical, a
//! connection can occupy at most one slot across all rooms at any time.

use std::collections::HashMap;

use rand::Rng;
use uuid::Uuid;

use crate::game::{ConnectionId, Game, Role};

/// Reasons a join request is refused. The [`std::fmt::Display`] strings travel to the client verbatim.
#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum JoinError {
    #[error("Game not found (it may have been cleaned up or never existed).")]
    NotFound,

    #[error("This game has already ended and is no longer available.")]
    AlreadyEnded,

    #[error("Game room is full.")]
    RoomFull,
}

/// Outcome of a successful join.
#[derive(Debug, Eq, PartialEq)]
pub struct JoinSuccess {
    pub game_id: Uuid,
    pub role: Role,
    /// `true` when the connection was already seated in this room and the join is a re-confirmation.
    pub rejoined: bool,
}

/// What the caller needs to notify the remaining player after a disconnection.
///
/// The registry does not remove an emptied room here ; that is the caller's decision, made when
/// `new_player_count` reaches zero.
#[derive(Debug, Eq, PartialEq)]
pub struct DisconnectInfo {
    pub game_id: Uuid,
    pub vacated_role: Role,
    pub remaining_connection: Option<ConnectionId>,
    pub new_player_count: u8,
}

/// The table of all live sessions.
pub struct GameManager {
    games: HashMap<Uuid, Game>,
    memberships: HashMap<ConnectionId, Uuid>,
}

impl GameManager {
    pub fn new() -> GameManager {
        GameManager {
            games: HashMap::new(),
            memberships: HashMap::new(),
        }
    }

    /// Create an empty session and return its freshly drawn room id.
    ///
    /// Ids are drawn until a non-colliding one is found. A v4 collision is negligibly likely ; the loop is a
    /// guard, not a collision strategy.
    pub fn create_game<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Uuid {
        let mut game_id = Uuid::new_v4();
        while self.games.contains_key(&game_id) {
            game_id = Uuid::new_v4();
        }
        self.games.insert(game_id, Game::new(rng));
        log::info!(
            "New game created with id {game_id}. {} active game(s).",
            self.games.len()
        );
        game_id
    }

    /// Direct lookup of a session by room id.
    pub fn get_game(&self, game_id: &Uuid) -> Option<&Game> {
        self.games.get(game_id)
    }

    /// The session the given connection is seated in, if any.
    pub fn game_of_mut(&mut self, connection: &str) -> Option<&mut Game> {
        let game_id = self.memberships.get(connection)?;
        self.games.get_mut(game_id)
    }

    /// Iterate over every live session. Iteration order is unspecified but stable within a run.
    pub fn games_mut(&mut self) -> impl Iterator<Item = (&Uuid, &mut Game)> {
        self.games.iter_mut()
    }

    /// Seat the connection in the target room.
    ///
    /// Before anything touches the target, the connection is evicted from any other room it occupies, deleting
    /// that room if the eviction empties it. Then : an absent target refuses with [`JoinError::NotFound`] ; an
    /// ended one is lazily deleted and refuses with [`JoinError::AlreadyEnded`] ; a connection already seated in
    /// the target re-joins idempotently ; a full room refuses with [`JoinError::RoomFull`]. A seating that fills
    /// the second slot of a live room triggers the initial serve toward a random side.
    pub fn join_game<R: Rng + ?Sized>(
        &mut self,
        target: Uuid,
        connection: &str,
        rng: &mut R,
    ) -> Result<JoinSuccess, JoinError> {
        self.evict_from_other_room(target, connection);

        if self.games.get(&target).is_some_and(Game::is_over) {
            log::info!("Refusing a join into the already ended game {target}. Removing it.");
            self.remove_game(&target);
            return Err(JoinError::AlreadyEnded);
        }
        let Some(game) = self.games.get_mut(&target) else {
            return Err(JoinError::NotFound);
        };
        if let Some(role) = game.role_of(connection) {
            return Ok(JoinSuccess {
                game_id: target,
                role,
                rejoined: true,
            });
        }
        let Some(role) = game.seat(connection.to_owned()) else {
            return Err(JoinError::RoomFull);
        };
        self.memberships.insert(connection.to_owned(), target);
        log::info!(
            "Connection {connection} joined game {target} as {role:?}. Player count : {}.",
            game.player_count()
        );
        if game.player_count() == 2 && !game.is_over() {
            game.reset_ball_and_serve(rng.gen(), rng);
        }
        Ok(JoinSuccess {
            game_id: target,
            role,
            rejoined: false,
        })
    }

    /// Clear the connection's slot in whatever room it occupies, telling the caller which role was vacated, who
    /// is left, and the room's new player count. Returns [`None`] if the connection held no slot.
    pub fn handle_player_disconnect(&mut self, connection: &str) -> Option<DisconnectInfo> {
        let game_id = self.memberships.remove(connection)?;
        let game = self.games.get_mut(&game_id)?;
        let vacated_role = game.role_of(connection)?;
        game.vacate(vacated_role);
        log::info!("{vacated_role:?} (connection {connection}) disconnected from game {game_id}.");
        Some(DisconnectInfo {
            game_id,
            vacated_role,
            remaining_connection: game.occupant(!vacated_role).map(str::to_owned),
            new_player_count: game.player_count(),
        })
    }

    /// Delete the session by room id, clearing the reverse index of its occupants. Returns whether a deletion
    /// occurred. Notifying the remaining members is the caller's job.
    pub fn remove_game(&mut self, game_id: &Uuid) -> bool {
        match self.games.remove(game_id) {
            Some(game) => {
                for member in game.members() {
                    self.memberships.remove(member);
                }
                log::info!(
                    "Game removed : {game_id}. {} active game(s).",
                    self.games.len()
                );
                true
            }
            None => false,
        }
    }

    /// Pull the connection out of any room other than the target, deleting that room if now empty. Runs before
    /// any logic touching the target room.
    fn evict_from_other_room(&mut self, target: Uuid, connection: &str) {
        let Some(&other_id) = self.memberships.get(connection) else {
            return;
        };
        if other_id == target {
            return;
        }
        let emptied = match self.games.get_mut(&other_id) {
            Some(other) => {
                if let Some(role) = other.role_of(connection) {
                    other.vacate(role);
                    log::info!(
                        "Connection {connection} was {role:?} in game {other_id}. \
                        Removed before joining {target}."
                    );
                }
                other.player_count() == 0
            }
            None => false,
        };
        self.memberships.remove(connection);
        if emptied {
            self.remove_game(&other_id);
        }
    }
}

impl Default for GameManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::ThreadRng;

    use super::*;

    /// Player count equals slot occupancy in every room, and the reverse index mirrors the slots exactly.
    fn assert_membership_invariant(manager: &GameManager) {
        let mut seated = 0;
        for (game_id, game) in &manager.games {
            let members: Vec<_> = game.members().collect();
            assert_eq!(game.player_count() as usize, members.len());
            for member in members {
                assert_eq!(manager.memberships.get(member), Some(game_id));
                seated += 1;
            }
        }
        assert_eq!(manager.memberships.len(), seated);
    }

    fn manager_with_game(rng: &mut ThreadRng) -> (GameManager, Uuid) {
        let mut manager = GameManager::new();
        let game_id = manager.create_game(rng);
        (manager, game_id)
    }

    #[test]
    fn create_join_disconnect_lifecycle() {
        let mut thread_rng = rand::thread_rng();
        let (mut manager, game_id) = manager_with_game(&mut thread_rng);

        let a = manager.join_game(game_id, "conn-a", &mut thread_rng).unwrap();
        assert_eq!(a.role, Role::PlayerOne);
        assert!(!a.rejoined);
        assert_eq!(manager.get_game(&game_id).unwrap().player_count(), 1);
        assert_membership_invariant(&manager);

        let b = manager.join_game(game_id, "conn-b", &mut thread_rng).unwrap();
        assert_eq!(b.role, Role::PlayerTwo);
        assert_eq!(manager.get_game(&game_id).unwrap().player_count(), 2);
        assert_membership_invariant(&manager);
        // Filling the second slot triggered the initial serve.
        let game = manager.get_game(&game_id).unwrap();
        assert_ne!(game.ball.velocity_x, 0.0);
        assert_ne!(game.ball.velocity_y, 0.0);

        let info = manager.handle_player_disconnect("conn-a").unwrap();
        assert_eq!(info.vacated_role, Role::PlayerOne);
        assert_eq!(info.remaining_connection, Some(String::from("conn-b")));
        assert_eq!(info.new_player_count, 1);
        // One player left : the room stays.
        assert!(manager.get_game(&game_id).is_some());
        assert_membership_invariant(&manager);

        let info = manager.handle_player_disconnect("conn-b").unwrap();
        assert_eq!(info.new_player_count, 0);
        // The caller removes an emptied room.
        assert!(manager.remove_game(&game_id));
        assert!(manager.get_game(&game_id).is_none());
        assert_membership_invariant(&manager);
    }

    #[test]
    fn joining_an_unknown_room_is_refused() {
        let mut thread_rng = rand::thread_rng();
        let mut manager = GameManager::new();
        let error = manager
            .join_game(Uuid::new_v4(), "conn-a", &mut thread_rng)
            .unwrap_err();
        assert_eq!(error, JoinError::NotFound);
        assert!(error.to_string().contains("not found"));
    }

    #[test]
    fn a_third_join_into_a_full_room_is_refused() {
        let mut thread_rng = rand::thread_rng();
        let (mut manager, game_id) = manager_with_game(&mut thread_rng);
        manager.join_game(game_id, "conn-a", &mut thread_rng).unwrap();
        manager.join_game(game_id, "conn-b", &mut thread_rng).unwrap();
        let error = manager
            .join_game(game_id, "conn-c", &mut thread_rng)
            .unwrap_err();
        assert_eq!(error, JoinError::RoomFull);
        assert!(error.to_string().contains("full"));
        assert_membership_invariant(&manager);
    }

    #[test]
    fn joining_an_ended_room_lazily_removes_it() {
        let mut thread_rng = rand::thread_rng();
        let (mut manager, game_id) = manager_with_game(&mut thread_rng);
        let game = manager.games.get_mut(&game_id).unwrap();
        while !game.is_over() {
            game.ball.reset(-20.0, 300.0, -5.0, 0.0);
            game.update_ball(&mut thread_rng);
        }
        let error = manager
            .join_game(game_id, "conn-a", &mut thread_rng)
            .unwrap_err();
        assert_eq!(error, JoinError::AlreadyEnded);
        assert!(error.to_string().contains("already ended"));
        assert!(manager.get_game(&game_id).is_none());
    }

    #[test]
    fn rejoining_the_same_room_is_idempotent() {
        let mut thread_rng = rand::thread_rng();
        let (mut manager, game_id) = manager_with_game(&mut thread_rng);
        let first = manager.join_game(game_id, "conn-a", &mut thread_rng).unwrap();
        let again = manager.join_game(game_id, "conn-a", &mut thread_rng).unwrap();
        assert_eq!(again.role, first.role);
        assert!(again.rejoined);
        assert_eq!(manager.get_game(&game_id).unwrap().player_count(), 1);
        assert_membership_invariant(&manager);
    }

    #[test]
    fn joining_elsewhere_evicts_and_removes_an_emptied_room() {
        let mut thread_rng = rand::thread_rng();
        let (mut manager, first_id) = manager_with_game(&mut thread_rng);
        let second_id = manager.create_game(&mut thread_rng);
        manager.join_game(first_id, "conn-a", &mut thread_rng).unwrap();

        let moved = manager.join_game(second_id, "conn-a", &mut thread_rng).unwrap();
        assert_eq!(moved.role, Role::PlayerOne);
        // The eviction emptied the first room, which is gone.
        assert!(manager.get_game(&first_id).is_none());
        assert_membership_invariant(&manager);
    }

    #[test]
    fn joining_elsewhere_keeps_a_still_occupied_room() {
        let mut thread_rng = rand::thread_rng();
        let (mut manager, first_id) = manager_with_game(&mut thread_rng);
        let second_id = manager.create_game(&mut thread_rng);
        manager.join_game(first_id, "conn-a", &mut thread_rng).unwrap();
        manager.join_game(first_id, "conn-b", &mut thread_rng).unwrap();

        manager.join_game(second_id, "conn-a", &mut thread_rng).unwrap();
        let first = manager.get_game(&first_id).unwrap();
        assert_eq!(first.player_count(), 1);
        assert_eq!(first.role_of("conn-b"), Some(Role::PlayerTwo));
        assert_eq!(first.role_of("conn-a"), None);
        assert_membership_invariant(&manager);
    }

    #[test]
    fn disconnect_of_an_unseated_connection_is_a_no_op() {
        let mut thread_rng = rand::thread_rng();
        let (mut manager, _) = manager_with_game(&mut thread_rng);
        assert_eq!(manager.handle_player_disconnect("nobody"), None);
        assert_membership_invariant(&manager);
    }
}
