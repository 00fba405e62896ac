//! The single authoritative simulation task.
//!
//! Every connection task talks to the hub through one [`Command`] channel, and the hub talks back through the
//! per-connection [`ServerEvent`] channel registered at connection time. All game state lives here, on one task :
//! commands and ticks interleave through a [`tokio::select!`], so no mutation ever races another.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::game::{ConnectionId, MoveDirection, PaddleAction, Role};
use crate::protocol::constants::{PADDLE_SPEED, TICKS_PER_SECOND};
use crate::protocol::{
    GameCreatedMessage, GameOverMessage, GameStateMessage, JoinAcceptedMessage, JoinRefusedMessage,
    PlayerLeftMessage, ServerEvent,
};
use crate::registry::GameManager;

/// Everything a connection task can ask of the hub.
#[derive(Debug)]
pub enum Command {
    /// Hand the hub the sending half of the connection's event channel. Must come before any other command of
    /// the same connection.
    Register {
        connection: ConnectionId,
        outbound: mpsc::UnboundedSender<ServerEvent>,
    },
    CreateGame {
        connection: ConnectionId,
    },
    JoinGame {
        connection: ConnectionId,
        game_id: String,
    },
    PaddleMove {
        connection: ConnectionId,
        role: Role,
        action: PaddleAction,
    },
    Disconnect {
        connection: ConnectionId,
    },
}

/// The simulation task's state : the room registry and the outbound channel of every live connection.
pub struct Hub {
    manager: GameManager,
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
}

impl Hub {
    pub fn new() -> Hub {
        Hub {
            manager: GameManager::new(),
            connections: HashMap::new(),
        }
    }

    /// Interleave simulation ticks and connection commands until every command sender is gone.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut ticker =
            tokio::time::interval(Duration::from_micros(1_000_000 / TICKS_PER_SECOND));
        log::info!("Hub running at {TICKS_PER_SECOND} ticks per second.");
        loop {
            // thread_rng handles are not held across awaits, keeping this future spawnable.
            tokio::select! {
                _ = ticker.tick() => self.run_tick(&mut rand::thread_rng()),
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command, &mut rand::thread_rng());
                }
            }
        }
        log::info!("All command senders are gone. Hub stopping.");
    }

    fn handle_command<R: Rng + ?Sized>(&mut self, command: Command, rng: &mut R) {
        match command {
            Command::Register {
                connection,
                outbound,
            } => {
                log::trace!("{connection}: Registered with the hub.");
                self.connections.insert(connection, outbound);
            }
            Command::CreateGame { connection } => {
                let game_id = self.manager.create_game(rng);
                self.send_to(
                    &connection,
                    ServerEvent::GameCreated(GameCreatedMessage::new(game_id)),
                );
            }
            Command::JoinGame {
                connection,
                game_id,
            } => self.handle_join(&connection, &game_id, rng),
            Command::PaddleMove {
                connection,
                role,
                action,
            } => self.handle_paddle_move(&connection, role, action),
            Command::Disconnect { connection } => self.handle_disconnect(&connection),
        }
    }

    /// Seat the connection in the requested room, answering with an acceptance carrying the assigned role or a
    /// refusal carrying the reason. A malformed room id is refused like an unknown one, not treated as a
    /// protocol violation : ids travel as opaque text and a typo is a user error. Every member of the room gets
    /// a fresh state snapshot after a successful join, so the joiner renders without waiting for the next tick.
    fn handle_join<R: Rng + ?Sized>(&mut self, connection: &str, game_id: &str, rng: &mut R) {
        let Ok(target) = Uuid::parse_str(game_id) else {
            log::info!("{connection}: Join refused, `{game_id}` is not a valid game id.");
            self.send_to(
                connection,
                ServerEvent::JoinRefused(JoinRefusedMessage::new("Invalid game id.")),
            );
            return;
        };
        match self.manager.join_game(target, connection, rng) {
            Ok(success) => {
                if success.rejoined {
                    log::info!("{connection}: Re-joined game {target} as {:?}.", success.role);
                }
                self.send_to(
                    connection,
                    ServerEvent::JoinAccepted(JoinAcceptedMessage::new(
                        success.game_id,
                        success.role,
                    )),
                );
                if let Some(game) = self.manager.get_game(&success.game_id) {
                    let state = ServerEvent::GameState(GameStateMessage::new(&game.snapshot()));
                    send_to_members(&self.connections, game.members(), &state);
                }
            }
            Err(e) => {
                log::info!("{connection}: Join of game {target} refused : {e}");
                self.send_to(
                    connection,
                    ServerEvent::JoinRefused(JoinRefusedMessage::new(&e.to_string())),
                );
            }
        }
    }

    /// Apply a paddle command to the issuer's room. A claimed role that does not match the seat actually held
    /// is dropped, as is any input into a finished game ; neither warrants tearing the connection down.
    fn handle_paddle_move(&mut self, connection: &str, role: Role, action: PaddleAction) {
        let Some(game) = self.manager.game_of_mut(connection) else {
            log::warn!("{connection}: Paddle move from a connection seated in no game. Ignoring.");
            return;
        };
        if game.role_of(connection) != Some(role) {
            log::warn!("{connection}: Paddle move claiming {role:?}, a seat it does not hold. Ignoring.");
            return;
        }
        if game.is_over() {
            return;
        }
        let paddle = match role {
            Role::PlayerOne => &mut game.paddle1,
            Role::PlayerTwo => &mut game.paddle2,
        };
        match action {
            PaddleAction::Start(direction) => match direction {
                MoveDirection::Up => paddle.move_up(PADDLE_SPEED),
                MoveDirection::Down => paddle.move_down(PADDLE_SPEED),
            },
            PaddleAction::Stop => paddle.stop(),
        }
    }

    /// Drop the connection's channel and vacate its seat. The remaining player, if any, learns of it through a
    /// state snapshot followed by a departure notice ; an emptied room is deleted afterward.
    fn handle_disconnect(&mut self, connection: &str) {
        self.connections.remove(connection);
        let Some(info) = self.manager.handle_player_disconnect(connection) else {
            return;
        };
        if let Some(game) = self.manager.get_game(&info.game_id) {
            if let Some(remaining) = &info.remaining_connection {
                let state = ServerEvent::GameState(GameStateMessage::new(&game.snapshot()));
                send_to_members(&self.connections, std::iter::once(remaining.as_str()), &state);
                let left = ServerEvent::PlayerLeft(PlayerLeftMessage::new(
                    info.vacated_role,
                    info.new_player_count,
                ));
                send_to_members(&self.connections, std::iter::once(remaining.as_str()), &left);
            }
        }
        if info.new_player_count == 0 {
            self.manager.remove_game(&info.game_id);
        }
    }

    /// Advance every room one tick and broadcast the resulting snapshots.
    ///
    /// A room only simulates while both seats are taken and the game is not over ; its members still receive a
    /// snapshot every tick either way. The game-over notice goes out exactly once, on the tick that ends the
    /// game.
    fn run_tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for (_, game) in self.manager.games_mut() {
            let was_over = game.is_over();
            if !was_over && game.player_count() == 2 {
                game.update_paddles();
                game.update_ball(rng);
            }
            let snapshot = game.snapshot();
            let state = ServerEvent::GameState(GameStateMessage::new(&snapshot));
            send_to_members(&self.connections, game.members(), &state);
            if !was_over && game.is_over() {
                let over = ServerEvent::GameOver(GameOverMessage::new(&snapshot));
                send_to_members(&self.connections, game.members(), &over);
            }
        }
    }

    fn send_to(&self, connection: &str, event: ServerEvent) {
        send_to_members(&self.connections, std::iter::once(connection), &event);
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// Clone the event to each member's channel. A closed channel means the connection task is already winding
/// down and its disconnect command is in flight ; the member is simply skipped.
fn send_to_members<'a>(
    connections: &HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    members: impl Iterator<Item = &'a str>,
    event: &ServerEvent,
) {
    for member in members {
        match connections.get(member) {
            Some(outbound) => {
                if outbound.send(event.clone()).is_err() {
                    log::debug!("{member}: Event channel closed. Skipping.");
                }
            }
            None => log::debug!("{member}: No event channel registered. Skipping."),
        }
    }
}

#[cfg(test)]
mod tests {
    use ciborium::Value;

    use super::*;

    fn register(hub: &mut Hub, connection: &str) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        hub.handle_command(
            Command::Register {
                connection: String::from(connection),
                outbound: tx,
            },
            &mut rand::thread_rng(),
        );
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Pull the room id out of a [`GameCreatedMessage`] through its wire form.
    fn created_game_id(event: ServerEvent) -> String {
        let fields: Vec<Value> = ciborium::from_reader(Vec::from(event).as_slice()).unwrap();
        assert_eq!(fields[0], Value::from(0u8));
        fields[1].as_text().unwrap().to_owned()
    }

    fn hub_with_running_game() -> (
        Hub,
        String,
        mpsc::UnboundedReceiver<ServerEvent>,
        mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        let mut thread_rng = rand::thread_rng();
        let mut hub = Hub::new();
        let mut rx_a = register(&mut hub, "conn-a");
        let rx_b = register(&mut hub, "conn-b");
        hub.handle_command(
            Command::CreateGame {
                connection: String::from("conn-a"),
            },
            &mut thread_rng,
        );
        let game_id = created_game_id(rx_a.try_recv().unwrap());
        for connection in ["conn-a", "conn-b"] {
            hub.handle_command(
                Command::JoinGame {
                    connection: String::from(connection),
                    game_id: game_id.clone(),
                },
                &mut thread_rng,
            );
        }
        (hub, game_id, rx_a, rx_b)
    }

    #[test]
    fn create_join_and_state_flow() {
        let (_, _, mut rx_a, mut rx_b) = hub_with_running_game();

        // Player 1 : its own acceptance and snapshot, then the snapshot re-broadcast by player 2's join.
        let events = drain(&mut rx_a);
        assert!(matches!(events[0], ServerEvent::JoinAccepted(_)));
        assert!(matches!(events[1], ServerEvent::GameState(_)));
        assert!(matches!(events[2], ServerEvent::GameState(_)));
        assert_eq!(events.len(), 3);

        // Player 2 : acceptance and one snapshot.
        let events = drain(&mut rx_b);
        assert!(matches!(events[0], ServerEvent::JoinAccepted(_)));
        assert!(matches!(events[1], ServerEvent::GameState(_)));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn a_malformed_game_id_is_refused() {
        let mut thread_rng = rand::thread_rng();
        let mut hub = Hub::new();
        let mut rx_a = register(&mut hub, "conn-a");
        hub.handle_command(
            Command::JoinGame {
                connection: String::from("conn-a"),
                game_id: String::from("definitely-not-a-uuid"),
            },
            &mut thread_rng,
        );
        let events = drain(&mut rx_a);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ServerEvent::JoinRefused(_)));
    }

    #[test]
    fn paddle_moves_are_checked_against_the_held_seat() {
        let mut thread_rng = rand::thread_rng();
        let (mut hub, _, _rx_a, _rx_b) = hub_with_running_game();

        // Claiming the opponent's seat does nothing.
        hub.handle_command(
            Command::PaddleMove {
                connection: String::from("conn-a"),
                role: Role::PlayerTwo,
                action: PaddleAction::Start(MoveDirection::Up),
            },
            &mut thread_rng,
        );
        let game = hub.manager.game_of_mut("conn-a").unwrap();
        assert_eq!(game.paddle1.dy, 0.0);
        assert_eq!(game.paddle2.dy, 0.0);

        // The held seat moves its own paddle.
        hub.handle_command(
            Command::PaddleMove {
                connection: String::from("conn-a"),
                role: Role::PlayerOne,
                action: PaddleAction::Start(MoveDirection::Up),
            },
            &mut thread_rng,
        );
        let game = hub.manager.game_of_mut("conn-a").unwrap();
        assert_eq!(game.paddle1.dy, -PADDLE_SPEED);
        assert_eq!(game.paddle2.dy, 0.0);

        hub.handle_command(
            Command::PaddleMove {
                connection: String::from("conn-a"),
                role: Role::PlayerOne,
                action: PaddleAction::Stop,
            },
            &mut thread_rng,
        );
        assert_eq!(hub.manager.game_of_mut("conn-a").unwrap().paddle1.dy, 0.0);
    }

    #[test]
    fn ticks_broadcast_snapshots_and_report_game_over_once() {
        let mut thread_rng = rand::thread_rng();
        let (mut hub, _, mut rx_a, mut rx_b) = hub_with_running_game();
        drain(&mut rx_a);
        drain(&mut rx_b);

        // Run the ball past the left edge once per point until the game ends.
        for _ in 0..crate::protocol::constants::WINNING_SCORE {
            let game = hub.manager.game_of_mut("conn-a").unwrap();
            game.ball.reset(-20.0, 300.0, -5.0, 0.0);
            hub.run_tick(&mut thread_rng);
        }
        assert!(hub.manager.game_of_mut("conn-a").unwrap().is_over());

        // Two extra ticks on the finished game : snapshots keep flowing, the game-over notice does not repeat.
        hub.run_tick(&mut thread_rng);
        hub.run_tick(&mut thread_rng);

        for rx in [&mut rx_a, &mut rx_b] {
            let events = drain(rx);
            let game_overs = events
                .iter()
                .filter(|e| matches!(e, ServerEvent::GameOver(_)))
                .count();
            let states = events
                .iter()
                .filter(|e| matches!(e, ServerEvent::GameState(_)))
                .count();
            assert_eq!(game_overs, 1);
            assert_eq!(states as u32, crate::protocol::constants::WINNING_SCORE + 2);
        }
    }

    #[test]
    fn disconnects_notify_the_remaining_player_and_reap_empty_rooms() {
        let mut thread_rng = rand::thread_rng();
        let (mut hub, game_id, _rx_a, mut rx_b) = hub_with_running_game();
        drain(&mut rx_b);

        hub.handle_command(
            Command::Disconnect {
                connection: String::from("conn-a"),
            },
            &mut thread_rng,
        );
        let events = drain(&mut rx_b);
        assert!(matches!(events[0], ServerEvent::GameState(_)));
        assert!(matches!(events[1], ServerEvent::PlayerLeft(_)));
        assert_eq!(events.len(), 2);
        assert!(!hub.connections.contains_key("conn-a"));

        // The last player leaving empties the room, which is deleted.
        hub.handle_command(
            Command::Disconnect {
                connection: String::from("conn-b"),
            },
            &mut thread_rng,
        );
        let target = Uuid::parse_str(&game_id).unwrap();
        assert!(hub.manager.get_game(&target).is_none());
    }
}
