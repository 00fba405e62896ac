//! Serializable server-to-client messages.
//!
//! Every message encodes to a CBOR array whose first element is the message id, following the wire protocol.

use uuid::Uuid;

use crate::game::{GameSnapshot, Role};

/// Wire encoding of a winner slot : 0 for no winner, otherwise the role's wire value.
fn winner_to_u8(winner: Option<Role>) -> u8 {
    winner.map(u8::from).unwrap_or(0)
}

/// Enum wrapping the various server-to-client messages.
#[derive(Clone, Debug)]
pub enum ServerEvent {
    GameCreated(GameCreatedMessage),
    JoinAccepted(JoinAcceptedMessage),
    JoinRefused(JoinRefusedMessage),
    GameState(GameStateMessage),
    PlayerLeft(PlayerLeftMessage),
    GameOver(GameOverMessage),
}

impl From<ServerEvent> for Vec<u8> {
    fn from(value: ServerEvent) -> Self {
        match value {
            ServerEvent::GameCreated(msg) => msg.into(),
            ServerEvent::JoinAccepted(msg) => msg.into(),
            ServerEvent::JoinRefused(msg) => msg.into(),
            ServerEvent::GameState(msg) => msg.into(),
            ServerEvent::PlayerLeft(msg) => msg.into(),
            ServerEvent::GameOver(msg) => msg.into(),
        }
    }
}

/// Structure representing the Game Created Message : the freshly drawn room id, ready to be shared.
#[derive(Clone, Debug)]
pub struct GameCreatedMessage {
    msg_id: u8,
    game_id: String,
}

impl GameCreatedMessage {
    pub fn new(game_id: Uuid) -> GameCreatedMessage {
        GameCreatedMessage {
            msg_id: 0,
            game_id: game_id.to_string(),
        }
    }
}

impl From<GameCreatedMessage> for Vec<u8> {
    fn from(value: GameCreatedMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(&(value.msg_id, value.game_id), &mut bytes)
            .expect("Could not serialize a GameCreatedMessage instance.");
        bytes
    }
}

/// Structure representing the Join Accepted Message : the joined room and the assigned role.
#[derive(Clone, Debug)]
pub struct JoinAcceptedMessage {
    msg_id: u8,
    game_id: String,
    role: u8,
}

impl JoinAcceptedMessage {
    pub fn new(game_id: Uuid, role: Role) -> JoinAcceptedMessage {
        JoinAcceptedMessage {
            msg_id: 1,
            game_id: game_id.to_string(),
            role: role.into(),
        }
    }
}

impl From<JoinAcceptedMessage> for Vec<u8> {
    fn from(value: JoinAcceptedMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(&(value.msg_id, value.game_id, value.role), &mut bytes)
            .expect("Could not serialize a JoinAcceptedMessage instance.");
        bytes
    }
}

/// Structure representing the Join Refused Message : a human-readable reason for the refusal.
#[derive(Clone, Debug)]
pub struct JoinRefusedMessage {
    msg_id: u8,
    message: String,
}

impl JoinRefusedMessage {
    pub fn new(message: &str) -> JoinRefusedMessage {
        JoinRefusedMessage {
            msg_id: 2,
            message: String::from(message),
        }
    }
}

impl From<JoinRefusedMessage> for Vec<u8> {
    fn from(value: JoinRefusedMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(&(value.msg_id, value.message), &mut bytes)
            .expect("Could not serialize a JoinRefusedMessage instance.");
        bytes
    }
}

/// Structure representing the Game State Message : the full per-tick snapshot of a room.
#[derive(Copy, Clone, Debug)]
pub struct GameStateMessage {
    msg_id: u8,
    snapshot: GameSnapshot,
}

impl GameStateMessage {
    pub fn new(snapshot: &GameSnapshot) -> GameStateMessage {
        GameStateMessage {
            msg_id: 3,
            snapshot: *snapshot,
        }
    }
}

impl From<GameStateMessage> for Vec<u8> {
    fn from(value: GameStateMessage) -> Self {
        let s = value.snapshot;
        let mut bytes = Vec::new();
        ciborium::into_writer(
            &(
                value.msg_id,
                (s.paddle1.x, s.paddle1.y, s.paddle1.width, s.paddle1.height),
                (s.paddle2.x, s.paddle2.y, s.paddle2.width, s.paddle2.height),
                (s.ball.x, s.ball.y, s.ball.radius),
                (s.score.player1, s.score.player2),
                (s.arena_width, s.arena_height),
                s.game_over,
                winner_to_u8(s.winner),
                s.player_count,
            ),
            &mut bytes,
        )
        .expect("Could not serialize a GameStateMessage instance.");
        bytes
    }
}

/// Structure representing the Player Left Message : which role vacated and how many players remain.
#[derive(Copy, Clone, Debug)]
pub struct PlayerLeftMessage {
    msg_id: u8,
    role: u8,
    new_player_count: u8,
}

impl PlayerLeftMessage {
    pub fn new(role: Role, new_player_count: u8) -> PlayerLeftMessage {
        PlayerLeftMessage {
            msg_id: 4,
            role: role.into(),
            new_player_count,
        }
    }
}

impl From<PlayerLeftMessage> for Vec<u8> {
    fn from(value: PlayerLeftMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(
            &(value.msg_id, value.role, value.new_player_count),
            &mut bytes,
        )
        .expect("Could not serialize a PlayerLeftMessage instance.");
        bytes
    }
}

/// Structure representing the Game Over Message : the winner and the final score.
#[derive(Copy, Clone, Debug)]
pub struct GameOverMessage {
    msg_id: u8,
    winner: u8,
    player1_score: u32,
    player2_score: u32,
}

impl GameOverMessage {
    pub fn new(snapshot: &GameSnapshot) -> GameOverMessage {
        GameOverMessage {
            msg_id: 5,
            winner: winner_to_u8(snapshot.winner),
            player1_score: snapshot.score.player1,
            player2_score: snapshot.score.player2,
        }
    }
}

impl From<GameOverMessage> for Vec<u8> {
    fn from(value: GameOverMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(
            &(
                value.msg_id,
                value.winner,
                value.player1_score,
                value.player2_score,
            ),
            &mut bytes,
        )
        .expect("Could not serialize a GameOverMessage instance.");
        bytes
    }
}

#[cfg(test)]
mod tests {
    use ciborium::Value;

    use crate::game::{BallSnapshot, PaddleRect, Score};

    use super::*;

    fn decode(bytes: Vec<u8>) -> Vec<Value> {
        ciborium::from_reader(bytes.as_slice()).unwrap()
    }

    fn some_snapshot() -> GameSnapshot {
        GameSnapshot {
            paddle1: PaddleRect {
                x: 10.0,
                y: 250.0,
                width: 10.0,
                height: 100.0,
            },
            paddle2: PaddleRect {
                x: 780.0,
                y: 250.0,
                width: 10.0,
                height: 100.0,
            },
            ball: BallSnapshot {
                x: 400.0,
                y: 300.0,
                radius: 7.0,
            },
            score: Score {
                player1: 3,
                player2: 5,
            },
            arena_width: 800.0,
            arena_height: 600.0,
            game_over: true,
            winner: Some(Role::PlayerTwo),
            player_count: 2,
        }
    }

    #[test]
    fn winner_slot_encoding() {
        assert_eq!(winner_to_u8(None), 0u8);
        assert_eq!(winner_to_u8(Some(Role::PlayerOne)), 1u8);
        assert_eq!(winner_to_u8(Some(Role::PlayerTwo)), 2u8);
    }

    #[test]
    fn game_created_message_layout() {
        let game_id = Uuid::new_v4();
        let fields = decode(GameCreatedMessage::new(game_id).into());
        assert_eq!(fields[0], Value::from(0u8));
        assert_eq!(fields[1], Value::from(game_id.to_string()));
    }

    #[test]
    fn game_state_message_layout() {
        let fields = decode(GameStateMessage::new(&some_snapshot()).into());
        assert_eq!(fields.len(), 9);
        assert_eq!(fields[0], Value::from(3u8));
        // Ball group : position then radius.
        assert_eq!(
            fields[3],
            Value::Array(vec![
                Value::from(400.0),
                Value::from(300.0),
                Value::from(7.0)
            ])
        );
        // Score group.
        assert_eq!(
            fields[4],
            Value::Array(vec![Value::from(3u32), Value::from(5u32)])
        );
        assert_eq!(fields[6], Value::Bool(true));
        assert_eq!(fields[7], Value::from(2u8));
        assert_eq!(fields[8], Value::from(2u8));
    }

    #[test]
    fn game_over_message_layout() {
        let fields = decode(GameOverMessage::new(&some_snapshot()).into());
        assert_eq!(fields[0], Value::from(5u8));
        assert_eq!(fields[1], Value::from(2u8));
        assert_eq!(fields[2], Value::from(3u32));
        assert_eq!(fields[3], Value::from(5u32));
    }
}
