//! Implementation of the logic of the Pong game.
//!
//! This mod exposes the geometry primitives [`Ball`] and [`Paddle`], the per-room [`Game`] session aggregating them,
//! and the [`Role`] a seated connection holds. Sessions are owned by the [`crate::registry`] table and driven by the
//! [`crate::hub`] tick loop; nothing in here does any I/O.

pub use ball::Ball;
pub use paddle::{MoveDirection, Paddle, PaddleAction};
pub use role::Role;
pub use session::{BallSnapshot, Game, GameSnapshot, PaddleRect, Score};

mod ball;
mod paddle;
mod role;
mod session;

/// Opaque identifier the accept path assigned to a websocket connection.
pub type ConnectionId = String;
