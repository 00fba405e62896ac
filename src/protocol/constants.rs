//! Constants of the game simulation, shared with clients through the wire protocol.

/// The arena is a fixed logical coordinate space ; clients scale it to their viewport.
pub const GAME_WIDTH: f64 = 800.0;
pub const GAME_HEIGHT: f64 = 600.0;

pub const PADDLE_WIDTH: f64 = 10.0;
pub const PADDLE_HEIGHT: f64 = 100.0;
/// Units per tick given to a paddle while its player holds a direction.
pub const PADDLE_SPEED: f64 = 8.0;

pub const BALL_RADIUS: f64 = 7.0;
pub const INITIAL_BALL_SPEED_X: f64 = 5.0;
/// Vertical serve speed : a constant magnitude served with a random sign. A tunable, not a contract.
pub const INITIAL_BALL_SPEED_Y: f64 = 2.0;
/// Vertical speed of the ball after striking the very tip of a paddle.
pub const MAX_BALL_SPEED_Y_AFTER_PADDLE_HIT: f64 = 7.0;

pub const WINNING_SCORE: u32 = 5;

pub const TICKS_PER_SECOND: u64 = 60;
