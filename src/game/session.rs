//! Encapsulation of one room's match : paddles, ball, score, seats, and the physics/scoring step.

use rand::Rng;

use crate::game::{Ball, ConnectionId, Paddle, Role};
use crate::protocol::constants::{
    BALL_RADIUS, GAME_HEIGHT, GAME_WIDTH, INITIAL_BALL_SPEED_X, INITIAL_BALL_SPEED_Y,
    MAX_BALL_SPEED_Y_AFTER_PADDLE_HIT, PADDLE_HEIGHT, PADDLE_WIDTH, WINNING_SCORE,
};

/// Points scored by each player slot. Monotonically increasing until the game is over.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Score {
    pub player1: u32,
    pub player2: u32,
}

/// One room's match. Owns its elements exclusively ; the ball only ever moves inside [`Game::update_ball`], driven
/// by the [`crate::hub`] tick loop, while seats and paddle velocities are mutated by connection events in between.
#[derive(Debug)]
pub struct Game {
    pub(crate) paddle1: Paddle,
    pub(crate) paddle2: Paddle,
    pub(crate) ball: Ball,
    score: Score,
    game_over: bool,
    winner: Option<Role>,
    player1_connection: Option<ConnectionId>,
    player2_connection: Option<ConnectionId>,
    player_count: u8,
}

impl Game {
    /// Create a new [`Game`] with both paddles vertically centered, each sitting one paddle-width away from its
    /// wall, an empty score, no seated players, and the ball already served toward a random side.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Game {
        let paddle_y = (GAME_HEIGHT - PADDLE_HEIGHT) / 2.0;
        let mut game = Game {
            paddle1: Paddle::new(PADDLE_WIDTH, paddle_y, PADDLE_WIDTH, PADDLE_HEIGHT),
            paddle2: Paddle::new(
                GAME_WIDTH - 2.0 * PADDLE_WIDTH,
                paddle_y,
                PADDLE_WIDTH,
                PADDLE_HEIGHT,
            ),
            ball: Ball::new(GAME_WIDTH / 2.0, GAME_HEIGHT / 2.0, BALL_RADIUS, 0.0, 0.0),
            score: Score::default(),
            game_over: false,
            winner: None,
            player1_connection: None,
            player2_connection: None,
            player_count: 0,
        };
        game.reset_ball_and_serve(rng.gen(), rng);
        game
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    pub fn player_count(&self) -> u8 {
        self.player_count
    }

    /// The role held by the given connection in this room, if any.
    pub fn role_of(&self, connection: &str) -> Option<Role> {
        if self.player1_connection.as_deref() == Some(connection) {
            Some(Role::PlayerOne)
        } else if self.player2_connection.as_deref() == Some(connection) {
            Some(Role::PlayerTwo)
        } else {
            None
        }
    }

    /// The connection seated in the given slot, if any.
    pub fn occupant(&self, role: Role) -> Option<&str> {
        match role {
            Role::PlayerOne => self.player1_connection.as_deref(),
            Role::PlayerTwo => self.player2_connection.as_deref(),
        }
    }

    /// All seated connections, player 1 first.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.player1_connection
            .as_deref()
            .into_iter()
            .chain(self.player2_connection.as_deref())
    }

    /// Seat the connection into the first empty slot, player 1 preferred. Returns the assigned role, or [`None`] if
    /// both slots are taken. Keeps the player count in sync with slot occupancy.
    pub fn seat(&mut self, connection: ConnectionId) -> Option<Role> {
        if self.player1_connection.is_none() {
            self.player1_connection = Some(connection);
            self.player_count += 1;
            Some(Role::PlayerOne)
        } else if self.player2_connection.is_none() {
            self.player2_connection = Some(connection);
            self.player_count += 1;
            Some(Role::PlayerTwo)
        } else {
            None
        }
    }

    /// Empty the given slot, returning the connection that held it. Keeps the player count in sync.
    pub fn vacate(&mut self, role: Role) -> Option<ConnectionId> {
        let slot = match role {
            Role::PlayerOne => &mut self.player1_connection,
            Role::PlayerTwo => &mut self.player2_connection,
        };
        let occupant = slot.take();
        if occupant.is_some() {
            self.player_count -= 1;
        }
        occupant
    }

    /// Put the ball back at the arena center and serve it toward the given side, with a random vertical direction.
    ///
    /// If the game is already over this instead freezes the ball in place, so a stale serve request can never
    /// un-end a game.
    pub fn reset_ball_and_serve<R: Rng + ?Sized>(&mut self, serve_right: bool, rng: &mut R) {
        if self.game_over {
            self.stop_game();
            return;
        }
        let velocity_x = if serve_right {
            INITIAL_BALL_SPEED_X
        } else {
            -INITIAL_BALL_SPEED_X
        };
        let velocity_y = if rng.gen() {
            INITIAL_BALL_SPEED_Y
        } else {
            -INITIAL_BALL_SPEED_Y
        };
        self.ball
            .reset(GAME_WIDTH / 2.0, GAME_HEIGHT / 2.0, velocity_x, velocity_y);
    }

    /// Freeze the rendered state : the score and winner are already set, the ball must stop moving.
    fn stop_game(&mut self) {
        self.ball.velocity_x = 0.0;
        self.ball.velocity_y = 0.0;
    }

    /// Advance both paddles by their current `dy`, clamped to the arena.
    pub fn update_paddles(&mut self) {
        self.paddle1.update_position(GAME_HEIGHT);
        self.paddle2.update_position(GAME_HEIGHT);
    }

    /// Advance the ball one tick : integrate its motion, resolve paddle and wall collisions, then score.
    ///
    /// Paddle 1 is only checked while the ball moves leftward, paddle 2 while it moves rightward. A hit snaps the
    /// ball's leading edge to the paddle face (so it can neither tunnel through nor stick inside), inverts the
    /// horizontal velocity, and sets the vertical velocity from where on the paddle the ball struck : dead center
    /// sends it straight, the paddle tip sends it at [`MAX_BALL_SPEED_Y_AFTER_PADDLE_HIT`], above center upward.
    /// Wall clamping only inverts the vertical velocity while the ball still heads into the wall. A point is scored
    /// once the ball's trailing edge fully crosses an arena edge ; reaching [`WINNING_SCORE`] ends the game and
    /// freezes the ball, anything less serves toward the conceding side.
    pub fn update_ball<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.game_over {
            return;
        }
        self.ball.update_position();

        if self.ball.velocity_x < 0.0 {
            if ball_overlaps_paddle(&self.ball, &self.paddle1) {
                self.ball.x = self.paddle1.x + self.paddle1.width + self.ball.radius;
                self.ball.velocity_x = -self.ball.velocity_x;
                self.ball.velocity_y = bounce_velocity_y(&self.ball, &self.paddle1);
            }
        } else if self.ball.velocity_x > 0.0 {
            if ball_overlaps_paddle(&self.ball, &self.paddle2) {
                self.ball.x = self.paddle2.x - self.ball.radius;
                self.ball.velocity_x = -self.ball.velocity_x;
                self.ball.velocity_y = bounce_velocity_y(&self.ball, &self.paddle2);
            }
        }

        if self.ball.y - self.ball.radius < 0.0 {
            self.ball.y = self.ball.radius;
            if self.ball.velocity_y < 0.0 {
                self.ball.velocity_y = -self.ball.velocity_y;
            }
        } else if self.ball.y + self.ball.radius > GAME_HEIGHT {
            self.ball.y = GAME_HEIGHT - self.ball.radius;
            if self.ball.velocity_y > 0.0 {
                self.ball.velocity_y = -self.ball.velocity_y;
            }
        }

        let mut point_scored = false;
        if self.ball.x + self.ball.radius < 0.0 {
            self.score.player2 += 1;
            point_scored = true;
            if self.score.player2 >= WINNING_SCORE {
                self.game_over = true;
                self.winner = Some(Role::PlayerTwo);
            }
            self.reset_ball_and_serve(false, rng);
        } else if self.ball.x - self.ball.radius > GAME_WIDTH {
            self.score.player1 += 1;
            point_scored = true;
            if self.score.player1 >= WINNING_SCORE {
                self.game_over = true;
                self.winner = Some(Role::PlayerOne);
            }
            self.reset_ball_and_serve(true, rng);
        }
        if self.game_over && point_scored {
            self.stop_game();
        }
    }

    /// Produce an immutable copy of everything a client needs to render this room.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            paddle1: PaddleRect::from(&self.paddle1),
            paddle2: PaddleRect::from(&self.paddle2),
            ball: BallSnapshot {
                x: self.ball.x,
                y: self.ball.y,
                radius: self.ball.radius,
            },
            score: self.score,
            arena_width: GAME_WIDTH,
            arena_height: GAME_HEIGHT,
            game_over: self.game_over,
            winner: self.winner,
            player_count: self.player_count,
        }
    }
}

/// Axis-aligned overlap test between the ball's bounding square and the paddle rectangle.
fn ball_overlaps_paddle(ball: &Ball, paddle: &Paddle) -> bool {
    ball.x - ball.radius < paddle.x + paddle.width
        && ball.x + ball.radius > paddle.x
        && ball.y + ball.radius > paddle.y
        && ball.y - ball.radius < paddle.y + paddle.height
}

/// Vertical velocity after a paddle hit : the offset from the paddle center, normalized to `[-1, 1]` and scaled to
/// the maximum bounce speed. Hitting above the center sends the ball up.
fn bounce_velocity_y(ball: &Ball, paddle: &Paddle) -> f64 {
    let offset_from_center = paddle.y + paddle.height / 2.0 - ball.y;
    offset_from_center / (paddle.height / 2.0) * -MAX_BALL_SPEED_Y_AFTER_PADDLE_HIT
}

/// Rectangle of a paddle as rendered by clients. The paddle's internal `dy` is not part of a snapshot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PaddleRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<&Paddle> for PaddleRect {
    fn from(paddle: &Paddle) -> Self {
        PaddleRect {
            x: paddle.x,
            y: paddle.y,
            width: paddle.width,
            height: paddle.height,
        }
    }
}

/// Position and radius of the ball as rendered by clients.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BallSnapshot {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Immutable snapshot of a room, broadcast to its members after every tick and after every successful join.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GameSnapshot {
    pub paddle1: PaddleRect,
    pub paddle2: PaddleRect,
    pub ball: BallSnapshot,
    pub score: Score,
    pub arena_width: f64,
    pub arena_height: f64,
    pub game_over: bool,
    pub winner: Option<Role>,
    pub player_count: u8,
}
