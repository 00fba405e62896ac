//! Definition of the [`Paddle`] geometry primitive and the input actions that drive it.

/// A paddle : a fixed rectangle whose vertical position moves by `dy` units per tick.
///
/// `dy` is set by player input through [`Paddle::move_up`] and [`Paddle::move_down`] and cleared by
/// [`Paddle::stop`]. Boundary clamping in [`Paddle::update_position`] does NOT clear `dy` : a paddle held against a
/// wall keeps its nonzero velocity even though its position no longer changes.
#[derive(Copy, Clone, Debug)]
pub struct Paddle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub dy: f64,
}

impl Paddle {
    /// Create a new, stationary [`Paddle`].
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Paddle {
        Paddle {
            x,
            y,
            width,
            height,
            dy: 0.0,
        }
    }

    /// Add `dy` to the vertical position, then clamp it into `[0, arena_height - height]`.
    pub fn update_position(&mut self, arena_height: f64) {
        self.y += self.dy;
        if self.y < 0.0 {
            self.y = 0.0;
        } else if self.y + self.height > arena_height {
            self.y = arena_height - self.height;
        }
    }

    /// Start moving up. The sign normalization makes this idempotent regardless of the prior `dy`.
    pub fn move_up(&mut self, speed: f64) {
        self.dy = -speed.abs();
    }

    /// Start moving down. The sign normalization makes this idempotent regardless of the prior `dy`.
    pub fn move_down(&mut self, speed: f64) {
        self.dy = speed.abs();
    }

    /// Stop moving.
    pub fn stop(&mut self) {
        self.dy = 0.0;
    }
}

/// A paddle input, as sent by a client : start moving in a direction, or stop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PaddleAction {
    Start(MoveDirection),
    Stop,
}

/// Vertical direction of a paddle movement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    const ARENA_HEIGHT: f64 = 600.0;

    #[test]
    fn position_stays_in_bounds() {
        let mut thread_rng = rand::thread_rng();
        for _ in 0..200 {
            let mut paddle = Paddle::new(10.0, thread_rng.gen_range(-50.0..650.0), 10.0, 100.0);
            paddle.dy = thread_rng.gen_range(-20.0..20.0);
            paddle.update_position(ARENA_HEIGHT);
            assert!(paddle.y >= 0.0);
            assert!(paddle.y <= ARENA_HEIGHT - paddle.height);
        }
    }

    #[test]
    fn clamping_does_not_clear_dy() {
        let mut paddle = Paddle::new(10.0, 0.0, 10.0, 100.0);
        paddle.move_up(8.0);
        paddle.update_position(ARENA_HEIGHT);
        assert_eq!(paddle.y, 0.0);
        assert_eq!(paddle.dy, -8.0);

        paddle.y = ARENA_HEIGHT - paddle.height;
        paddle.move_down(8.0);
        paddle.update_position(ARENA_HEIGHT);
        assert_eq!(paddle.y, ARENA_HEIGHT - paddle.height);
        assert_eq!(paddle.dy, 8.0);
    }

    #[test]
    fn movement_sign_is_normalized() {
        let mut paddle = Paddle::new(10.0, 250.0, 10.0, 100.0);
        paddle.move_up(-8.0);
        assert_eq!(paddle.dy, -8.0);
        paddle.move_up(8.0);
        assert_eq!(paddle.dy, -8.0);
        paddle.move_down(-8.0);
        assert_eq!(paddle.dy, 8.0);
        paddle.stop();
        assert_eq!(paddle.dy, 0.0);
    }
}
