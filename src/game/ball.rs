//! Definition of the [`Ball`] geometry primitive.

/// The ball of a Pong game : a position, a radius and a velocity.
///
/// This structure only knows how to integrate its own motion. Collisions with walls and paddles, and the bounds of
/// the arena, are resolved by the owning [`crate::game::Game`] session.
#[derive(Copy, Clone, Debug)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
}

impl Ball {
    /// Create a new [`Ball`]. The radius never changes afterwards.
    pub fn new(x: f64, y: f64, radius: f64, velocity_x: f64, velocity_y: f64) -> Ball {
        Ball {
            x,
            y,
            radius,
            velocity_x,
            velocity_y,
        }
    }

    /// Add the velocity to the position. No bounds check is done here.
    pub fn update_position(&mut self) {
        self.x += self.velocity_x;
        self.y += self.velocity_y;
    }

    /// Overwrite the position and the velocity, leaving no residual state. Used to put the ball back at the center
    /// of the arena for a serve.
    pub fn reset(&mut self, x: f64, y: f64, velocity_x: f64, velocity_y: f64) {
        self.x = x;
        self.y = y;
        self.velocity_x = velocity_x;
        self.velocity_y = velocity_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_integration() {
        let mut ball = Ball::new(100.0, 200.0, 7.0, 5.0, -2.0);
        ball.update_position();
        assert_eq!(ball.x, 105.0);
        assert_eq!(ball.y, 198.0);
        ball.update_position();
        assert_eq!(ball.x, 110.0);
        assert_eq!(ball.y, 196.0);
    }

    #[test]
    fn reset_overwrites_everything() {
        let mut ball = Ball::new(3.0, 4.0, 7.0, -5.0, 2.0);
        ball.update_position();
        ball.reset(400.0, 300.0, 5.0, -2.0);
        assert_eq!(ball.x, 400.0);
        assert_eq!(ball.y, 300.0);
        assert_eq!(ball.velocity_x, 5.0);
        assert_eq!(ball.velocity_y, -2.0);
        // The radius is not touched by a reset.
        assert_eq!(ball.radius, 7.0);
    }
}
