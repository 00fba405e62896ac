//! Definition of the [`Role`] structure.

use std::ops::Not;

/// Enumeration symbolizing the two player slots of a room : player 1 holds the left paddle, player 2 the right one.
///
/// The [`Not`] trait is implemented to support getting the opposing role using `!r` syntax.
///
/// Conversions to and from [`u8`] are implemented in [`crate::protocol`]. They follow the wire protocol.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum Role {
    PlayerOne,
    PlayerTwo,
}

impl Not for Role {
    type Output = Role;
    fn not(self) -> Self::Output {
        match self {
            Self::PlayerOne => Self::PlayerTwo,
            Self::PlayerTwo => Self::PlayerOne,
        }
    }
}
