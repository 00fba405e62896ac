//! Protocol-compliant serialization/deserialization for [`Role`].
//!
//! On the wire, player 1 is `1` and player 2 is `2`. The value `0` is reserved for "no winner" in the messages
//! that carry a winner slot.

use crate::game::Role;

/// Errors encountered when making a [`Role`] out of a [`u8`].
#[derive(thiserror::Error, Debug)]
#[cfg_attr(test, derive(Eq, PartialEq))]
pub enum RoleCastError {
    #[error("A Role is either 1 for player 1 or 2 for player 2 - got `{0}`")]
    InvalidInteger(u8),
}

impl TryFrom<u8> for Role {
    type Error = RoleCastError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::PlayerOne),
            2 => Ok(Self::PlayerTwo),
            n => Err(Self::Error::InvalidInteger(n)),
        }
    }
}

impl From<Role> for u8 {
    fn from(value: Role) -> Self {
        match value {
            Role::PlayerOne => 1,
            Role::PlayerTwo => 2,
        }
    }
}
