use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Role held globally by a user and per organization by a membership.
///
/// Conceptually ordered `User < Admin < Superadmin`, but gates match on
/// explicit role sets rather than on the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    /// Decode a stored role. Anything unrecognised falls back to the floor role.
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or(Role::User)
    }

    pub fn is_superadmin(self) -> bool {
        self == Role::Superadmin
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}
