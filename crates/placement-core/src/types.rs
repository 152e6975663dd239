use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Role of an authenticated caller, without database dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Hospital,
    Facility,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Facility => "facility",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hospital" => Ok(Self::Hospital),
            "facility" => Ok(Self::Facility),
            "admin" => Ok(Self::Admin),
            other => Err(CoreError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

/// Caller identity as resolved by the authentication layer.
///
/// The workflow trusts this value but never trusts it for ownership: the owned
/// hospital or facility is always re-derived from `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i32,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub const fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }

    #[must_use]
    pub const fn hospital(user_id: i32) -> Self {
        Self::new(user_id, Role::Hospital)
    }

    #[must_use]
    pub const fn facility(user_id: i32) -> Self {
        Self::new(user_id, Role::Facility)
    }

    #[must_use]
    pub const fn admin(user_id: i32) -> Self {
        Self::new(user_id, Role::Admin)
    }
}
