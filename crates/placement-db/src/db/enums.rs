//! Database enum types with Diesel serialization.
//!
//! Status columns are TEXT with CHECK constraints. Each enum here implements
//! `ToSql` and `FromSql` so the rest of the crate never handles raw status strings.

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use std::fmt;
use std::io::Write;

/// Lifecycle of a placement request.
///
/// Maps to `placement_requests.status` CHECK constraint. Only
/// `Pending -> Accepted` and `Pending -> Rejected` exist.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ToSql<Text, Pg> for RequestStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for RequestStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"pending" => Ok(Self::Pending),
            b"accepted" => Ok(Self::Accepted),
            b"rejected" => Ok(Self::Rejected),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl RequestStatus {
    /// Returns the database string representation of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the request has left `pending` and can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a negotiation room.
///
/// Maps to `message_rooms.status` CHECK constraint.
/// `Negotiating -> Accepted | Rejected`, `Accepted -> Completed`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Negotiating,
    Accepted,
    Rejected,
    Completed,
}

impl ToSql<Text, Pg> for RoomStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for RoomStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"negotiating" => Ok(Self::Negotiating),
            b"accepted" => Ok(Self::Accepted),
            b"rejected" => Ok(Self::Rejected),
            b"completed" => Ok(Self::Completed),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl RoomStatus {
    /// Returns the database string representation of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Negotiating => "negotiating",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// `Rejected` and `Completed` admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    /// Whether new messages may be appended in this state.
    #[must_use]
    pub const fn accepts_messages(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    /// Whether new file attachments may be appended in this state.
    #[must_use]
    pub const fn accepts_files(self) -> bool {
        matches!(self, Self::Negotiating | Self::Accepted)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which participant's completion flag an operation touches.
///
/// Not a column of its own; selects between `hospital_completed` and
/// `facility_completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionSide {
    Hospital,
    Facility,
}

impl CompletionSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Facility => "facility",
        }
    }
}

impl fmt::Display for CompletionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
