//! Token entities and authorization states

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Long-lived token a room trades for temp tokens
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RoomLoginToken {
    pub token: String,
    pub room_id: i64,
}

/// Short-lived token a room authenticates with
#[derive(Debug, Clone, PartialEq)]
pub struct RoomTempToken {
    pub token: String,
    pub room_id: i64,
    pub valid_before: DateTime<Utc>,
}

impl RoomTempToken {
    pub fn is_valid_at(&self, instant: DateTime<Utc>) -> bool {
        instant < self.valid_before
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AdminToken {
    pub token: String,
    pub admin_id: i64,
}

/// Outcome of checking a room temp token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAuthorization {
    /// No such token
    Unknown,
    /// Token exists but its `valid_before` has passed
    Expired,
    /// Token exists and is live
    Valid { room_id: i64 },
}

impl RoomAuthorization {
    pub fn known(&self) -> bool {
        !matches!(self, RoomAuthorization::Unknown)
    }

    /// `None` for unknown tokens, validity is only defined for known ones
    pub fn valid(&self) -> Option<bool> {
        match self {
            RoomAuthorization::Unknown => None,
            RoomAuthorization::Expired => Some(false),
            RoomAuthorization::Valid { .. } => Some(true),
        }
    }

    pub fn room_id(&self) -> Option<i64> {
        match self {
            RoomAuthorization::Valid { room_id } => Some(*room_id),
            _ => None,
        }
    }
}

/// Outcome of checking an admin token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAuthorization {
    Unknown,
    Known { admin_id: i64 },
}

impl AdminAuthorization {
    pub fn known(&self) -> bool {
        matches!(self, AdminAuthorization::Known { .. })
    }

    pub fn admin_id(&self) -> Option<i64> {
        match self {
            AdminAuthorization::Known { admin_id } => Some(*admin_id),
            AdminAuthorization::Unknown => None,
        }
    }
}

/// Freshly issued temp token as returned by room login
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TempTokenInfo {
    pub temp_token: String,
    pub valid_before: DateTime<Utc>,
}
