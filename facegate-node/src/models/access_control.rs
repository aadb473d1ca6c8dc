//! Access control entities and results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Face feature vector
pub type Descriptor = Vec<f32>;

/// Known person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub extra_info: Option<String>,
}

/// Stored descriptor, `user_id` is `None` while unbound
#[derive(Debug, Clone, PartialEq)]
pub struct UserFaceDescriptor {
    pub id: i64,
    pub features: Descriptor,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomVisitReport {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub datetime: DateTime<Utc>,
}

/// Result of an access check by face or by descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessCheck {
    pub is_known: bool,
    pub have_access: Option<bool>,
    pub user: Option<User>,
}

impl AccessCheck {
    pub fn unknown() -> Self {
        Self {
            is_known: false,
            have_access: None,
            user: None,
        }
    }

    pub fn known(user: User, have_access: bool) -> Self {
        Self {
            is_known: true,
            have_access: Some(have_access),
            user: Some(user),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRecording {
    pub allowed: bool,
    pub visit_id: Option<i64>,
}

impl VisitRecording {
    pub fn denied() -> Self {
        Self {
            allowed: false,
            visit_id: None,
        }
    }

    pub fn recorded(visit_id: i64) -> Self {
        Self {
            allowed: true,
            visit_id: Some(visit_id),
        }
    }
}

/// Descriptor computed from an image, not bound to anyone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnonymousDescriptor {
    pub features: Descriptor,
}
