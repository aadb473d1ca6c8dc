//! Users, descriptors, permissions and visit reports

use chrono::{DateTime, Utc};
use facegate_common::{Error, Result};
use futures::TryStreamExt;
use sqlx::{Row, SqlitePool};

use super::{decode_datetime, encode_datetime};
use crate::models::{Descriptor, RoomVisitReport, User, UserFaceDescriptor};

#[derive(Clone)]
pub struct AccessControlRepository {
    pool: SqlitePool,
}

impl AccessControlRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Owner of a descriptor; `None` when the descriptor is unknown or unbound
    pub async fn get_user_by_descriptor_id(&self, descriptor_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, surname, extra_info FROM users
            WHERE id = (SELECT user_id FROM user_face_descriptors WHERE id = ?)
            "#,
        )
        .bind(descriptor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, surname, extra_info FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn check_access_permission_exist(&self, user_id: i64, room_id: i64) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM user_room_access_permissions WHERE room_id = ? AND user_id = ?",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    pub async fn create_visit_report(
        &self,
        room_id: i64,
        user_id: i64,
        datetime: DateTime<Utc>,
    ) -> Result<RoomVisitReport> {
        let row = sqlx::query(
            r#"
            INSERT INTO room_visit_reports (room_id, user_id, datetime)
            VALUES (?, ?, ?)
            RETURNING id, room_id, user_id, datetime
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(encode_datetime(&datetime))
        .fetch_one(&self.pool)
        .await?;

        let datetime: String = row.try_get("datetime")?;
        Ok(RoomVisitReport {
            id: row.try_get("id")?,
            room_id: row.try_get("room_id")?,
            user_id: row.try_get("user_id")?,
            datetime: decode_datetime("datetime", &datetime)?,
        })
    }

    /// Every stored descriptor, read as a stream over one query
    pub async fn get_all_face_descriptors(&self) -> Result<Vec<UserFaceDescriptor>> {
        let mut rows = sqlx::query("SELECT id, user_id, features FROM user_face_descriptors")
            .fetch(&self.pool);

        let mut descriptors = Vec::new();
        while let Some(row) = rows.try_next().await? {
            let id: i64 = row.try_get("id")?;
            let features: String = row.try_get("features")?;
            descriptors.push(UserFaceDescriptor {
                id,
                features: decode_features(id, &features)?,
                user_id: row.try_get("user_id")?,
            });
        }

        Ok(descriptors)
    }
}

fn decode_features(descriptor_id: i64, raw: &str) -> Result<Descriptor> {
    serde_json::from_str(raw).map_err(|e| {
        Error::Integrity(format!(
            "Descriptor {} has malformed features: {}",
            descriptor_id, e
        ))
    })
}
