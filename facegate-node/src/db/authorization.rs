//! Room login tokens, room temp tokens and admin tokens

use chrono::{DateTime, Utc};
use facegate_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{decode_datetime, encode_datetime};
use crate::models::{AdminToken, RoomLoginToken, RoomTempToken};

#[derive(Clone)]
pub struct AuthorizationRepository {
    pool: SqlitePool,
}

impl AuthorizationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a temp token with a freshly minted token string
    pub async fn create_room_temp_token(
        &self,
        room_id: i64,
        valid_before: DateTime<Utc>,
    ) -> Result<RoomTempToken> {
        let token = Uuid::new_v4().simple().to_string();

        let row = sqlx::query(
            r#"
            INSERT INTO room_temp_tokens (token, room_id, valid_before)
            VALUES (?, ?, ?)
            RETURNING token, room_id, valid_before
            "#,
        )
        .bind(&token)
        .bind(room_id)
        .bind(encode_datetime(&valid_before))
        .fetch_one(&self.pool)
        .await?;

        temp_token_from_row(&row)
    }

    pub async fn delete_room_temp_token(&self, room_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM room_temp_tokens WHERE room_id = ?")
            .bind(room_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_room_temp_token(&self, token: &str) -> Result<Option<RoomTempToken>> {
        let row = sqlx::query(
            "SELECT token, room_id, valid_before FROM room_temp_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(temp_token_from_row).transpose()
    }

    pub async fn get_room_login_token(&self, token: &str) -> Result<Option<RoomLoginToken>> {
        let login_token = sqlx::query_as::<_, RoomLoginToken>(
            "SELECT token, room_id FROM room_login_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(login_token)
    }

    pub async fn get_admin_token(&self, token: &str) -> Result<Option<AdminToken>> {
        let admin_token = sqlx::query_as::<_, AdminToken>(
            "SELECT token, admin_id FROM admin_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(admin_token)
    }
}

fn temp_token_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RoomTempToken> {
    let valid_before: String = row.try_get("valid_before")?;
    Ok(RoomTempToken {
        token: row.try_get("token")?,
        room_id: row.try_get("room_id")?,
        valid_before: decode_datetime("valid_before", &valid_before)?,
    })
}
