//! Room and admin token authorization
//!
//! Temp tokens are the only thing rooms present on ordinary requests. A
//! room trades its long-lived login token for a temp token through
//! [`AuthorizationService::log_in_room`]; the previous temp token of that
//! room is deleted first. Delete and insert are two statements with no
//! lock around them, so two concurrent logins of one room both succeed
//! and the later insert is the one left standing.

use async_trait::async_trait;
use chrono::Duration;
use facegate_common::time::Clock;
use facegate_common::{Error, Outcome, Result};
use std::sync::Arc;
use tracing::{debug, info};

use super::Service;
use crate::db::AuthorizationRepository;
use crate::models::{AdminAuthorization, RoomAuthorization, TempTokenInfo};

pub const UNKNOWN_LOGIN_TOKEN: &str = "Unknown room login token.";

pub struct AuthorizationService {
    repo: AuthorizationRepository,
    clock: Arc<dyn Clock>,
    token_lifetime: Duration,
}

impl AuthorizationService {
    pub fn new(repo: AuthorizationRepository, clock: Arc<dyn Clock>, token_lifetime: Duration) -> Self {
        Self {
            repo,
            clock,
            token_lifetime,
        }
    }

    pub async fn authorize_room(&self, token: &str) -> Result<RoomAuthorization> {
        let Some(temp_token) = self.repo.get_room_temp_token(token).await? else {
            debug!("Unknown room temp token");
            return Ok(RoomAuthorization::Unknown);
        };

        if !temp_token.is_valid_at(self.clock.now()) {
            debug!("Expired temp token for room {}", temp_token.room_id);
            return Ok(RoomAuthorization::Expired);
        }

        Ok(RoomAuthorization::Valid {
            room_id: temp_token.room_id,
        })
    }

    pub async fn authorize_admin(&self, token: &str) -> Result<AdminAuthorization> {
        match self.repo.get_admin_token(token).await? {
            Some(admin_token) => Ok(AdminAuthorization::Known {
                admin_id: admin_token.admin_id,
            }),
            None => {
                debug!("Unknown admin token");
                Ok(AdminAuthorization::Unknown)
            }
        }
    }

    /// Issue a fresh temp token for the room owning `login_token`
    pub async fn log_in_room(&self, login_token: &str) -> Result<Outcome<TempTokenInfo>> {
        let Some(login) = self.repo.get_room_login_token(login_token).await? else {
            debug!("Unknown room login token");
            return Ok(Outcome::error(UNKNOWN_LOGIN_TOKEN));
        };

        let issued_at = self.clock.now();
        let valid_before = issued_at
            .checked_add_signed(self.token_lifetime)
            .ok_or_else(|| {
                Error::Internal(format!(
                    "Temp token lifetime {} overflows from {}",
                    self.token_lifetime, issued_at
                ))
            })?;

        self.repo.delete_room_temp_token(login.room_id).await?;

        let temp_token = self
            .repo
            .create_room_temp_token(login.room_id, valid_before)
            .await?;

        info!(
            "Issued temp token for room {} valid before {}",
            login.room_id, temp_token.valid_before
        );

        Ok(Outcome::ok(TempTokenInfo {
            temp_token: temp_token.token,
            valid_before: temp_token.valid_before,
        }))
    }
}

#[async_trait]
impl Service for AuthorizationService {
    fn name(&self) -> &'static str {
        "authorization"
    }
}
