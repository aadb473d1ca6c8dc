//! Repositories over the shared database session
//!
//! Each method issues one parameterized statement and maps rows into
//! entities. Nothing here retries: a failing query is a fault and
//! propagates as `facegate_common::Error`.

pub mod access_control;
pub mod authorization;
pub mod tasks;

pub use access_control::AccessControlRepository;
pub use authorization::AuthorizationRepository;
pub use tasks::TasksRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use facegate_common::{Error, Result};

/// Timestamps are stored as RFC 3339 text with full sub-second precision
pub(crate) fn encode_datetime(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn decode_datetime(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Integrity(format!("Failed to parse {} '{}': {}", column, raw, e)))
}
