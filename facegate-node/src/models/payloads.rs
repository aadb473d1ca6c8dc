//! Request payloads accepted by the JSON routes

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

/// Body of `POST /access/visit/new`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VisitInfo {
    #[serde(deserialize_with = "visit_datetime::deserialize")]
    pub datetime: DateTime<Utc>,
    pub user_id: i64,
}

/// Body of `POST /access/check/descriptor`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaceDescriptorPayload {
    pub features: Vec<f32>,
}

/// Body of `POST /tasks/report`
///
/// `new_status` stays a plain string: an unknown status is a business
/// failure reported in the outcome, not a schema violation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskPerformingReport {
    pub task_id: i64,
    pub new_status: String,
}

/// Visit timestamps: RFC 3339, or an ISO 8601 local time taken as UTC
mod visit_datetime {
    use super::*;

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| {
            de::Error::custom(format!("invalid visit datetime '{}'", raw))
        })
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
            return Some(datetime.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }
}
