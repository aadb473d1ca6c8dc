//! Room tasks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub room_id: i64,
    pub manager_id: i64,
    pub body: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Undone,
    Done,
    Cancelled,
    Error,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Undone,
        TaskStatus::Done,
        TaskStatus::Cancelled,
        TaskStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Undone => "UNDONE",
            TaskStatus::Done => "DONE",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown task status: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_exact() {
        assert_eq!("DONE".parse::<TaskStatus>(), Ok(TaskStatus::Done));
        assert_eq!("CANCELLED".parse::<TaskStatus>(), Ok(TaskStatus::Cancelled));
        assert!("done".parse::<TaskStatus>().is_err());
        assert!("BOGUS".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&TaskStatus::Undone).unwrap(), "\"UNDONE\"");
    }
}
