//! Success/failure wrapper returned by every service operation
//!
//! An `Outcome` carries *business* results only: unknown token, unknown
//! face, missing permission and so on. Faults (database trouble, broken
//! invariants) are [`crate::Error`] and never end up here.
//!
//! Wire form:
//!
//! ```json
//! {"success": true,  "result": { ... }}
//! {"success": false, "cause": "Unknown room login token."}
//! ```
//!
//! Null fields are dropped from the wire form at every depth, so optional
//! result fields that are absent simply do not appear.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;

/// Business-level result of a service operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Operation succeeded with a result
    Ok(T),
    /// Operation refused for a human-readable reason
    Error(String),
}

impl<T> Outcome<T> {
    pub fn ok(result: T) -> Self {
        Outcome::Ok(result)
    }

    pub fn error(cause: impl Into<String>) -> Self {
        Outcome::Error(cause.into())
    }

    /// The `success` flag as it appears on the wire
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            Outcome::Ok(result) => Some(result),
            Outcome::Error(_) => None,
        }
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Error(cause) => Some(cause),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(result) => Outcome::Ok(f(result)),
            Outcome::Error(cause) => Outcome::Error(cause),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match self {
            Outcome::Ok(result) => Ok(result),
            Outcome::Error(cause) => Err(cause),
        }
    }
}

impl<T: Serialize> Outcome<T> {
    /// JSON wire form with every null field removed
    pub fn to_wire(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        strip_nulls(&mut value);
        Ok(value)
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outcome", 2)?;
        match self {
            Outcome::Ok(result) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("result", result)?;
            }
            Outcome::Error(cause) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("cause", cause)?;
            }
        }
        state.end()
    }
}

/// Remove `null` object members recursively
///
/// Array elements are kept even when null, only object members are dropped.
pub fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}
