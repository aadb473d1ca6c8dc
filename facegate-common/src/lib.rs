//! # Facegate Common Library
//!
//! Shared code for the facegate access-control services:
//! - Outcome contract returned by every service operation
//! - Fault type (`Error`) and `Result` alias
//! - Bootstrap configuration loading
//! - Shared SQLite session set-up and schema bootstrap
//! - Clock helpers

pub mod config;
pub mod db;
pub mod error;
pub mod outcome;
pub mod time;

pub use error::{Error, Result};
pub use outcome::Outcome;
