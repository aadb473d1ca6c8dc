//! Entities and wire models

pub mod access_control;
pub mod authorization;
pub mod payloads;
pub mod tasks;

pub use access_control::*;
pub use authorization::*;
pub use payloads::*;
pub use tasks::*;
