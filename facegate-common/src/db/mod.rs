//! Shared database session
//!
//! The node talks to storage through exactly one SQLite connection. Queries
//! from concurrent requests are queued on that connection by the pool;
//! conflicting writes are serialised by SQLite itself.

pub mod init;

pub use init::*;
