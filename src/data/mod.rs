//! Data layer module
//!
//! Handles all local persistence:
//! - Pending-upload outbox
//! - Feed cache (stale-tolerant)
//! - Signed-in session

mod database;
mod models;

pub use database::Database;
pub use models::*;
