//! Database module exports.

mod mongo;

pub mod models;
pub mod repository;
pub mod store;

pub use models::*;
pub use mongo::Database;
pub use repository::{GuildRepo, GuildSettingsRepo, VerificationHistoryRepo};
