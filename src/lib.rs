//! Garrison - guild configuration core for a Discord community-management
//! bot.
//!
//! The bot's command handlers (verification review, role assignment,
//! channel access toggles) live elsewhere; this crate owns the data they
//! read and write.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration and the guild seed template
//! - `database` - MongoDB integration: models, storage backends, repositories
//! - `cache` - Read-through caching with Moka
//! - `error` - Typed failure taxonomy shared across the crate
//!
//! The central surface is [`database::GuildSettingsRepo`]: versioned
//! per-guild configuration documents with optimistic-concurrency writes, an
//! append-only audit history, and a sliding-expiry read-through cache.
//! Writes are guarded by a storage-assigned revision token, so concurrent
//! edits from any number of bot instances resolve to exactly one winner and
//! an explicit [`error::SettingsError::ConcurrencyConflict`] for the rest.

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
