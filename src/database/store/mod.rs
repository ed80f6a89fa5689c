//! Storage backends for guild settings.
//!
//! [`SettingsStore`] is the seam between the settings repository and durable
//! storage: point lookup by guild id, a guarded insert, a conditional
//! replace keyed on the row revision, and an append-only history insert.
//! The revision is the sole cross-process mutual-exclusion mechanism;
//! multiple bot instances may run against the same database, so no
//! in-process lock can substitute for it.

mod memory;
mod mongo;

use std::future::Future;

use crate::database::models::{GuildSettingsRecord, Revision, SettingsHistoryEntry};
use crate::error::Result;

pub use memory::MemorySettingsStore;
pub use mongo::MongoSettingsStore;

/// A settings row together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct StoredSettings {
    pub guild_id: u64,
    pub schema_version: i32,
    pub json: String,
    pub revision: Revision,
}

impl From<GuildSettingsRecord> for StoredSettings {
    fn from(record: GuildSettingsRecord) -> Self {
        Self {
            guild_id: record.guild_id,
            schema_version: record.schema_version,
            json: record.json,
            revision: record.revision,
        }
    }
}

/// Abstraction over durable settings storage.
///
/// All methods return `Send` futures so implementations can be driven from
/// a multi-threaded runtime.
pub trait SettingsStore: Send + Sync {
    /// Point lookup. `None` when no row exists for the guild.
    fn load(
        &self,
        guild_id: u64,
    ) -> impl Future<Output = Result<Option<StoredSettings>>> + Send + '_;

    /// Create the guild's row.
    ///
    /// Fails with [`SettingsError::AlreadyExists`](crate::error::SettingsError::AlreadyExists)
    /// when a row is present, even when two writers race the creation; an
    /// existing row is never silently overwritten.
    fn insert(
        &self,
        guild_id: u64,
        schema_version: i32,
        json: String,
    ) -> impl Future<Output = Result<Revision>> + Send + '_;

    /// Conditionally replace the document.
    ///
    /// The stored revision must equal `expected` at the instant of the
    /// write, or the whole write is rejected with
    /// [`SettingsError::ConcurrencyConflict`](crate::error::SettingsError::ConcurrencyConflict)
    /// -- there is no partial merge. Returns the revision assigned to the
    /// new row state.
    fn compare_and_swap(
        &self,
        guild_id: u64,
        schema_version: i32,
        json: String,
        expected: Revision,
    ) -> impl Future<Output = Result<Revision>> + Send + '_;

    /// Append an audit snapshot. Entries are never updated or deleted.
    fn append_history(
        &self,
        entry: SettingsHistoryEntry,
    ) -> impl Future<Output = Result<()>> + Send + '_;

    /// Most recent audit snapshots for a guild, newest first.
    fn history(
        &self,
        guild_id: u64,
        take: usize,
    ) -> impl Future<Output = Result<Vec<SettingsHistoryEntry>>> + Send + '_;
}
