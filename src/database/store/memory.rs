//! In-memory settings store.
//!
//! A revision-guarded map implementing the same contract as the MongoDB
//! store. Used by tests and local development runs that have no database.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::RwLock;

use crate::database::models::{Revision, SettingsHistoryEntry};
use crate::error::{Result, SettingsError};

use super::{SettingsStore, StoredSettings};

#[derive(Default)]
struct Shared {
    rows: RwLock<HashMap<u64, StoredSettings>>,
    history: RwLock<Vec<SettingsHistoryEntry>>,
    inserts: AtomicU32,
    fail_history: AtomicBool,
}

/// Settings store held entirely in memory.
///
/// Cloning shares the same underlying map, mirroring how clones of the
/// MongoDB store share one database.
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    shared: Arc<Shared>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful row inserts since construction.
    pub fn insert_count(&self) -> u32 {
        self.shared.inserts.load(Ordering::SeqCst)
    }

    /// Make subsequent history appends fail, simulating an unavailable
    /// history table.
    pub fn fail_history_appends(&self, fail: bool) {
        self.shared.fail_history.store(fail, Ordering::SeqCst);
    }

    /// Direct row write bypassing the revision check. Lets callers stage
    /// documents as an older deployment would have written them.
    pub fn put_raw(&self, guild_id: u64, schema_version: i32, json: impl Into<String>) {
        let mut rows = self.shared.rows.write();
        let revision = rows
            .get(&guild_id)
            .map_or(Revision::FIRST, |row| row.revision.next());
        rows.insert(
            guild_id,
            StoredSettings {
                guild_id,
                schema_version,
                json: json.into(),
                revision,
            },
        );
    }

    /// Snapshot of the history log, oldest first.
    pub fn history_log(&self) -> Vec<SettingsHistoryEntry> {
        self.shared.history.read().clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    async fn load(&self, guild_id: u64) -> Result<Option<StoredSettings>> {
        Ok(self.shared.rows.read().get(&guild_id).cloned())
    }

    async fn insert(&self, guild_id: u64, schema_version: i32, json: String) -> Result<Revision> {
        let mut rows = self.shared.rows.write();
        if rows.contains_key(&guild_id) {
            return Err(SettingsError::AlreadyExists(guild_id));
        }
        rows.insert(
            guild_id,
            StoredSettings {
                guild_id,
                schema_version,
                json,
                revision: Revision::FIRST,
            },
        );
        self.shared.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(Revision::FIRST)
    }

    async fn compare_and_swap(
        &self,
        guild_id: u64,
        schema_version: i32,
        json: String,
        expected: Revision,
    ) -> Result<Revision> {
        let mut rows = self.shared.rows.write();
        let row = rows
            .get_mut(&guild_id)
            .ok_or(SettingsError::NotFound(guild_id))?;
        if row.revision != expected {
            return Err(SettingsError::ConcurrencyConflict(guild_id));
        }
        row.schema_version = schema_version;
        row.json = json;
        row.revision = row.revision.next();
        Ok(row.revision)
    }

    async fn append_history(&self, entry: SettingsHistoryEntry) -> Result<()> {
        if self.shared.fail_history.load(Ordering::SeqCst) {
            return Err(SettingsError::Storage(mongodb::error::Error::custom(
                "history store unavailable",
            )));
        }
        self.shared.history.write().push(entry);
        Ok(())
    }

    async fn history(&self, guild_id: u64, take: usize) -> Result<Vec<SettingsHistoryEntry>> {
        let history = self.shared.history.read();
        Ok(history
            .iter()
            .rev()
            .filter(|entry| entry.guild_id == guild_id)
            .take(take.max(1))
            .cloned()
            .collect())
    }
}
