//! MongoDB-backed settings store.

use mongodb::bson::doc;
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};

use futures::TryStreamExt;
use tracing::debug;

use crate::database::Database;
use crate::database::models::{GuildSettingsRecord, Revision, SettingsHistoryEntry};
use crate::error::{Result, SettingsError};

use super::{SettingsStore, StoredSettings};

/// Settings store backed by the `guild_settings` and
/// `guild_settings_history` collections.
///
/// Cloning is cheap; collection handles are reference-counted.
#[derive(Debug, Clone)]
pub struct MongoSettingsStore {
    settings: Collection<GuildSettingsRecord>,
    history: Collection<SettingsHistoryEntry>,
}

impl MongoSettingsStore {
    pub fn new(db: &Database) -> Self {
        Self {
            settings: db.collection("guild_settings"),
            history: db.collection("guild_settings_history"),
        }
    }

    /// Create the unique guild index the insert race guard relies on.
    /// Call once at startup.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "guild_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.settings.create_index(index).await?;
        Ok(())
    }
}

/// True when the error is a unique-index violation.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}

impl SettingsStore for MongoSettingsStore {
    async fn load(&self, guild_id: u64) -> Result<Option<StoredSettings>> {
        let filter = doc! { "guild_id": guild_id as i64 };
        let record = self.settings.find_one(filter).await?;
        Ok(record.map(StoredSettings::from))
    }

    async fn insert(&self, guild_id: u64, schema_version: i32, json: String) -> Result<Revision> {
        let record = GuildSettingsRecord {
            id: None,
            guild_id,
            schema_version,
            json,
            revision: Revision::FIRST,
        };

        match self.settings.insert_one(&record).await {
            Ok(_) => {
                debug!("Inserted settings row for guild {guild_id}");
                Ok(Revision::FIRST)
            }
            Err(err) if is_duplicate_key(&err) => Err(SettingsError::AlreadyExists(guild_id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn compare_and_swap(
        &self,
        guild_id: u64,
        schema_version: i32,
        json: String,
        expected: Revision,
    ) -> Result<Revision> {
        // The revision check and bump happen in one statement; there is no
        // window in which another writer can interleave.
        let filter = doc! { "guild_id": guild_id as i64, "revision": expected.0 };
        let update = doc! {
            "$set": { "schema_version": schema_version, "json": json },
            "$inc": { "revision": 1_i64 },
        };

        let updated = self
            .settings
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;

        match updated {
            Some(record) => Ok(record.revision),
            // Nothing matched: the row is either gone or at a newer revision.
            None => {
                let exists = self
                    .settings
                    .find_one(doc! { "guild_id": guild_id as i64 })
                    .await?
                    .is_some();
                if exists {
                    Err(SettingsError::ConcurrencyConflict(guild_id))
                } else {
                    Err(SettingsError::NotFound(guild_id))
                }
            }
        }
    }

    async fn append_history(&self, entry: SettingsHistoryEntry) -> Result<()> {
        self.history.insert_one(&entry).await?;
        Ok(())
    }

    async fn history(&self, guild_id: u64, take: usize) -> Result<Vec<SettingsHistoryEntry>> {
        let filter = doc! { "guild_id": guild_id as i64 };
        let entries = self
            .history
            .find(filter)
            .sort(doc! { "changed_at": -1 })
            .limit(take.max(1) as i64)
            .await?
            .try_collect()
            .await?;
        Ok(entries)
    }
}
