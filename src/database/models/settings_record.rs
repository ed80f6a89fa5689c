//! Persisted settings row and its audit records.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Opaque concurrency token assigned by the storage layer.
///
/// Equality-comparable and bumped on every successful write; a conditional
/// write is rejected when the stored token no longer equals the one the
/// writer read. Callers never inspect the inner value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub(crate) i64);

impl Revision {
    /// Token assigned to a freshly inserted row.
    pub(crate) const FIRST: Revision = Revision(1);

    pub(crate) fn next(self) -> Revision {
        Revision(self.0 + 1)
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings row as stored in the `guild_settings` collection.
///
/// The guild id is the logical primary key (unique index) and is never
/// regenerated; rows are never deleted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildSettingsRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub guild_id: u64,

    pub schema_version: i32,

    /// Serialized [`GuildConfig`](super::GuildConfig) blob.
    pub json: String,

    /// Bumped atomically with every successful write.
    pub revision: Revision,
}

/// Append-only audit snapshot written after every successful mutation.
/// Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsHistoryEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub guild_id: u64,

    /// Document snapshot exactly as written.
    pub json: String,

    /// Actor label supplied by the command handler, when known.
    #[serde(default)]
    pub changed_by: Option<String>,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub changed_at: DateTime<Utc>,
}
