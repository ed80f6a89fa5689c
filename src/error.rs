//! Error type for the guild settings subsystem.

use thiserror::Error;

/// Errors surfaced by the settings store and repositories.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// No settings row exists for the guild where one was required.
    #[error("no settings row for guild {0}")]
    NotFound(u64),

    /// A settings row already exists for the guild.
    #[error("settings row already exists for guild {0}")]
    AlreadyExists(u64),

    /// The stored revision no longer matches the one this write was based
    /// on: someone else changed the configuration in between. The whole edit
    /// must be retried by the caller; nothing was written.
    #[error("guild {0} configuration was updated concurrently")]
    ConcurrencyConflict(u64),

    /// Driver-level failure (connectivity, timeout). Retryable by the
    /// caller; retry policy belongs to the driver configuration, not here.
    #[error("storage error: {0}")]
    Storage(#[from] mongodb::error::Error),

    /// A stored document failed to deserialize. Propagated hard so a
    /// corrupt but possibly recoverable document is never reseeded over.
    #[error("malformed settings document for guild {guild_id}: {source}")]
    MalformedDocument {
        guild_id: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = SettingsError> = std::result::Result<T, E>;
