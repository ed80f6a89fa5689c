//! Guild directory repository.
//!
//! Name and clan tag for each guild, used when rendering embeds. Kept in
//! its own collection so rename events never contend with settings writes.

use std::time::Duration;

use mongodb::Collection;
use mongodb::bson::{Document, doc};
use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::Database;
use crate::database::models::Guild;
use crate::error::Result;

/// Repository for guild display metadata.
#[derive(Clone)]
pub struct GuildRepo {
    collection: Collection<Guild>,
    cache: TypedCache<u64, Guild>,
}

impl GuildRepo {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        let cache = cache.get_or_create(
            "guilds",
            // Renames are rare; a long idle window is fine.
            CacheConfig::with_capacity(5_000).tti(Duration::from_secs(1800)),
        );

        Self {
            collection: db.collection("guilds"),
            cache,
        }
    }

    /// Get the directory row if present.
    pub async fn get(&self, guild_id: u64) -> Result<Option<Guild>> {
        if let Some(guild) = self.cache.get(&guild_id) {
            return Ok(Some(guild));
        }

        let filter = doc! { "guild_id": guild_id as i64 };
        let result = self.collection.find_one(filter).await?;

        if let Some(guild) = &result {
            self.cache.insert(guild_id, guild.clone());
        }

        Ok(result)
    }

    pub async fn guild_name(&self, guild_id: u64) -> Result<Option<String>> {
        Ok(self
            .get(guild_id)
            .await?
            .and_then(|guild| guild.name)
            .filter(|name| !name.trim().is_empty()))
    }

    pub async fn guild_tag(&self, guild_id: u64) -> Result<Option<String>> {
        Ok(self
            .get(guild_id)
            .await?
            .and_then(|guild| guild.tag)
            .filter(|tag| !tag.trim().is_empty()))
    }

    /// Tag when set, name as fallback.
    pub async fn display_name(&self, guild_id: u64) -> Result<Option<String>> {
        Ok(self
            .get(guild_id)
            .await?
            .and_then(|guild| guild.display_name().map(str::to_owned)))
    }

    /// Record the guild's current name (upsert).
    pub async fn set_name(&self, guild_id: u64, name: &str) -> Result<()> {
        self.upsert(guild_id, doc! { "name": name }).await
    }

    /// Record the guild's clan tag (upsert).
    pub async fn set_tag(&self, guild_id: u64, tag: &str) -> Result<()> {
        self.upsert(guild_id, doc! { "tag": tag }).await
    }

    async fn upsert(&self, guild_id: u64, fields: Document) -> Result<()> {
        let filter = doc! { "guild_id": guild_id as i64 };
        let update = doc! {
            "$set": fields,
            "$setOnInsert": { "created_at": mongodb::bson::DateTime::now() },
        };

        self.collection
            .update_one(filter, update)
            .upsert(true)
            .await?;

        self.cache.invalidate(&guild_id);
        debug!("Updated guild directory entry for {guild_id}");
        Ok(())
    }
}
