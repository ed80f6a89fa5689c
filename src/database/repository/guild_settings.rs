//! Guild settings repository.
//!
//! The only surface other subsystems use to read or change a guild's
//! configuration. Reads go through a sliding-expiry cache; writes go
//! through the store's revision-guarded conditional replace and append an
//! audit snapshot. First-ever access seeds the guild from the default
//! template.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::config::GuildDefaults;
use crate::database::models::{
    GuildConfig, RestrictedAccessSettings, Revision, SettingsHistoryEntry,
};
use crate::database::store::SettingsStore;
use crate::error::{Result, SettingsError};

/// Cached document plus the revision it was read at. The revision rides
/// along so a later conditional write can be keyed on what the reader saw.
#[derive(Clone)]
struct CachedSettings {
    config: GuildConfig,
    revision: Revision,
}

/// Repository for per-guild configuration documents.
#[derive(Clone)]
pub struct GuildSettingsRepo<S> {
    store: S,
    cache: TypedCache<u64, CachedSettings>,
    defaults: GuildDefaults,
}

impl<S: SettingsStore> GuildSettingsRepo<S> {
    pub fn new(store: S, cache: &CacheRegistry, defaults: GuildDefaults) -> Self {
        let cache = cache.get_or_create(
            "guild_settings",
            CacheConfig::with_capacity(5_000).tti(Duration::from_secs(600)),
        );

        Self {
            store,
            cache,
            defaults,
        }
    }

    /// Current configuration for a guild.
    ///
    /// Never fails for a guild that has no row yet: the first access
    /// persists a copy of the default template and returns it. The caller
    /// gets its own copy; mutating it in place affects nothing until it is
    /// written back through [`update`](Self::update) or
    /// [`patch`](Self::patch).
    pub async fn get(&self, guild_id: u64) -> Result<GuildConfig> {
        Ok(self.entry(guild_id).await?.config)
    }

    /// Replace a guild's configuration wholesale.
    ///
    /// The write is keyed on the revision current at call time; a
    /// concurrent editor's commit in between surfaces as
    /// [`SettingsError::ConcurrencyConflict`] and nothing is written.
    /// Creates the row when the guild has never been seeded.
    pub async fn update(
        &self,
        guild_id: u64,
        next: GuildConfig,
        changed_by: Option<&str>,
    ) -> Result<()> {
        match self.store.load(guild_id).await? {
            Some(row) => self.commit(guild_id, next, row.revision, changed_by).await,
            None => self.create(guild_id, next, changed_by).await,
        }
    }

    /// Read-modify-write convenience: fetch, copy, apply `mutate`, write
    /// back conditionally on the revision the read observed.
    ///
    /// Two racing patches on one guild resolve to exactly one winner; the
    /// loser gets [`SettingsError::ConcurrencyConflict`] and must be
    /// re-invoked by its caller. There is no retry in here.
    pub async fn patch<F>(
        &self,
        guild_id: u64,
        mutate: F,
        changed_by: Option<&str>,
    ) -> Result<GuildConfig>
    where
        F: FnOnce(&mut GuildConfig),
    {
        let CachedSettings {
            mut config,
            revision,
        } = self.entry(guild_id).await?;

        mutate(&mut config);

        self.commit(guild_id, config.clone(), revision, changed_by)
            .await?;

        Ok(config)
    }

    /// Restricted-access settings only.
    ///
    /// The banner pointer inside changes on nearly every access-mode
    /// toggle, far more often than the rest of the document; callers get a
    /// scoped read instead of reconstructing the whole shape.
    pub async fn restricted_access(&self, guild_id: u64) -> Result<RestrictedAccessSettings> {
        Ok(self.get(guild_id).await?.verification.restricted_access)
    }

    /// Repoint (or clear) the restricted-access banner message.
    pub async fn set_restricted_access(
        &self,
        guild_id: u64,
        channel_id: Option<u64>,
        message_id: Option<u64>,
        changed_by: Option<&str>,
    ) -> Result<()> {
        self.patch(
            guild_id,
            |config| {
                config.verification.restricted_access.channel_id = channel_id;
                config.verification.restricted_access.message_id = message_id;
            },
            changed_by,
        )
        .await?;

        Ok(())
    }

    /// Drop the cached entry so the next read goes back to storage. For
    /// callers that know the document changed through a side channel.
    pub fn invalidate(&self, guild_id: u64) {
        self.cache.invalidate(&guild_id);
    }

    /// Most recent audit snapshots, newest first.
    pub async fn history(&self, guild_id: u64, take: usize) -> Result<Vec<SettingsHistoryEntry>> {
        self.store.history(guild_id, take).await
    }

    /// Cached document plus revision, loading and seeding as needed.
    async fn entry(&self, guild_id: u64) -> Result<CachedSettings> {
        if let Some(entry) = self.cache.get(&guild_id) {
            return Ok(entry);
        }

        match self.store.load(guild_id).await? {
            Some(row) => {
                let entry = CachedSettings {
                    config: decode(guild_id, &row.json)?,
                    revision: row.revision,
                };
                self.cache.insert(guild_id, entry.clone());
                Ok(entry)
            }
            None => self.seed(guild_id).await,
        }
    }

    /// First access for a guild: persist a copy of the default template.
    ///
    /// Two concurrent first reads may race the insert; the loser adopts
    /// the winner's row, so neither caller sees an error and exactly one
    /// row exists.
    async fn seed(&self, guild_id: u64) -> Result<CachedSettings> {
        let mut config = self.defaults.template().clone();
        config.ensure_defaults();
        let json = encode(&config)?;

        match self
            .store
            .insert(guild_id, config.schema_version, json)
            .await
        {
            Ok(revision) => {
                debug!("Seeded default settings for guild {guild_id}");
                let entry = CachedSettings { config, revision };
                self.cache.insert(guild_id, entry.clone());
                Ok(entry)
            }
            Err(SettingsError::AlreadyExists(_)) => {
                let row = self
                    .store
                    .load(guild_id)
                    .await?
                    .ok_or(SettingsError::NotFound(guild_id))?;
                let entry = CachedSettings {
                    config: decode(guild_id, &row.json)?,
                    revision: row.revision,
                };
                self.cache.insert(guild_id, entry.clone());
                Ok(entry)
            }
            Err(err) => Err(err),
        }
    }

    /// Create the row for a guild that was never seeded.
    async fn create(
        &self,
        guild_id: u64,
        mut next: GuildConfig,
        changed_by: Option<&str>,
    ) -> Result<()> {
        next.ensure_defaults();
        let json = encode(&next)?;

        let revision = match self
            .store
            .insert(guild_id, next.schema_version, json.clone())
            .await
        {
            Ok(revision) => revision,
            // A row appeared since our load; the edit raced a creator.
            Err(SettingsError::AlreadyExists(_)) => {
                return Err(SettingsError::ConcurrencyConflict(guild_id));
            }
            Err(err) => return Err(err),
        };

        self.record_write(guild_id, json, next, revision, changed_by)
            .await;
        Ok(())
    }

    /// Conditional write plus the bookkeeping shared by `update` and
    /// `patch`.
    async fn commit(
        &self,
        guild_id: u64,
        mut next: GuildConfig,
        expected: Revision,
        changed_by: Option<&str>,
    ) -> Result<()> {
        next.ensure_defaults();
        let json = encode(&next)?;

        let revision = self
            .store
            .compare_and_swap(guild_id, next.schema_version, json.clone(), expected)
            .await?;

        self.record_write(guild_id, json, next, revision, changed_by)
            .await;
        Ok(())
    }

    /// Audit append and cache refresh after a successful primary write.
    async fn record_write(
        &self,
        guild_id: u64,
        json: String,
        next: GuildConfig,
        revision: Revision,
        changed_by: Option<&str>,
    ) {
        let entry = SettingsHistoryEntry {
            id: None,
            guild_id,
            json,
            changed_by: changed_by.map(str::to_owned),
            changed_at: Utc::now(),
        };

        // The primary write already succeeded; a failed audit append must
        // not undo it.
        if let Err(err) = self.store.append_history(entry).await {
            warn!("Failed to append settings history for guild {guild_id}: {err}");
        }

        self.cache.invalidate(&guild_id);
        // `next` was moved in; no caller holds a handle to what the cache
        // now stores.
        self.cache.insert(guild_id, CachedSettings { config: next, revision });
        debug!("Updated settings for guild {guild_id} at revision {revision}");
    }
}

/// Deserialize a stored blob and run the defaulting repair pass.
fn decode(guild_id: u64, json: &str) -> Result<GuildConfig> {
    let mut config: GuildConfig = serde_json::from_str(json)
        .map_err(|source| SettingsError::MalformedDocument { guild_id, source })?;
    config.ensure_defaults();
    Ok(config)
}

fn encode(config: &GuildConfig) -> Result<String> {
    Ok(serde_json::to_string(config)?)
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;

    use crate::database::models::RoleSet;
    use crate::database::store::MemorySettingsStore;

    use super::*;

    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });

    fn repo_with_store() -> (GuildSettingsRepo<MemorySettingsStore>, MemorySettingsStore) {
        Lazy::force(&TRACING);
        let store = MemorySettingsStore::new();
        let registry = CacheRegistry::new();
        let repo = GuildSettingsRepo::new(store.clone(), &registry, GuildDefaults::default());
        (repo, store)
    }

    /// A second repository over the same store with its own independent
    /// cache, standing in for another concurrently running editor.
    fn second_editor(store: &MemorySettingsStore) -> GuildSettingsRepo<MemorySettingsStore> {
        GuildSettingsRepo::new(store.clone(), &CacheRegistry::new(), GuildDefaults::default())
    }

    fn ally_set(generic: u64) -> RoleSet {
        RoleSet {
            name: "Ally".into(),
            generic: Some(generic),
            ..RoleSet::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_first_reads_seed_exactly_once() {
        let (repo, store) = repo_with_store();

        let (left, right) = {
            let a = repo.clone();
            let b = repo.clone();
            tokio::join!(
                tokio::spawn(async move { a.get(1).await }),
                tokio::spawn(async move { b.get(1).await }),
            )
        };

        let left = left.unwrap().unwrap();
        let right = right.unwrap().unwrap();

        assert_eq!(left, right);
        assert_eq!(store.insert_count(), 1);
    }

    #[tokio::test]
    async fn losing_the_seed_race_adopts_the_winning_row() {
        let (repo, store) = repo_with_store();

        // Another instance created the row first, with content that differs
        // from the default template.
        store.put_raw(1, 1, r#"{"schemaVersion":1,"roleSets":[{"name":"Ally"}]}"#);

        let config = repo.get(1).await.unwrap();
        assert!(config.role_set("ally").is_some());
        assert_eq!(store.insert_count(), 0);
    }

    #[tokio::test]
    async fn get_seeds_from_the_default_template() {
        let (repo, store) = repo_with_store();

        let config = repo.get(42).await.unwrap();
        assert_eq!(config, GuildConfig::default());

        // Seeding persisted the row, so a cold read sees the same document.
        let row = store.load(42).await.unwrap().unwrap();
        let stored: GuildConfig = serde_json::from_str(&row.json).unwrap();
        assert_eq!(stored, config);
    }

    #[tokio::test]
    async fn update_then_get_returns_the_new_document() {
        let (repo, _store) = repo_with_store();

        let mut next = repo.get(5).await.unwrap();
        next.verification.review_channel_id = Some(777);
        next.upsert_role_set(ally_set(555));

        repo.update(5, next.clone(), Some("admin#1")).await.unwrap();

        // Served from cache.
        assert_eq!(repo.get(5).await.unwrap(), next);

        // And from storage after an invalidation.
        repo.invalidate(5);
        assert_eq!(repo.get(5).await.unwrap(), next);
    }

    #[tokio::test]
    async fn update_creates_the_row_when_absent() {
        let (repo, store) = repo_with_store();

        let mut next = GuildConfig::default();
        next.verification.image_url = Some("https://example.com/how-to.png".into());

        repo.update(3, next.clone(), None).await.unwrap();

        assert_eq!(store.insert_count(), 1);
        assert_eq!(repo.get(3).await.unwrap(), next);
    }

    #[tokio::test]
    async fn stale_reader_loses_with_concurrency_conflict() {
        let (repo_a, store) = repo_with_store();
        let repo_b = second_editor(&store);

        // Both editors read the document at its initial revision.
        repo_a.get(7).await.unwrap();
        repo_b.get(7).await.unwrap();

        // A commits first.
        let winner = repo_a
            .patch(7, |config| config.upsert_role_set(ally_set(555)), Some("a"))
            .await
            .unwrap();

        // B's write was based on the revision A just replaced.
        let err = repo_b
            .patch(7, |config| config.role_sets.clear(), Some("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::ConcurrencyConflict(7)));

        // The store reflects only A's change.
        let row = store.load(7).await.unwrap().unwrap();
        let stored: GuildConfig = serde_json::from_str(&row.json).unwrap();
        assert_eq!(stored, winner);
    }

    #[tokio::test]
    async fn null_lists_are_repaired_on_read() {
        let (repo, store) = repo_with_store();

        store.put_raw(
            9,
            1,
            r#"{
                "schemaVersion": 0,
                "verification": {
                    "recruitAssignerRoles": null,
                    "restrictedAccess": { "alwaysRestrict": null }
                }
            }"#,
        );

        let config = repo.get(9).await.unwrap();
        assert!(config.verification.recruit_assigner_roles.is_empty());
        assert!(config.verification.ally_assigner_roles.is_empty());
        assert!(config.verification.restricted_access.always_restrict.is_empty());
        assert_eq!(config.schema_version, 1);
    }

    #[tokio::test]
    async fn malformed_document_is_a_hard_error() {
        let (repo, store) = repo_with_store();
        store.put_raw(4, 1, "{ not json");

        let err = repo.get(4).await.unwrap_err();
        assert!(matches!(
            err,
            SettingsError::MalformedDocument { guild_id: 4, .. }
        ));
    }

    #[tokio::test]
    async fn returned_documents_are_isolated_copies() {
        let (repo, _store) = repo_with_store();

        let mut config = repo.get(1).await.unwrap();
        config.verification.recruit_assigner_roles.push(999);
        config.upsert_role_set(ally_set(1));

        // The out-of-band mutation never reached the cache.
        let fresh = repo.get(1).await.unwrap();
        assert!(fresh.verification.recruit_assigner_roles.is_empty());
        assert!(fresh.role_sets.is_empty());
    }

    #[tokio::test]
    async fn banner_pointer_round_trips() {
        let (repo, _store) = repo_with_store();

        repo.set_restricted_access(42, Some(100), Some(200), Some("admin#1"))
            .await
            .unwrap();

        let access = repo.restricted_access(42).await.unwrap();
        assert_eq!(access.channel_id, Some(100));
        assert_eq!(access.message_id, Some(200));

        // Clearing the pointer is the same write in reverse.
        repo.set_restricted_access(42, None, None, Some("admin#1"))
            .await
            .unwrap();
        let cleared = repo.restricted_access(42).await.unwrap();
        assert_eq!(cleared.channel_id, None);
        assert_eq!(cleared.message_id, None);
    }

    #[tokio::test]
    async fn history_records_every_mutation() {
        let (repo, _store) = repo_with_store();

        repo.patch(6, |config| config.upsert_role_set(ally_set(1)), Some("first"))
            .await
            .unwrap();
        repo.patch(6, |config| config.upsert_role_set(ally_set(2)), Some("second"))
            .await
            .unwrap();

        let history = repo.history(6, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        // Newest first.
        assert_eq!(history[0].changed_by.as_deref(), Some("second"));
        assert_eq!(history[1].changed_by.as_deref(), Some("first"));

        let newest: GuildConfig = serde_json::from_str(&history[0].json).unwrap();
        assert_eq!(newest.role_set("ally").unwrap().generic, Some(2));
    }

    #[tokio::test]
    async fn history_append_failure_does_not_block_the_write() {
        let (repo, store) = repo_with_store();

        repo.get(8).await.unwrap();
        store.fail_history_appends(true);

        let mut next = GuildConfig::default();
        next.verification.notification_channel_id = Some(123);
        repo.update(8, next.clone(), Some("admin#1")).await.unwrap();

        // The document took the write even though the audit append failed.
        assert_eq!(repo.get(8).await.unwrap(), next);
        repo.invalidate(8);
        assert_eq!(repo.get(8).await.unwrap(), next);
        assert!(store.history_log().is_empty());
    }

    #[tokio::test]
    async fn patch_returns_the_mutated_document() {
        let (repo, _store) = repo_with_store();

        let patched = repo
            .patch(
                2,
                |config| {
                    config.verification.recruit_assigner_roles.push(11);
                    config.verification.recruit_assigner_roles.push(22);
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(patched.verification.recruit_assigner_roles, vec![11, 22]);
        assert_eq!(repo.get(2).await.unwrap(), patched);
    }
}
