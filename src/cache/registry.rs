//! Central registry for named caches.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{CacheConfig, TypedCache};

/// Registry handing out named [`TypedCache`] instances.
///
/// Each repository asks for its cache by name in its constructor; asking
/// twice for the same name returns the same underlying cache.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

struct CacheEntry {
    cache: Box<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an existing cache by name.
    ///
    /// # Panics
    /// Panics if the cache exists with different key/value types; two
    /// subsystems claiming one name for different shapes is a wiring bug.
    pub fn get<K, V>(&self, name: &str) -> Option<TypedCache<K, V>>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let caches = self.caches.read();

        caches.get(name).map(|entry| {
            if entry.type_id != TypeId::of::<TypedCache<K, V>>() {
                panic!(
                    "cache '{}' type mismatch: expected {}, got {}",
                    name,
                    std::any::type_name::<TypedCache<K, V>>(),
                    entry.type_name
                );
            }
            entry
                .cache
                .downcast_ref::<TypedCache<K, V>>()
                .unwrap()
                .clone()
        })
    }

    /// Get the named cache, creating it with `config` on first request.
    pub fn get_or_create<K, V>(&self, name: &str, config: CacheConfig) -> TypedCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        if let Some(cache) = self.get(name) {
            return cache;
        }

        let mut caches = self.caches.write();

        // A second writer may have created it between our read and write.
        if let Some(entry) = caches.get(name) {
            if entry.type_id != TypeId::of::<TypedCache<K, V>>() {
                panic!(
                    "cache '{}' type mismatch: expected {}, got {}",
                    name,
                    std::any::type_name::<TypedCache<K, V>>(),
                    entry.type_name
                );
            }
            return entry
                .cache
                .downcast_ref::<TypedCache<K, V>>()
                .unwrap()
                .clone();
        }

        debug!("Creating cache: {name}");
        let cache = TypedCache::new(name, config);
        caches.insert(
            name.to_string(),
            CacheEntry {
                cache: Box::new(cache.clone()),
                type_id: TypeId::of::<TypedCache<K, V>>(),
                type_name: std::any::type_name::<TypedCache<K, V>>(),
            },
        );

        cache
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheRegistry")
            .field("cache_count", &caches.len())
            .field("cache_names", &caches.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_same_cache() {
        let registry = CacheRegistry::new();

        let first: TypedCache<u64, String> =
            registry.get_or_create("shared", CacheConfig::default());
        first.insert(1, "a".into());

        let second: TypedCache<u64, String> =
            registry.get_or_create("shared", CacheConfig::default());
        assert_eq!(second.get(&1), Some("a".into()));
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn name_collision_across_types_panics() {
        let registry = CacheRegistry::new();
        let _: TypedCache<u64, String> = registry.get_or_create("shared", CacheConfig::default());
        let _: TypedCache<u64, u64> = registry.get_or_create("shared", CacheConfig::default());
    }
}
