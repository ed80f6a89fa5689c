//! Typed cache handle over Moka.

use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

use super::CacheConfig;

/// A typed handle over one Moka cache.
///
/// Safe for unbounded concurrent access; no read ever observes a torn
/// write. Cloning is cheap and shares the underlying cache. Values are
/// returned by clone, so a caller can never mutate a cached entry through
/// what `get` hands back.
pub struct TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Cache<K, V>>,
    name: Arc<str>,
}

// Cloning must not require K: Clone or V: Clone bounds on callers.
impl<K, V> Clone for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            inner: Arc::new(builder.build()),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// A copy of the cached value, when present and unexpired. Reading
    /// resets the entry's idle clock.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Remove a key immediately.
    pub fn invalidate(&self, key: &K) {
        self.inner.invalidate(key);
    }
}

impl<K, V> std::fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("name", &self.name)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_a_copy() {
        let cache: TypedCache<u64, Vec<u64>> = TypedCache::new("test", CacheConfig::default());
        cache.insert(1, vec![1, 2]);

        let mut copy = cache.get(&1).unwrap();
        copy.push(3);

        assert_eq!(cache.get(&1).unwrap(), vec![1, 2]);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache: TypedCache<u64, u64> = TypedCache::new("test", CacheConfig::default());
        cache.insert(1, 10);
        cache.invalidate(&1);
        assert_eq!(cache.get(&1), None);
    }
}
