//! Read-through caching built on Moka.
//!
//! Repositories get their caches from a [`CacheRegistry`] constructed once
//! at process start and passed into their constructors -- an ordinary
//! dependency, so a test can build a fresh isolated instance per case.
//!
//! - [`CacheRegistry`] holds all named caches
//! - [`TypedCache`] is a typed handle over one Moka cache
//! - [`CacheConfig`] carries capacity and expiry knobs

mod config;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use registry::CacheRegistry;
pub use typed::TypedCache;
