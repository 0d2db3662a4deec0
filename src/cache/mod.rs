//! Cache behaviors: read-through caching with group-aware invalidation.
//!
//! # Cache Module
//!
//! Queries that implement [`Cacheable`](crate::request::Cacheable) are answered from the
//! [`DistributedStore`](crate::store::DistributedStore) when possible; commands that
//! implement [`CacheInvalidating`](crate::request::CacheInvalidating) clear single keys
//! or whole groups once they succeed.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CachingBehavior`] | Read-through cache, writes only successful responses |
//! | [`CacheRemovingBehavior`] | Key and group invalidation after success |
//! | [`CacheGroups`] | Group membership and sliding-expiration bookkeeping |
//! | [`CacheKeyBuilder`] | Content-addressed keys from a request's JSON |
//! | [`CacheStats`] | Hit / miss / write / removal counters |
//!
//! ## Store Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `{cache_key}` | JSON of the response |
//! | `{group}` | JSON array of member cache keys |
//! | `{group}SlidingExpiration` | JSON integer, seconds |
//!
//! A group's expiration is the largest sliding expiration any member requested, and the
//! group record and its expiration record are written with that same TTL.

mod caching;
mod group;
mod key;
mod removing;
mod stats;

pub use caching::CachingBehavior;
pub use group::CacheGroups;
pub use key::{group_expiration_key, CacheKeyBuilder, GROUP_EXPIRATION_SUFFIX};
pub use removing::CacheRemovingBehavior;
pub use stats::{CacheCounters, CacheStats};
