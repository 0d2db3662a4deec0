//! Cache group bookkeeping.
//!
//! A group is two store records:
//!
//! - `{group}`: JSON array of the cache keys currently in the group
//! - `{group}SlidingExpiration`: JSON integer, the largest sliding expiration (seconds)
//!   any member has asked for
//!
//! Both records are always written with the same sliding expiration so they expire
//! together. The read-modify-write below is not locked: concurrent writers to one
//! group may drop each other's additions, and an invalidation racing a write can let a
//! purged key back into the membership set.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use super::key::group_expiration_key;
use super::stats::CacheCounters;
use crate::store::DistributedStore;
use crate::{Error, Result};

#[derive(Clone)]
pub struct CacheGroups {
    store: Arc<dyn DistributedStore>,
    counters: Arc<CacheCounters>,
}

impl CacheGroups {
    pub fn new(store: Arc<dyn DistributedStore>, counters: Arc<CacheCounters>) -> Self {
        Self { store, counters }
    }

    /// Current members of `group`, or `None` when the group does not exist.
    pub async fn members(&self, group: &str) -> Result<Option<BTreeSet<String>>> {
        match self.store.get(group).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| {
                    self.counters.error();
                    Error::Deserialization {
                        key: group.to_string(),
                        message: e.to_string(),
                    }
                }),
            None => Ok(None),
        }
    }

    /// Group expiration in seconds; an unreadable record counts as unset.
    pub async fn expiration(&self, group: &str) -> Result<Option<u64>> {
        let key = group_expiration_key(group);
        Ok(match self.store.get(&key).await? {
            Some(bytes) => match serde_json::from_slice::<u64>(&bytes) {
                Ok(secs) => Some(secs),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "ignoring unreadable group expiration");
                    None
                }
            },
            None => None,
        })
    }

    /// Adds `key` to `group` and raises the group's expiration to at least `sliding`.
    ///
    /// Returns the group expiration now in effect, in seconds. It never decreases while
    /// the group exists. Runs to completion once started: the caller has already written
    /// `key`, and stopping halfway would leave it outside the group.
    pub async fn add_member(&self, group: &str, key: &str, sliding: Duration) -> Result<u64> {
        let mut members = self.members(group).await?.unwrap_or_default();
        members.insert(key.to_string());

        let requested = sliding.as_secs().max(1);
        let expiration = match self.expiration(group).await? {
            Some(current) => current.max(requested),
            None => requested,
        };
        let ttl = Duration::from_secs(expiration);

        self.store
            .set(group, &serde_json::to_vec(&members)?, ttl)
            .await?;
        self.counters.write();
        tracing::info!(cache_group_key = %group, members = members.len(), "Added to cache group");

        let expiration_key = group_expiration_key(group);
        self.store
            .set(&expiration_key, &serde_json::to_vec(&expiration)?, ttl)
            .await?;
        self.counters.write();
        tracing::info!(
            cache_group_key = %group,
            sliding_expiration_secs = expiration,
            "Added to cache group sliding expiration"
        );

        Ok(expiration)
    }

    /// Removes every member of `group`, then the group's own records.
    ///
    /// Returns how many member keys were removed; `0` when the group does not exist.
    /// Not interrupted by cancellation: it only runs after the invalidating command
    /// has succeeded.
    pub async fn invalidate(&self, group: &str) -> Result<usize> {
        let Some(members) = self.members(group).await? else {
            return Ok(0);
        };

        for key in &members {
            self.store.remove(key).await?;
            self.counters.removal();
            tracing::info!(cache_key = %key, cache_group_key = %group, "Removed from cache");
        }

        self.store.remove(group).await?;
        self.counters.removal();
        self.store.remove(&group_expiration_key(group)).await?;
        self.counters.removal();
        tracing::info!(cache_group_key = %group, removed = members.len(), "Removed cache group");

        Ok(members.len())
    }
}
