//! Read-through caching behavior.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::group::CacheGroups;
use super::stats::CacheCounters;
use crate::context::RequestContext;
use crate::pipeline::{Behavior, Next};
use crate::request::{request_name, Request};
use crate::store::DistributedStore;
use crate::{Error, Result};

/// Serves cacheable requests from the store and populates it on a miss.
///
/// - bypass: the continuation runs and the store is neither read nor written
/// - hit: the stored response is returned and the continuation does not run
/// - miss: the continuation runs; only a successful response is written, then the
///   key joins its group when one is declared
pub struct CachingBehavior {
    store: Arc<dyn DistributedStore>,
    groups: CacheGroups,
    counters: Arc<CacheCounters>,
    default_sliding_expiration: Duration,
}

impl CachingBehavior {
    pub fn new(
        store: Arc<dyn DistributedStore>,
        counters: Arc<CacheCounters>,
        default_sliding_expiration: Duration,
    ) -> Self {
        Self {
            groups: CacheGroups::new(store.clone(), counters.clone()),
            store,
            counters,
            default_sliding_expiration,
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, key: &str, bytes: &[u8]) -> Result<T> {
        if bytes.is_empty() {
            self.counters.error();
            return Err(Error::Deserialization {
                key: key.to_string(),
                message: "cached payload is empty".to_string(),
            });
        }
        serde_json::from_slice(bytes).map_err(|e| {
            self.counters.error();
            Error::Deserialization {
                key: key.to_string(),
                message: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for CachingBehavior {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response> {
        let cacheable = request
            .as_cacheable()
            .ok_or_else(|| Error::missing_facet(request_name::<R>(), "cacheable"))?;

        if cacheable.bypass_cache() {
            self.counters.bypass();
            return next.run(request, ctx).await;
        }

        let key = cacheable.cache_key();
        ctx.ensure_active()?;
        if let Some(bytes) = self.store.get(&key).await? {
            let response = self.decode(&key, &bytes)?;
            self.counters.hit();
            tracing::info!(cache_key = %key, "Fetched from cache");
            return Ok(response);
        }
        self.counters.miss();

        let response = next.run(request, ctx).await?;

        let sliding = cacheable
            .sliding_expiration()
            .unwrap_or(self.default_sliding_expiration);
        let payload = serde_json::to_vec(&response)?;

        // The entry and its group bookkeeping are written as one unit: once the entry
        // is in the store, cancellation must not keep it out of its group.
        ctx.ensure_active()?;
        self.store.set(&key, &payload, sliding).await?;
        self.counters.write();
        tracing::info!(cache_key = %key, sliding_expiration_secs = sliding.as_secs(), "Added to cache");

        if let Some(group) = cacheable.cache_group_key() {
            self.groups.add_member(&group, &key, sliding).await?;
        }

        Ok(response)
    }

    fn name(&self) -> &'static str {
        "caching"
    }
}
