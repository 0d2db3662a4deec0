//! Cache invalidation behavior.

use async_trait::async_trait;
use std::sync::Arc;

use super::group::CacheGroups;
use super::stats::CacheCounters;
use crate::context::RequestContext;
use crate::pipeline::{Behavior, Next};
use crate::request::{request_name, Request};
use crate::store::DistributedStore;
use crate::{Error, Result};

/// Invalidates a key and/or a whole group after the wrapped command succeeds.
///
/// A failing command leaves the cache untouched. With bypass set nothing is removed.
pub struct CacheRemovingBehavior {
    store: Arc<dyn DistributedStore>,
    groups: CacheGroups,
    counters: Arc<CacheCounters>,
}

impl CacheRemovingBehavior {
    pub fn new(store: Arc<dyn DistributedStore>, counters: Arc<CacheCounters>) -> Self {
        Self {
            groups: CacheGroups::new(store.clone(), counters.clone()),
            store,
            counters,
        }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for CacheRemovingBehavior {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response> {
        let invalidating = request
            .as_cache_invalidating()
            .ok_or_else(|| Error::missing_facet(request_name::<R>(), "cache_invalidating"))?;

        if invalidating.bypass_cache() {
            self.counters.bypass();
            return next.run(request, ctx).await;
        }

        let response = next.run(request, ctx).await?;

        // The command has been applied; finish invalidating even if the call is
        // cancelled from here on.
        if let Some(group) = invalidating.cache_group_key() {
            self.groups.invalidate(&group).await?;
        }

        if let Some(key) = invalidating.cache_key() {
            self.store.remove(&key).await?;
            self.counters.removal();
            tracing::info!(cache_key = %key, "Removed from cache");
        }

        Ok(response)
    }

    fn name(&self) -> &'static str {
        "cache_removing"
    }
}
