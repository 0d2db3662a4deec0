//! Pipeline composer: wraps each registered handler in the behaviors its request type
//! asks for.
//!
//! # Pipeline Module
//!
//! A [`Pipeline`] owns every piece of shared state the behaviors need (store, rate
//! windows, circuits, transaction provider) together with the registered handlers and
//! validators. The chain for a request type is composed on its first
//! [`send`](Pipeline::send) and cached by `TypeId`; later calls reuse it.
//!
//! ## Composition Order
//!
//! ```text
//! Authorization → RateLimit → CircuitBreaker → Validation → Caching / CacheRemoving
//!     → Performance → Logging → Transaction → handler
//! ```
//!
//! Each stage is present only when the request type declares the matching
//! [`Capabilities`] bit (validation: when validators are registered). The transaction
//! wraps the handler alone, so cache writes are never part of a rolled-back scope.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Pipeline`] | Dispatches requests through their cached chains |
//! | [`PipelineBuilder`] | Registers handlers, validators and shared services |
//! | [`Behavior`] | One cross-cutting step |
//! | [`Handler`] | Terminal business logic for one request type |
//! | [`Next`] | Continuation handed to each behavior |
//! | [`BehaviorChain`] | Ordered behaviors for one request type |

mod behavior;
mod builder;

pub use behavior::{Behavior, BehaviorChain, Handler, Next};
pub use builder::PipelineBuilder;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::behaviors::{
    AuthorizationBehavior, LoggingBehavior, PerformanceBehavior, TransactionBehavior,
    TransactionProvider, ValidationBehavior, Validator,
};
use crate::cache::{CacheCounters, CacheRemovingBehavior, CacheStats, CachingBehavior};
use crate::config::PipelineConfig;
use crate::context::RequestContext;
use crate::request::{request_name, Capabilities, Request};
use crate::resilience::circuit_breaker::CircuitBreakerSnapshot;
use crate::resilience::rate_limiter::RateWindowSnapshot;
use crate::resilience::{CircuitBreakerBehavior, CircuitRegistry, RateCounters, RateLimitingBehavior};
use crate::store::DistributedStore;
use crate::{Error, ErrorContext, Result};

type Erased = Box<dyn Any + Send + Sync>;

/// Mediator that routes each request through its behavior chain to its handler.
pub struct Pipeline {
    store: Arc<dyn DistributedStore>,
    config: PipelineConfig,
    counters: Arc<CacheCounters>,
    rate_counters: Arc<RateCounters>,
    circuits: Arc<CircuitRegistry>,
    transactions: Arc<dyn TransactionProvider>,
    /// `TypeId::of::<R>()` -> `Vec<Arc<dyn Validator<R>>>`
    validators: HashMap<TypeId, Erased>,
    /// `TypeId::of::<R>()` -> `Arc<dyn Handler<R>>`
    handlers: HashMap<TypeId, Erased>,
    /// `TypeId::of::<R>()` -> `Arc<BehaviorChain<R>>`
    chains: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs `request` through its chain and handler.
    pub async fn send<R: Request>(&self, request: &R, ctx: &RequestContext) -> Result<R::Response> {
        let handler = self.handler::<R>()?;
        let chain = self.chain::<R>();
        tracing::trace!(
            request_id = %ctx.request_id(),
            request_type = request_name::<R>(),
            behaviors = chain.len(),
            "Dispatching request"
        );
        chain.execute(request, handler.as_ref(), ctx).await
    }

    /// Behavior names for `R`, outermost first.
    pub fn chain_names<R: Request>(&self) -> Vec<&'static str> {
        self.chain::<R>().names()
    }

    pub fn has_handler<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Breaker state for a request type, by its unqualified name; `None` until first use.
    pub fn circuit_snapshot(&self, request_type: &str) -> Option<CircuitBreakerSnapshot> {
        self.circuits.get(request_type).map(|b| b.snapshot())
    }

    /// Current rate window for `R`; `None` when no window is open.
    pub async fn rate_window<R: Request>(&self) -> Option<RateWindowSnapshot> {
        self.rate_counters
            .snapshot(&RateLimitingBehavior::key_for::<R>())
            .await
    }

    pub fn store(&self) -> &Arc<dyn DistributedStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn handler<R: Request>(&self) -> Result<Arc<dyn Handler<R>>> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|h| h.downcast_ref::<Arc<dyn Handler<R>>>())
            .cloned()
            .ok_or_else(|| {
                Error::configuration_with_context(
                    format!("no handler registered for {}", request_name::<R>()),
                    ErrorContext::new()
                        .with_field_path(request_name::<R>())
                        .with_source("pipeline_composer"),
                )
            })
    }

    fn chain<R: Request>(&self) -> Arc<BehaviorChain<R>> {
        let key = TypeId::of::<R>();
        let cached = self
            .chains
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned();
        if let Some(chain) = cached.and_then(|c| c.downcast::<BehaviorChain<R>>().ok()) {
            return chain;
        }

        let chain = Arc::new(self.compose::<R>());
        let mut chains = self.chains.write().unwrap_or_else(|e| e.into_inner());
        // A concurrent first call may have won; keep whichever landed first.
        let entry = chains
            .entry(key)
            .or_insert_with(|| chain.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        entry.downcast::<BehaviorChain<R>>().unwrap_or(chain)
    }

    fn compose<R: Request>(&self) -> BehaviorChain<R> {
        let caps = R::CAPABILITIES;
        let mut chain = BehaviorChain::new();

        if caps.contains(Capabilities::AUTHORIZABLE) {
            chain = chain.add(Arc::new(AuthorizationBehavior));
        }
        if caps.contains(Capabilities::RATE_LIMITED) {
            chain = chain.add(Arc::new(RateLimitingBehavior::new(self.rate_counters.clone())));
        }
        if caps.contains(Capabilities::CIRCUIT_PROTECTED) {
            chain = chain.add(Arc::new(CircuitBreakerBehavior::new(self.circuits.clone())));
        }
        let validators = self.validators_for::<R>();
        if !validators.is_empty() {
            chain = chain.add(Arc::new(ValidationBehavior::new(validators)));
        }
        if caps.contains(Capabilities::CACHEABLE) {
            chain = chain.add(Arc::new(CachingBehavior::new(
                self.store.clone(),
                self.counters.clone(),
                self.config.cache.sliding_expiration(),
            )));
        }
        if caps.contains(Capabilities::CACHE_INVALIDATING) {
            chain = chain.add(Arc::new(CacheRemovingBehavior::new(
                self.store.clone(),
                self.counters.clone(),
            )));
        }
        if caps.contains(Capabilities::INTERVAL_CHECKED) {
            chain = chain.add(Arc::new(PerformanceBehavior));
        }
        if caps.contains(Capabilities::LOGGABLE) {
            chain = chain.add(Arc::new(LoggingBehavior));
        }
        if caps.contains(Capabilities::TRANSACTIONAL) {
            chain = chain.add(Arc::new(TransactionBehavior::new(self.transactions.clone())));
        }

        tracing::debug!(
            request_type = request_name::<R>(),
            capabilities = ?caps,
            behaviors = ?chain.names(),
            "Composed behavior chain"
        );
        chain
    }

    fn validators_for<R: Request>(&self) -> Vec<Arc<dyn Validator<R>>> {
        self.validators
            .get(&TypeId::of::<R>())
            .and_then(|v| v.downcast_ref::<Vec<Arc<dyn Validator<R>>>>())
            .cloned()
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
