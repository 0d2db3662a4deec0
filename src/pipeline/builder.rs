use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{Erased, Handler, Pipeline};
use crate::behaviors::{NoopTransactions, TransactionProvider, Validator};
use crate::cache::CacheCounters;
use crate::config::PipelineConfig;
use crate::request::{request_name, Request};
use crate::resilience::{CircuitRegistry, RateCounters};
use crate::store::{DistributedStore, MemoryStore};
use crate::Result;

/// Builder for [`Pipeline`].
///
/// Without [`with_store`](Self::with_store) the pipeline gets a [`MemoryStore`] sized
/// by `cache.max_entries`; without [`with_transactions`](Self::with_transactions),
/// transactional requests run under [`NoopTransactions`].
pub struct PipelineBuilder {
    store: Option<Arc<dyn DistributedStore>>,
    config: PipelineConfig,
    transactions: Arc<dyn TransactionProvider>,
    validators: HashMap<TypeId, Erased>,
    handlers: HashMap<TypeId, Erased>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            config: PipelineConfig::default(),
            transactions: Arc::new(NoopTransactions),
            validators: HashMap::new(),
            handlers: HashMap::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn DistributedStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_transactions(mut self, provider: Arc<dyn TransactionProvider>) -> Self {
        self.transactions = provider;
        self
    }

    /// Registers the handler for `R`, replacing any earlier one.
    pub fn handler<R, H>(self, handler: H) -> Self
    where
        R: Request,
        H: Handler<R> + 'static,
    {
        self.shared_handler::<R>(Arc::new(handler))
    }

    pub fn shared_handler<R: Request>(mut self, handler: Arc<dyn Handler<R>>) -> Self {
        if self
            .handlers
            .insert(TypeId::of::<R>(), Box::new(handler))
            .is_some()
        {
            tracing::warn!(request_type = request_name::<R>(), "Replacing registered handler");
        }
        self
    }

    /// Adds a validator for `R`; all validators of a type run on every call.
    pub fn validator<R, V>(mut self, validator: V) -> Self
    where
        R: Request,
        V: Validator<R> + 'static,
    {
        let slot = self
            .validators
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(Vec::<Arc<dyn Validator<R>>>::new()));
        if let Some(list) = slot.downcast_mut::<Vec<Arc<dyn Validator<R>>>>() {
            list.push(Arc::new(validator));
        }
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new(self.config.cache.max_entries)));

        tracing::debug!(
            store = store.name(),
            handlers = self.handlers.len(),
            validated_types = self.validators.len(),
            "Building pipeline"
        );

        Ok(Pipeline {
            store,
            config: self.config,
            counters: Arc::new(CacheCounters::new()),
            rate_counters: Arc::new(RateCounters::new()),
            circuits: Arc::new(CircuitRegistry::new()),
            transactions: self.transactions,
            validators: self.validators,
            handlers: self.handlers,
            chains: RwLock::new(HashMap::new()),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
