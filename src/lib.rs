//! # behavior-pipeline
//!
//! In-process request mediator that wraps typed handlers in cross-cutting behaviors
//! chosen by each request type's declared capabilities.
//!
//! ## Overview
//!
//! A request type implements [`Request`] and declares its [`Capabilities`]: cacheable,
//! cache-invalidating, authorizable, rate-limited, circuit-protected, loggable,
//! interval-checked, transactional. The [`Pipeline`] composes the matching behaviors
//! around the registered [`Handler`] once per type, in a fixed order, and reuses that
//! chain for every call.
//!
//! ## Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use behavior_pipeline::{Cacheable, Capabilities, Handler, Pipeline, Request, RequestContext};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct GetBrand { id: u32 }
//!
//! impl Request for GetBrand {
//!     type Response = String;
//!     const CAPABILITIES: Capabilities = Capabilities::CACHEABLE;
//!     fn as_cacheable(&self) -> Option<&dyn Cacheable> { Some(self) }
//! }
//!
//! impl Cacheable for GetBrand {
//!     fn cache_key(&self) -> String { format!("brands:{}", self.id) }
//! }
//!
//! struct GetBrandHandler;
//!
//! #[async_trait]
//! impl Handler<GetBrand> for GetBrandHandler {
//!     async fn handle(&self, req: &GetBrand, _: &RequestContext) -> behavior_pipeline::Result<String> {
//!         Ok(format!("brand #{}", req.id))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> behavior_pipeline::Result<()> {
//! let pipeline = Pipeline::builder()
//!     .handler::<GetBrand, _>(GetBrandHandler)
//!     .build()?;
//!
//! let ctx = RequestContext::new();
//! assert_eq!(pipeline.send(&GetBrand { id: 1 }, &ctx).await?, "brand #1");
//! assert_eq!(pipeline.send(&GetBrand { id: 1 }, &ctx).await?, "brand #1");
//! assert_eq!(pipeline.cache_stats().hits, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`request`] | Request trait, capability set and facet traits |
//! | [`context`] | Per-call identity and cancellation |
//! | [`pipeline`] | Behavior / handler contracts and the composer |
//! | [`cache`] | Read-through caching and group invalidation |
//! | [`resilience`] | Rate limiting and circuit breaking |
//! | [`behaviors`] | Validation, authorization, logging, performance, transactions |
//! | [`store`] | Distributed key/value store contract and in-memory store |
//! | [`config`] | YAML / environment configuration |
//! | [`logging`] | Tracing subscriber setup |

pub mod behaviors;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod request;
pub mod resilience;
pub mod store;

pub use config::PipelineConfig;
pub use context::{Principal, RequestContext};
pub use error::{Error, ErrorContext, StoreError, ValidationErrors};
pub use pipeline::{Behavior, BehaviorChain, Handler, Next, Pipeline, PipelineBuilder};
pub use request::{
    request_name, Authorizable, CacheInvalidating, Cacheable, Capabilities, CircuitProtected,
    IntervalChecked, RateLimited, Request,
};
pub use store::{DistributedStore, MemoryStore};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
