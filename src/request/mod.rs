//! Request contracts: the request trait and the capability facets a request type may
//! implement.
//!
//! A request type declares which facets it carries through [`Request::CAPABILITIES`]
//! and exposes the facet parameters through the `as_*` accessors. The pipeline reads
//! the capability set once per type to decide which behaviors wrap its handler.
//!
//! | Facet | Behavior it enables |
//! |-------|---------------------|
//! | [`Cacheable`] | read-through caching with group bookkeeping |
//! | [`CacheInvalidating`] | key and group invalidation after success |
//! | [`Authorizable`] | identity and role checks |
//! | [`RateLimited`] | per-type fixed-window limiting |
//! | [`CircuitProtected`] | per-type circuit breaking |
//! | [`IntervalChecked`] | slow-call reporting |
//! | `LOGGABLE` | structured request logging |
//! | `TRANSACTIONAL` | transactional scope around the handler |
//!
//! ```rust
//! use behavior_pipeline::request::{Cacheable, Capabilities, Request};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct GetProducts { page: u32 }
//!
//! impl Request for GetProducts {
//!     type Response = Vec<String>;
//!     const CAPABILITIES: Capabilities = Capabilities::CACHEABLE;
//!
//!     fn as_cacheable(&self) -> Option<&dyn Cacheable> { Some(self) }
//! }
//!
//! impl Cacheable for GetProducts {
//!     fn cache_key(&self) -> String { format!("products:list:p{}", self.page) }
//!     fn cache_group_key(&self) -> Option<String> { Some("products".into()) }
//! }
//! ```

mod capabilities;

pub use capabilities::Capabilities;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// A typed unit of work routed through the pipeline.
pub trait Request: Serialize + Send + Sync + 'static {
    /// What the terminal handler produces. Serializable so it can be cached.
    type Response: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Facets this type implements.
    const CAPABILITIES: Capabilities = Capabilities::NONE;

    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        None
    }

    fn as_cache_invalidating(&self) -> Option<&dyn CacheInvalidating> {
        None
    }

    fn as_authorizable(&self) -> Option<&dyn Authorizable> {
        None
    }

    fn as_rate_limited(&self) -> Option<&dyn RateLimited> {
        None
    }

    fn as_circuit_protected(&self) -> Option<&dyn CircuitProtected> {
        None
    }

    fn as_interval_checked(&self) -> Option<&dyn IntervalChecked> {
        None
    }
}

/// Read-through cached query.
pub trait Cacheable: Sync {
    /// Unique per distinct query.
    fn cache_key(&self) -> String;

    fn bypass_cache(&self) -> bool {
        false
    }

    /// Group this entry joins so it can be invalidated with its siblings.
    fn cache_group_key(&self) -> Option<String> {
        None
    }

    /// Falls back to the configured default when `None`.
    fn sliding_expiration(&self) -> Option<Duration> {
        None
    }
}

/// Command that invalidates cached entries once it succeeds.
pub trait CacheInvalidating: Sync {
    fn cache_key(&self) -> Option<String> {
        None
    }

    fn cache_group_key(&self) -> Option<String> {
        None
    }

    fn bypass_cache(&self) -> bool {
        false
    }
}

/// Request that requires an authenticated caller.
pub trait Authorizable: Sync {
    /// Empty means "authenticated only".
    fn roles(&self) -> &[&str] {
        &[]
    }
}

pub trait RateLimited: Sync {
    /// Calls allowed per window; must be positive.
    fn request_limit(&self) -> u32;
    fn time_window(&self) -> Duration;
}

pub trait CircuitProtected: Sync {
    /// Consecutive failures that open the circuit; at least 1.
    fn exceptions_allowed_before_breaking(&self) -> u32;
    fn duration_of_break(&self) -> Duration;
}

pub trait IntervalChecked: Sync {
    /// Calls slower than this are reported.
    fn interval(&self) -> Duration;
}

/// Unqualified type name of a request, e.g. `GetProducts`.
///
/// Only the outer path is stripped; generic arguments are kept as the compiler renders them.
pub fn request_name<R: ?Sized>() -> &'static str {
    let full = std::any::type_name::<R>();
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
