//! Resilience behaviors: per-type rate limiting and circuit breaking.
//!
//! # Resilience Module
//!
//! Both behaviors keep process-wide state keyed by request type, passed in explicitly
//! by the [`Pipeline`](crate::pipeline::Pipeline) that owns it.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter`] | Fixed-window counters and the rate limiting behavior |
//! | [`circuit_breaker`] | Closed / open / half-open breaker shared per request type |
//!
//! ## Rate Limiting
//!
//! The window for `RateLimit:{TypeName}` opens on the first call and closes
//! `time_window` later, whatever happens in between:
//!
//! ```rust
//! use behavior_pipeline::resilience::rate_limiter::{Admission, RateCounters};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let counters = RateCounters::new();
//! let window = Duration::from_secs(60);
//! assert_eq!(counters.try_acquire("RateLimit:GetProducts", 1, window).await, Admission::Admitted(1));
//! assert!(matches!(
//!     counters.try_acquire("RateLimit:GetProducts", 1, window).await,
//!     Admission::Rejected(_)
//! ));
//! # }
//! ```
//!
//! ## Circuit Breaker
//!
//! ```rust
//! use behavior_pipeline::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(
//!     "GetProducts",
//!     CircuitBreakerConfig::new()
//!         .with_failure_threshold(2)
//!         .with_break_duration(Duration::from_secs(30)),
//! );
//! breaker.on_failure();
//! breaker.on_failure();
//! assert_eq!(breaker.state(), CircuitState::Open);
//! assert!(breaker.allow().is_err());
//! ```

pub mod circuit_breaker;
pub mod rate_limiter;

pub use circuit_breaker::{CircuitBreakerBehavior, CircuitRegistry};
pub use rate_limiter::{RateCounters, RateLimitingBehavior};
