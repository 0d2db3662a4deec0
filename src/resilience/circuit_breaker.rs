use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::context::RequestContext;
use crate::pipeline::{Behavior, Next};
use crate::request::{request_name, Request};
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub failure_threshold: u32,
    pub break_duration_ms: u64,
    pub consecutive_failures: u32,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            break_duration: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_break_duration(mut self, duration: Duration) -> Self {
        self.break_duration = duration;
        self
    }
}

#[derive(Debug)]
struct State {
    circuit: CircuitState,
    consecutive_failures: u32,
    open_until: Option<Instant>,
    trial_in_flight: bool,
}

/// Consecutive-failure circuit breaker.
///
/// - Closed: calls pass; `failure_threshold` consecutive failures open the circuit
/// - Open: calls are rejected until `break_duration` has elapsed
/// - HalfOpen: exactly one trial call is let through; success closes the circuit,
///   failure opens it again
pub struct CircuitBreaker {
    name: String,
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, cfg: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            cfg,
            state: Mutex::new(State {
                circuit: CircuitState::Closed,
                consecutive_failures: 0,
                open_until: None,
                trial_in_flight: false,
            }),
        }
    }

    // State is plain counters; a panic while holding the lock cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn rejected(&self, remaining: Duration) -> Error {
        Error::CircuitOpen {
            request_type: self.name.clone(),
            remaining_ms: remaining.as_millis() as u64,
        }
    }

    /// Admits a call or fails with [`Error::CircuitOpen`].
    pub fn allow(&self) -> Result<()> {
        let mut st = self.lock();
        match st.circuit {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let now = Instant::now();
                match st.open_until {
                    Some(until) if now < until => Err(self.rejected(until - now)),
                    _ => {
                        st.circuit = CircuitState::HalfOpen;
                        st.trial_in_flight = true;
                        tracing::info!(circuit = %self.name, "Circuit half-open, admitting trial call");
                        Ok(())
                    }
                }
            }
            CircuitState::HalfOpen if st.trial_in_flight => Err(self.rejected(Duration::ZERO)),
            CircuitState::HalfOpen => {
                st.trial_in_flight = true;
                Ok(())
            }
        }
    }

    pub fn on_success(&self) {
        let mut st = self.lock();
        if st.circuit != CircuitState::Closed {
            tracing::info!(circuit = %self.name, "Circuit closed");
        }
        st.circuit = CircuitState::Closed;
        st.consecutive_failures = 0;
        st.open_until = None;
        st.trial_in_flight = false;
    }

    pub fn on_failure(&self) {
        let mut st = self.lock();
        st.consecutive_failures = st.consecutive_failures.saturating_add(1);
        let trip = match st.circuit {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => st.consecutive_failures >= self.cfg.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            st.circuit = CircuitState::Open;
            st.open_until = Some(Instant::now() + self.cfg.break_duration);
            st.trial_in_flight = false;
            tracing::warn!(
                circuit = %self.name,
                consecutive_failures = st.consecutive_failures,
                break_ms = self.cfg.break_duration.as_millis() as u64,
                "Circuit opened"
            );
        }
    }

    /// A call that was admitted but never produced an outcome (cancelled or dropped).
    pub fn on_abandoned(&self) {
        let mut st = self.lock();
        if st.circuit == CircuitState::HalfOpen {
            st.trial_in_flight = false;
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().circuit
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let now = Instant::now();
        let st = self.lock();
        let open_remaining_ms = st.open_until.and_then(|until| {
            if until > now {
                Some((until - now).as_millis() as u64)
            } else {
                None
            }
        });
        CircuitBreakerSnapshot {
            state: st.circuit,
            failure_threshold: self.cfg.failure_threshold,
            break_duration_ms: self.cfg.break_duration.as_millis() as u64,
            consecutive_failures: st.consecutive_failures,
            open_remaining_ms,
        }
    }
}

/// Reports an admitted call as abandoned unless an outcome was recorded.
struct CallGuard<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl CallGuard<'_> {
    fn settle(mut self, outcome: &Result<impl Sized>) {
        self.settled = true;
        match outcome {
            Ok(_) => self.breaker.on_success(),
            Err(e) if e.counts_as_failure() => self.breaker.on_failure(),
            Err(_) => self.breaker.on_abandoned(),
        }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned();
        }
    }
}

/// Breakers shared per request type across calls.
///
/// The first call of a type fixes that type's threshold and break duration. Types are
/// keyed by their unqualified name, so same-named types from different modules share
/// one breaker.
pub struct CircuitRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitRegistry {
    pub fn new() -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, name: &str, cfg: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(b) = self
            .breakers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            return b.clone();
        }
        self.breakers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, cfg)))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}

impl Default for CircuitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CircuitBreakerBehavior {
    registry: Arc<CircuitRegistry>,
}

impl CircuitBreakerBehavior {
    pub fn new(registry: Arc<CircuitRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for CircuitBreakerBehavior {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response> {
        let name = request_name::<R>();
        let protected = request
            .as_circuit_protected()
            .ok_or_else(|| Error::missing_facet(name, "circuit_protected"))?;
        let cfg = CircuitBreakerConfig::new()
            .with_failure_threshold(protected.exceptions_allowed_before_breaking())
            .with_break_duration(protected.duration_of_break());
        if cfg.failure_threshold == 0 || cfg.break_duration.is_zero() {
            return Err(Error::configuration_with_context(
                "failure threshold and break duration must be positive",
                ErrorContext::new()
                    .with_field_path(format!("{}::exceptions_allowed_before_breaking", name))
                    .with_details(format!("{:?}", cfg))
                    .with_source("circuit_breaker_behavior"),
            ));
        }

        ctx.ensure_active()?;
        let breaker = self.registry.get_or_create(name, cfg);
        breaker.allow()?;

        let guard = CallGuard {
            breaker: &breaker,
            settled: false,
        };
        let outcome = next.run(request, ctx).await;
        guard.settle(&outcome);
        outcome
    }

    fn name(&self) -> &'static str {
        "circuit_breaker"
    }
}
