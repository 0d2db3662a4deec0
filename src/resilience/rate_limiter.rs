use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::context::RequestContext;
use crate::pipeline::{Behavior, Next};
use crate::request::{request_name, Request};
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindowSnapshot {
    pub count: u32,
    /// Time until the window resets to zero.
    pub resets_in: Duration,
}

#[derive(Debug)]
struct Window {
    count: u32,
    expires_at: Instant,
}

/// Outcome of [`RateCounters::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Admitted; carries the count after this call.
    Admitted(u32),
    /// Limit reached; carries the time left in the current window.
    Rejected(Duration),
}

/// Process-wide fixed-window counters, keyed by caller-chosen strings.
///
/// A window starts at zero on the first call for its key and expires `window` later;
/// increments never extend it. Check-and-increment happens under one lock, so two
/// concurrent callers can never both take the last slot.
pub struct RateCounters {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateCounters {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub async fn try_acquire(&self, key: &str, limit: u32, window: Duration) -> Admission {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let entry = windows
            .entry(key.to_string())
            .and_modify(|w| {
                if now >= w.expires_at {
                    w.count = 0;
                    w.expires_at = now + window;
                }
            })
            .or_insert_with(|| Window {
                count: 0,
                expires_at: now + window,
            });

        if entry.count >= limit {
            return Admission::Rejected(entry.expires_at.saturating_duration_since(now));
        }
        entry.count += 1;
        Admission::Admitted(entry.count)
    }

    pub async fn snapshot(&self, key: &str) -> Option<RateWindowSnapshot> {
        let windows = self.windows.lock().await;
        let now = Instant::now();
        windows
            .get(key)
            .filter(|w| now < w.expires_at)
            .map(|w| RateWindowSnapshot {
                count: w.count,
                resets_in: w.expires_at - now,
            })
    }

    /// Drops windows that have already expired.
    pub async fn purge_expired(&self) -> usize {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let before = windows.len();
        windows.retain(|_, w| now < w.expires_at);
        before - windows.len()
    }
}

impl Default for RateCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Global-per-type limiter: every caller of a request type shares one window.
pub struct RateLimitingBehavior {
    counters: Arc<RateCounters>,
}

impl RateLimitingBehavior {
    pub fn new(counters: Arc<RateCounters>) -> Self {
        Self { counters }
    }

    /// Window key for a request type.
    ///
    /// Keyed by the unqualified type name: same-named types from different modules
    /// (`a::GetProducts`, `b::GetProducts`) share one window.
    pub fn key_for<R: Request>() -> String {
        format!("RateLimit:{}", request_name::<R>())
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for RateLimitingBehavior {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response> {
        let name = request_name::<R>();
        let limited = request
            .as_rate_limited()
            .ok_or_else(|| Error::missing_facet(name, "rate_limited"))?;
        let limit = limited.request_limit();
        let window = limited.time_window();
        if limit == 0 || window.is_zero() {
            return Err(Error::configuration_with_context(
                "rate limit and time window must be positive",
                ErrorContext::new()
                    .with_field_path(format!("{}::request_limit", name))
                    .with_details(format!("limit={}, window={:?}", limit, window))
                    .with_source("rate_limiting_behavior"),
            ));
        }

        ctx.ensure_active()?;
        match self
            .counters
            .try_acquire(&Self::key_for::<R>(), limit, window)
            .await
        {
            Admission::Admitted(count) => {
                tracing::debug!(request_type = name, count, limit, "rate limit admitted");
                next.run(request, ctx).await
            }
            Admission::Rejected(retry_after) => {
                tracing::warn!(
                    request_type = name,
                    limit,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Rate limit exceeded"
                );
                Err(Error::RateLimitExceeded {
                    request_type: name.to_string(),
                    limit,
                    retry_after: Some(retry_after),
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        "rate_limiting"
    }
}
