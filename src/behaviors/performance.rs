use async_trait::async_trait;
use tokio::time::Instant;

use super::logging::LogDetail;
use crate::context::RequestContext;
use crate::pipeline::{Behavior, Next};
use crate::request::{request_name, Request};
use crate::{Error, Result};

/// Reports calls slower than the request's declared interval.
///
/// The report is emitted after the continuation completes, whether it succeeded or
/// failed; the outcome itself is passed through untouched.
pub struct PerformanceBehavior;

#[async_trait]
impl<R: Request> Behavior<R> for PerformanceBehavior {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response> {
        let name = request_name::<R>();
        let interval = request
            .as_interval_checked()
            .ok_or_else(|| Error::missing_facet(name, "interval_checked"))?
            .interval();
        let handler = next.handler_name().to_string();

        let started = Instant::now();
        let outcome = next.run(request, ctx).await;
        let elapsed = started.elapsed();

        if elapsed > interval {
            let detail = LogDetail::for_request(&handler, request, "PerformanceCheck");
            tracing::warn!(
                request_id = %ctx.request_id(),
                request_type = name,
                elapsed_ms = elapsed.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                succeeded = outcome.is_ok(),
                detail = %detail.to_json(),
                "Performance -> {} took {:.3} seconds",
                name,
                elapsed.as_secs_f64()
            );
        }

        outcome
    }

    fn name(&self) -> &'static str {
        "performance"
    }
}
