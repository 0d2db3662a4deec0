//! Behavior, handler and continuation types.

use async_trait::async_trait;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::request::Request;
use crate::Result;

/// Terminal handler for one request type; owns the business logic.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    async fn handle(&self, request: &R, ctx: &RequestContext) -> Result<R::Response>;

    fn name(&self) -> &str {
        crate::request::request_name::<Self>()
    }
}

/// One cross-cutting step wrapped around a handler.
///
/// A behavior either short-circuits (returns or fails without running `next`) or
/// delegates to `next` and post-processes its outcome.
#[async_trait]
pub trait Behavior<R: Request>: Send + Sync {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response>;

    fn name(&self) -> &'static str;
}

/// The rest of the chain, ending in the terminal handler.
pub struct Next<'a, R: Request> {
    behaviors: &'a [Arc<dyn Behavior<R>>],
    handler: &'a dyn Handler<R>,
}

impl<'a, R: Request> Next<'a, R> {
    pub(crate) fn new(behaviors: &'a [Arc<dyn Behavior<R>>], handler: &'a dyn Handler<R>) -> Self {
        Self { behaviors, handler }
    }

    /// Name of the terminal handler this continuation ends in.
    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }

    /// Runs the remaining behaviors and the handler.
    ///
    /// Refuses to start once the call has been cancelled, so no behavior can invoke its
    /// continuation after cancellation was observed.
    pub async fn run(self, request: &R, ctx: &RequestContext) -> Result<R::Response> {
        ctx.ensure_active()?;
        match self.behaviors.split_first() {
            Some((first, rest)) => {
                first
                    .handle(request, ctx, Next::new(rest, self.handler))
                    .await
            }
            None => self.handler.handle(request, ctx).await,
        }
    }
}

/// Ordered, immutable behaviors for one request type.
pub struct BehaviorChain<R: Request> {
    behaviors: Vec<Arc<dyn Behavior<R>>>,
}

impl<R: Request> BehaviorChain<R> {
    pub fn new() -> Self {
        Self {
            behaviors: Vec::new(),
        }
    }

    pub fn add(mut self, behavior: Arc<dyn Behavior<R>>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Behavior names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.behaviors.iter().map(|b| b.name()).collect()
    }

    pub async fn execute(
        &self,
        request: &R,
        handler: &dyn Handler<R>,
        ctx: &RequestContext,
    ) -> Result<R::Response> {
        Next::new(&self.behaviors, handler).run(request, ctx).await
    }
}

impl<R: Request> Default for BehaviorChain<R> {
    fn default() -> Self {
        Self::new()
    }
}
