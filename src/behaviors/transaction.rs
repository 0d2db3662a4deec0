use async_trait::async_trait;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::pipeline::{Behavior, Next};
use crate::request::{request_name, Request};
use crate::Result;

/// An open transaction. Dropping it without committing must leave nothing applied.
#[async_trait]
pub trait TransactionScope: Send {
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Opens transactions for transactional requests (a database pool, a unit of work...).
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    async fn begin(&self, ctx: &RequestContext) -> Result<Box<dyn TransactionScope>>;
}

/// Provider for handlers that manage no transactional resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransactions;

struct NoopScope;

#[async_trait]
impl TransactionScope for NoopScope {
    async fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TransactionProvider for NoopTransactions {
    async fn begin(&self, _ctx: &RequestContext) -> Result<Box<dyn TransactionScope>> {
        Ok(Box::new(NoopScope))
    }
}

/// Commits when the handler succeeds, rolls back and re-raises when it fails.
pub struct TransactionBehavior {
    provider: Arc<dyn TransactionProvider>,
}

impl TransactionBehavior {
    pub fn new(provider: Arc<dyn TransactionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for TransactionBehavior {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response> {
        ctx.ensure_active()?;
        let scope = self.provider.begin(ctx).await?;

        match next.run(request, ctx).await {
            Ok(response) => {
                scope.commit().await?;
                tracing::debug!(request_type = request_name::<R>(), "Transaction committed");
                Ok(response)
            }
            Err(err) => {
                if let Err(rollback_err) = scope.rollback().await {
                    tracing::warn!(
                        request_type = request_name::<R>(),
                        error = %rollback_err,
                        "Transaction rollback failed"
                    );
                } else {
                    tracing::debug!(request_type = request_name::<R>(), "Transaction rolled back");
                }
                Err(err)
            }
        }
    }

    fn name(&self) -> &'static str {
        "transaction"
    }
}
