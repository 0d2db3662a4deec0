use async_trait::async_trait;

use crate::context::RequestContext;
use crate::pipeline::{Behavior, Next};
use crate::request::{request_name, Request};
use crate::{Error, Result};

/// Role claim that satisfies every role requirement.
pub const ADMIN_ROLE: &str = "general.admin";

/// Requires an identity on the call and, when the request lists roles, one of them
/// (or the admin role).
pub struct AuthorizationBehavior;

#[async_trait]
impl<R: Request> Behavior<R> for AuthorizationBehavior {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response> {
        let name = request_name::<R>();
        let authorizable = request
            .as_authorizable()
            .ok_or_else(|| Error::missing_facet(name, "authorizable"))?;

        let Some(principal) = ctx.identity() else {
            tracing::info!(request_type = name, "Rejected unauthenticated call");
            return Err(Error::Unauthenticated);
        };

        let required = authorizable.roles();
        if !required.is_empty() {
            let permitted = principal
                .roles
                .iter()
                .any(|held| held == ADMIN_ROLE || required.contains(&held.as_str()));
            if !permitted {
                tracing::info!(
                    request_type = name,
                    user = %principal.name,
                    "Rejected call lacking required role"
                );
                return Err(Error::Forbidden {
                    required_roles: required.iter().map(|r| r.to_string()).collect(),
                });
            }
        }

        next.run(request, ctx).await
    }

    fn name(&self) -> &'static str {
        "authorization"
    }
}
