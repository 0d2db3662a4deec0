//! Per-call context: cancellation signal, caller identity and request id.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{Error, Result};

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Context handed to every behavior and to the terminal handler of one invocation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    identity: Option<Principal>,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            identity: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_identity(mut self, principal: Principal) -> Self {
        self.identity = Some(principal);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Tie this call to an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The caller, if one is attached to this call.
    pub fn identity(&self) -> Option<&Principal> {
        self.identity.as_ref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fails with [`Error::Cancelled`] once the cancellation signal has fired.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_anonymous_and_active() {
        let ctx = RequestContext::new();
        assert!(ctx.identity().is_none());
        assert!(ctx.ensure_active().is_ok());
        assert!(!ctx.request_id().is_empty());
    }

    #[test]
    fn cancellation_is_observed_through_shared_token() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation(token.clone());
        token.cancel();
        assert!(matches!(ctx.ensure_active(), Err(Error::Cancelled)));
    }

    #[test]
    fn principal_roles() {
        let p = Principal::new("ada").with_role("catalog.write");
        assert!(p.has_role("catalog.write"));
        assert!(!p.has_role("general.admin"));
    }
}
