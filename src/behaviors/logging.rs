use async_trait::async_trait;
use serde::Serialize;

use crate::context::RequestContext;
use crate::pipeline::{Behavior, Next};
use crate::request::{request_name, Request};
use crate::Result;

/// Structured record of one call, emitted as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct LogDetail {
    pub method_name: String,
    pub parameters: Vec<LogParameter>,
    pub user: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogParameter {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: serde_json::Value,
}

impl LogDetail {
    pub(crate) fn for_request<R: Request>(
        method_name: &str,
        request: &R,
        user: impl Into<String>,
    ) -> Self {
        let value = serde_json::to_value(request).unwrap_or_else(|e| {
            serde_json::Value::String(format!("<unserializable request: {}>", e))
        });
        Self {
            method_name: method_name.to_string(),
            parameters: vec![LogParameter {
                type_name: request_name::<R>().to_string(),
                value,
            }],
            user: user.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Records who called which handler with what, then always delegates.
pub struct LoggingBehavior;

#[async_trait]
impl<R: Request> Behavior<R> for LoggingBehavior {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response> {
        let user = ctx
            .identity()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "?".to_string());
        let detail = LogDetail::for_request(next.handler_name(), request, user);

        tracing::info!(
            request_id = %ctx.request_id(),
            request_type = request_name::<R>(),
            handler = %detail.method_name,
            user = %detail.user,
            detail = %detail.to_json(),
            "Handling request"
        );

        next.run(request, ctx).await
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
