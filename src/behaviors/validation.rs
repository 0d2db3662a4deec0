use async_trait::async_trait;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::ValidationErrors;
use crate::pipeline::{Behavior, Next};
use crate::request::{request_name, Request};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Checks one request type; an empty result means valid.
pub trait Validator<R>: Send + Sync {
    fn validate(&self, request: &R) -> Vec<FieldError>;
}

impl<R, F> Validator<R> for F
where
    F: Fn(&R) -> Vec<FieldError> + Send + Sync,
{
    fn validate(&self, request: &R) -> Vec<FieldError> {
        self(request)
    }
}

/// Runs every validator registered for the request type and fails with all their
/// findings at once.
pub struct ValidationBehavior<R> {
    validators: Vec<Arc<dyn Validator<R>>>,
}

impl<R> ValidationBehavior<R> {
    pub fn new(validators: Vec<Arc<dyn Validator<R>>>) -> Self {
        Self { validators }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for ValidationBehavior<R> {
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> Result<R::Response> {
        let mut errors = ValidationErrors::new();
        for failure in self.validators.iter().flat_map(|v| v.validate(request)) {
            errors.add(failure.field, failure.message);
        }

        if !errors.is_empty() {
            tracing::info!(
                request_type = request_name::<R>(),
                fields = errors.len(),
                "Request validation failed"
            );
            return Err(Error::Validation(errors));
        }

        next.run(request, ctx).await
    }

    fn name(&self) -> &'static str {
        "validation"
    }
}
