use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "cache.sliding_expiration_days")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "caching_behavior", "pipeline_composer")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Field-level validation failures, grouped by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of distinct fields with at least one failure.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.errors.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join("; ")))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Error raised by a [`DistributedStore`](crate::store::DistributedStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation failed on key '{key}': {message}")]
    Operation { key: String, message: String },
}

/// Unified error type for the request pipeline.
///
/// Every failure a caller observes is one of these variants; handler failures pass
/// through unchanged as [`Error::Handler`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("You are not authenticated.")]
    Unauthenticated,

    #[error("You are not authorized.")]
    Forbidden { required_roles: Vec<String> },

    #[error("Rate limit exceeded for {request_type}. Please try again later.")]
    RateLimitExceeded {
        request_type: String,
        limit: u32,
        retry_after: Option<Duration>,
    },

    #[error("Circuit open for {request_type}; retry in {remaining_ms} ms")]
    CircuitOpen {
        request_type: String,
        remaining_ms: u64,
    },

    #[error("Deserialization failed for cache key {key}: {message}")]
    Deserialization { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Handler error: {0}")]
    Handler(#[from] anyhow::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// A request type declared a capability but does not expose the matching facet.
    pub fn missing_facet(request_type: &str, facet: &str) -> Self {
        Error::configuration_with_context(
            format!("{} declares the {} capability but does not expose it", request_type, facet),
            ErrorContext::new()
                .with_field_path(format!("{}::as_{}", request_type, facet))
                .with_source("pipeline_composer"),
        )
    }

    /// Wrap an arbitrary handler failure.
    pub fn handler(msg: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Error::Handler(anyhow::Error::msg(msg))
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether a circuit breaker should count this failure toward its threshold.
    ///
    /// Cancellation and rejections by the breaker itself are not failures of the
    /// protected operation.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(self, Error::Cancelled | Error::CircuitOpen { .. })
    }

    /// Whether a caller may retry the same request later and expect a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimitExceeded { .. } | Error::CircuitOpen { .. } | Error::Store(_)
        )
    }
}
