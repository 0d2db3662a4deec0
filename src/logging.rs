//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events; applications either install their own
//! subscriber or call [`init_tracing`] once at startup.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Filter directives: `PIPELINE_LOG`, then `RUST_LOG`, then `info`.
pub fn filter_directives() -> String {
    directives_from(|name| std::env::var(name).ok())
}

fn directives_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    ["PIPELINE_LOG", "RUST_LOG"]
        .into_iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

/// Installs a console fmt layer filtered by [`filter_directives`].
///
/// Safe to call more than once; an already-installed global subscriber is left in place.
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let directives = filter_directives();
        let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already set; keeping it");
            return;
        }
        tracing::debug!(filter = %directives, "Tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_log_wins_over_rust_log() {
        let directives = directives_from(|name| match name {
            "PIPELINE_LOG" => Some("behavior_pipeline=debug".to_string()),
            "RUST_LOG" => Some("warn".to_string()),
            _ => None,
        });
        assert_eq!(directives, "behavior_pipeline=debug");
    }

    #[test]
    fn blank_values_fall_through_to_default() {
        assert_eq!(directives_from(|_| Some("  ".to_string())), "info");
        assert_eq!(directives_from(|_| None), "info");
    }

    #[test]
    fn init_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
