//! Telemetry logic.
//! Support logging and metrics.

use metrics::Unit;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

pub(crate) const ACCOUNTS_REGISTERED: &str = "accounts_registered_total";
pub(crate) const AUTHENTICATION_FAILURES: &str =
    "authentication_failures_total";
pub(crate) const HIGH_SCORES_IMPROVED: &str = "high_scores_improved_total";

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `filter`.
pub fn init(filter: &str) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    describe_metrics();
    Ok(())
}

/// Register metric descriptions on the installed recorder, if any.
pub fn describe_metrics() {
    metrics::describe_counter!(
        ACCOUNTS_REGISTERED,
        Unit::Count,
        "Accounts successfully registered."
    );
    metrics::describe_counter!(
        AUTHENTICATION_FAILURES,
        Unit::Count,
        "Rejected authentication attempts."
    );
    metrics::describe_counter!(
        HIGH_SCORES_IMPROVED,
        Unit::Count,
        "Score submissions that raised a high score."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        // The first call may already have happened in another test.
        let _ = init("debug");
        assert!(init("debug").is_err());
    }
}
