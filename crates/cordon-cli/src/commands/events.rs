//! `cordon events` — Stream stats and OOM events for running containers.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use cordon_common::constants::DEFAULT_POLL_INTERVAL_SECS;
use cordon_common::error::{CordonError, Result};
use cordon_runtime::container::LocalRegistry;
use cordon_runtime::monitor::{MonitorEngine, ensure_not_stopped, resolve_containers};

/// Arguments for the `events` command.
#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Container identifiers to monitor.
    #[arg(required = true)]
    pub container_ids: Vec<String>,

    /// Collect one stats snapshot per container and exit.
    #[arg(long)]
    pub stats: bool,

    /// Stats polling interval in seconds.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub interval: u64,
}

/// Executes the `events` command.
///
/// Emits newline-delimited JSON events on standard output. In one-shot
/// mode (`--stats`) the command returns once every container has reported;
/// otherwise it runs until every monitored container has stopped.
///
/// # Errors
///
/// Returns an error on invalid arguments, resolution failure, a
/// stopped target, or (in one-shot mode) stats-collection failure.
pub fn execute(state_root: &str, args: EventsArgs) -> anyhow::Result<()> {
    // Argument validation happens before any container is touched.
    let interval = validate_interval(args.interval)?;

    let registry = LocalRegistry::new(PathBuf::from(state_root));
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let containers = resolve_containers(&registry, &args.container_ids)?;
        ensure_not_stopped(&containers)?;

        let engine = MonitorEngine::new(containers);
        let out = std::io::stdout();
        if args.stats {
            engine.collect_once(out).await
        } else {
            engine.watch(interval, out).await
        }
    })?;
    Ok(())
}

fn validate_interval(secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(CordonError::InvalidArgument {
            message: "polling interval must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_rejected() {
        let err = validate_interval(0).expect_err("zero interval");
        assert!(matches!(err, CordonError::InvalidArgument { .. }));
    }

    #[test]
    fn positive_interval_converts_to_duration() {
        assert_eq!(
            validate_interval(5).expect("valid interval"),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn zero_interval_fails_before_any_container_lookup() {
        // The registry root does not exist; if resolution ran first this
        // would surface a NotFound error instead of the argument error.
        let args = EventsArgs {
            container_ids: vec!["a".to_string()],
            stats: false,
            interval: 0,
        };
        let err = execute("/nonexistent/cordon-test-root", args).expect_err("invalid interval");
        assert!(err.to_string().contains("interval"));
    }
}
