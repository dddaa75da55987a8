//! Tracing subscriber setup for binaries and tools embedding the engine.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set and valid; otherwise `default_filter` is used.
/// Installing twice is not an error: the second call leaves the first
/// subscriber in place and returns `Ok(false)`.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| anyhow::anyhow!("invalid log filter {default_filter:?}: {e}"))?,
    };
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}
