use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Default directive when neither `RUST_LOG` nor `--verbose` says otherwise.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the stderr subscriber. `RUST_LOG` wins over `fallback`.
pub fn init(fallback: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(fallback)
            .with_context(|| format!("build log filter from {fallback:?}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    tracing::trace!(fallback, "logging initialized");
    Ok(())
}
