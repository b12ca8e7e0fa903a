use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize logging for the gateway: JSON lines for log shippers, or a
/// console-friendly format for development. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_tracing(json: bool) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    if json {
        Registry::default()
            .with(env_filter())
            .with(
                fmt_layer
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .wrap_err("Failed to install JSON tracing subscriber")?;
    } else {
        Registry::default()
            .with(env_filter())
            .with(fmt_layer.compact())
            .try_init()
            .wrap_err("Failed to install console tracing subscriber")?;
    }

    tracing::debug!("Tollgate logging initialized (json: {})", json);
    Ok(())
}
