//! embedgate binary entry point.
//!
//! The runtime is built by hand so the blocking-thread pool can be sized
//! from configuration; gate capacity is validated against it before the
//! server starts.

use embedgate::{run_server, ServerConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("embedgate=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = ServerConfig::from_env();
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .max_blocking_threads(config.workers)
        .enable_all()
        .build()?;

    runtime.block_on(run_server(config))
}
