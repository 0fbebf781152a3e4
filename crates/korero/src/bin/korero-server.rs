//! Runs a Korero server configured from `KORERO_*` environment variables.
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

use korero::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), KoreroError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(bind = %config.bind, "starting korero");

    let server = KoreroServerBuilder::from_config(config).build().await?;
    server.run().await
}
