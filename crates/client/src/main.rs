//! Clicker client binary.
//!
//! ```bash
//! CLICKER_SEED=42 cargo run -p clicker-client
//! ```

use anyhow::Result;
use clicker_client::{App, ClientConfig, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env();
    let _guard = logging::setup_logging(&config.session_id)?;

    tracing::info!("Starting clicker client");
    tracing::info!("Content: {}", config.content_dir.display());

    App::build(config).await?.run().await?;

    tracing::info!("Client shutdown complete");
    Ok(())
}
