//! Keep Node binary
//!
//! Serves the Knightfall membership session over HTTP.

use knightfall_keep::{KeepConfig, KeepNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keep_node=info,knightfall=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Keep Node");

    let config = KeepConfig::from_env()?;

    let node = KeepNode::new(config).await?;
    node.run().await?;

    Ok(())
}
