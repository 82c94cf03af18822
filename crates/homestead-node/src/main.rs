//! Homestead Node binary
//!
//! Runs spiral home allocation against a simulated world.

use homestead_node::{HomesteadNode, NodeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homestead_node=info,homestead_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Homestead Node");

    let config = NodeConfig::from_env()?;

    let node = HomesteadNode::new(config)?;
    node.run().await?;

    Ok(())
}
