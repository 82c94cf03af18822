//! Homestead Node - standalone host for spiral home allocation
//!
//! Runs a [`JoinCoordinator`](homestead_core::JoinCoordinator) against a
//! deterministic simulated world so allocation, readiness polling and
//! persistence can be exercised without a game server.
//!
//! # Architecture
//!
//! - **World**: blake3-keyed terrain, delayed preparation, participant state
//! - **Node**: tick loop, autosave, shutdown save
//! - **Admin Socket**: Unix socket for local diagnostics (homestead-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use homestead_node::{HomesteadNode, NodeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = HomesteadNode::new(NodeConfig::from_env()?)?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod error;
pub mod node;
pub mod world;

pub use admin_socket::{AdminCommand, AdminResponse, AdminSocket};
pub use error::{Error, Result};
pub use node::{HomesteadNode, NodeConfig, NodeState};
pub use world::{SimParticipant, SimulatedWorld, WorldSettings};
