//! Homestead Core - Spiral Home Allocation
//!
//! Gives every joining participant a unique, well-separated home on a square
//! spiral, holds them above ground until the host reports the terrain ready,
//! and remembers every assignment across restarts.
//!
//! # Architecture
//!
//! - **Store**: cursor + participant homes, JSON record on disk
//! - **Allocation**: spiral walk with terrain exclusion and a bounded search
//! - **Readiness**: debounced polling with a tick timeout
//! - **Coordinator**: join / tick / leave entry points driving the above
//! - **Host**: traits the embedding world implements
//!
//! # Example
//!
//! ```no_run
//! use homestead_core::{HomesteadConfig, JoinCoordinator, StoreFile};
//!
//! fn main() -> homestead_core::Result<()> {
//!     let file = StoreFile::in_dir("data");
//!     let mut coordinator = JoinCoordinator::new(HomesteadConfig::from_env()?, file.load())?;
//!     // host.on_join(...) / host.on_tick(...) drive the coordinator
//!     file.save_if_dirty(coordinator.store_mut())?;
//!     Ok(())
//! }
//! ```

pub mod allocation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod participant;
pub mod persist;
pub mod readiness;
pub mod store;

pub use allocation::{Allocation, AllocationEngine};
pub use config::{HomesteadConfig, MAX_TICKS_PER_SECOND};
pub use coordinator::{JoinCoordinator, JoinOutcome, RecallDecision, RecallOrigin, Resolution};
pub use error::{Error, Result};
pub use host::{HostError, SurfaceProbe, TerrainClassifier, WorldHost};
pub use participant::{ParticipantId, Tick};
pub use persist::{StoreFile, STORE_FILE_NAME};
pub use readiness::{PendingEntry, PollOutcome, ReadinessConfig, ReadinessTracker};
pub use store::{AssignmentRecord, AssignmentStore, StoreRecord};

pub use homestead_topology::{ColumnPos, GridPos, HomePos, SpiralIndex, SpiralLayout};
