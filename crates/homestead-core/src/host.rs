//! Capabilities the core needs from its host world.
//!
//! The core never reaches into the host directly. Everything it needs to ask
//! (terrain classification, surface probes, session flags) or to do
//! (prepare terrain, reserve areas, move participants) is an injected trait
//! passed to each entry point.

use homestead_topology::{ColumnPos, GridPos, HomePos};
use thiserror::Error;

use crate::participant::ParticipantId;

/// Failure reported by a host collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host collaborator failed: {0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Classification oracle consulted while searching for a home.
pub trait TerrainClassifier {
    /// Whether the column lies on terrain homes must avoid.
    fn is_excluded_terrain(&self, column: ColumnPos) -> bool;
}

impl<F> TerrainClassifier for F
where
    F: Fn(ColumnPos) -> bool,
{
    fn is_excluded_terrain(&self, column: ColumnPos) -> bool {
        self(column)
    }
}

/// Readiness signal source.
pub trait SurfaceProbe {
    /// Height of the topmost solid, non-foliage block in the column, scanning
    /// down from the build limit. Returns `min_build_height()` when empty.
    fn probe_true_surface_y(&self, column: ColumnPos) -> i32;

    /// Lowest buildable height in the world.
    fn min_build_height(&self) -> i32;

    /// Whether solid ground is present in the column.
    fn is_ground_present(&self, column: ColumnPos) -> bool {
        self.probe_true_surface_y(column) > self.min_build_height() + 1
    }
}

/// Everything the coordinator drives on the host.
pub trait WorldHost: TerrainClassifier + SurfaceProbe {
    /// Ask the host to start preparing terrain at `pos`. Fire-and-forget:
    /// `Ok(accepted)` only reports whether the request was queued.
    fn request_preparation(&mut self, pos: HomePos) -> Result<bool, HostError>;

    /// Keep the area around a grid cell loaded.
    fn reserve_area(&mut self, grid: GridPos, radius: u32);

    /// Drop a reservation made by [`reserve_area`](Self::reserve_area).
    fn release_area(&mut self, grid: GridPos, radius: u32);

    /// Move a participant. With `hold_above_ground` the participant is held
    /// in stasis, unaffected by normal physics, until placed again.
    fn place_participant_at(&mut self, id: ParticipantId, pos: HomePos, hold_above_ground: bool);

    /// Make `pos` the participant's persistent respawn point.
    fn set_persistent_recall_point(&mut self, id: ParticipantId, pos: HomePos);

    /// Session flag: participant is waiting for their home to be prepared.
    fn is_awaiting_preparation(&self, id: ParticipantId) -> bool;

    fn set_awaiting_preparation(&mut self, id: ParticipantId, awaiting: bool);

    /// Whether the participant is currently connected.
    fn is_online(&self, _id: ParticipantId) -> bool {
        true
    }

    /// Set the world's default spawn point.
    fn set_default_spawn(&mut self, _pos: HomePos) {}
}
