//! Shared fixtures for cross-crate scenario tests.

use std::collections::{HashMap, HashSet};

use homestead_core::{HostError, ParticipantId, SurfaceProbe, TerrainClassifier, WorldHost};
use homestead_topology::{ColumnPos, GridPos, HomePos};

/// Host whose readiness and terrain are scripted per column.
///
/// A column counts as ready once it appears in `ready`; every ready column
/// reports the same surface height.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    pub excluded: HashSet<ColumnPos>,
    pub reject_all: bool,
    pub ready: HashSet<ColumnPos>,
    pub surface_y: i32,
    pub online: HashSet<ParticipantId>,
    pub awaiting: HashSet<ParticipantId>,
    pub positions: HashMap<ParticipantId, (HomePos, bool)>,
    pub recall_points: HashMap<ParticipantId, HomePos>,
    pub reservations: HashMap<GridPos, u32>,
    pub preparation_requests: Vec<HomePos>,
}

impl ScriptedHost {
    pub fn new(surface_y: i32) -> Self {
        Self {
            surface_y,
            ..Default::default()
        }
    }

    pub fn connect(&mut self, id: ParticipantId) {
        self.online.insert(id);
    }

    pub fn disconnect(&mut self, id: ParticipantId) {
        self.online.remove(&id);
    }

    /// Whether any area reservation is still outstanding.
    pub fn has_reservations(&self) -> bool {
        !self.reservations.is_empty()
    }
}

impl TerrainClassifier for ScriptedHost {
    fn is_excluded_terrain(&self, column: ColumnPos) -> bool {
        self.reject_all || self.excluded.contains(&column)
    }
}

impl SurfaceProbe for ScriptedHost {
    fn probe_true_surface_y(&self, column: ColumnPos) -> i32 {
        if self.ready.contains(&column) {
            self.surface_y
        } else {
            self.min_build_height()
        }
    }

    fn min_build_height(&self) -> i32 {
        -64
    }
}

impl WorldHost for ScriptedHost {
    fn request_preparation(&mut self, pos: HomePos) -> Result<bool, HostError> {
        self.preparation_requests.push(pos);
        Ok(true)
    }

    fn reserve_area(&mut self, grid: GridPos, _radius: u32) {
        *self.reservations.entry(grid).or_default() += 1;
    }

    fn release_area(&mut self, grid: GridPos, _radius: u32) {
        if let Some(count) = self.reservations.get_mut(&grid) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.reservations.remove(&grid);
            }
        }
    }

    fn place_participant_at(&mut self, id: ParticipantId, pos: HomePos, hold_above_ground: bool) {
        self.positions.insert(id, (pos, hold_above_ground));
    }

    fn set_persistent_recall_point(&mut self, id: ParticipantId, pos: HomePos) {
        self.recall_points.insert(id, pos);
    }

    fn is_awaiting_preparation(&self, id: ParticipantId) -> bool {
        self.awaiting.contains(&id)
    }

    fn set_awaiting_preparation(&mut self, id: ParticipantId, awaiting: bool) {
        if awaiting {
            self.awaiting.insert(id);
        } else {
            self.awaiting.remove(&id);
        }
    }

    fn is_online(&self, id: ParticipantId) -> bool {
        self.online.contains(&id)
    }
}
