//! Simulated host world.
//!
//! A deterministic stand-in for a real game world: terrain classification and
//! surface heights come from a keyed blake3 hash of the column, and prepared
//! terrain becomes ready a fixed number of ticks after it was requested.

use std::collections::{HashMap, HashSet};

use homestead_core::{HostError, ParticipantId, SurfaceProbe, TerrainClassifier, Tick, WorldHost};
use homestead_topology::{ColumnPos, GridPos, HomePos};
use tracing::{debug, trace};

/// Knobs for the simulated world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSettings {
    /// Seed mixed into every terrain hash
    pub seed: u64,
    /// Share of columns classified as excluded terrain, 0-100
    pub excluded_percent: u8,
    /// Ticks between a preparation request and the terrain being ready
    pub preparation_delay_ticks: u64,
    /// Lowest buildable height
    pub min_build_height: i32,
    /// Lowest generated surface height
    pub base_surface: i32,
    /// Spread of generated surface heights above `base_surface`
    pub surface_variation: u32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            excluded_percent: 30,
            preparation_delay_ticks: 40,
            min_build_height: -64,
            base_surface: 62,
            surface_variation: 24,
        }
    }
}

/// A participant as the simulated world sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimParticipant {
    pub position: HomePos,
    /// Held in stasis above ground
    pub held: bool,
    pub online: bool,
}

/// Deterministic in-memory world implementing [`WorldHost`].
#[derive(Debug, Default)]
pub struct SimulatedWorld {
    settings: WorldSettings,
    now: Tick,
    /// Column → tick at which its terrain is ready
    prepared: HashMap<ColumnPos, Tick>,
    participants: HashMap<ParticipantId, SimParticipant>,
    recall_points: HashMap<ParticipantId, HomePos>,
    awaiting: HashSet<ParticipantId>,
    reservations: HashMap<GridPos, u32>,
    default_spawn: Option<HomePos>,
    fail_preparation: bool,
}

impl SimulatedWorld {
    pub fn new(settings: WorldSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Advance the world clock. Preparation completes against this clock.
    pub fn set_tick(&mut self, now: Tick) {
        self.now = now;
    }

    pub fn tick(&self) -> Tick {
        self.now
    }

    /// Make every preparation request fail (diagnostics).
    pub fn set_fail_preparation(&mut self, fail: bool) {
        self.fail_preparation = fail;
    }

    /// Bring a participant online. A new participant appears at the default spawn.
    pub fn connect(&mut self, id: ParticipantId) {
        let spawn = self.default_spawn.unwrap_or_default();
        self.participants
            .entry(id)
            .and_modify(|p| p.online = true)
            .or_insert(SimParticipant {
                position: spawn,
                held: false,
                online: true,
            });
    }

    pub fn disconnect(&mut self, id: ParticipantId) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.online = false;
        }
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&SimParticipant> {
        self.participants.get(&id)
    }

    pub fn recall_point(&self, id: ParticipantId) -> Option<HomePos> {
        self.recall_points.get(&id).copied()
    }

    pub fn default_spawn(&self) -> Option<HomePos> {
        self.default_spawn
    }

    /// Outstanding reservations on a grid cell.
    pub fn reservation_count(&self, grid: GridPos) -> u32 {
        self.reservations.get(&grid).copied().unwrap_or(0)
    }

    /// Number of grid cells with at least one reservation.
    pub fn reserved_cells(&self) -> usize {
        self.reservations.len()
    }

    /// Whether terrain at the column has finished preparing.
    pub fn is_prepared(&self, column: ColumnPos) -> bool {
        self.prepared.get(&column).is_some_and(|ready_at| self.now >= *ready_at)
    }

    /// Generated surface height at a column, regardless of preparation.
    pub fn surface_height(&self, column: ColumnPos) -> i32 {
        let variation = self.settings.surface_variation.max(1);
        let offset = (self.column_hash(column, b"surface") % u64::from(variation)) as i32;
        self.settings.base_surface.saturating_add(offset)
    }

    fn column_hash(&self, column: ColumnPos, domain: &[u8]) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain);
        hasher.update(&self.settings.seed.to_le_bytes());
        hasher.update(&column.x.to_le_bytes());
        hasher.update(&column.z.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl TerrainClassifier for SimulatedWorld {
    fn is_excluded_terrain(&self, column: ColumnPos) -> bool {
        self.column_hash(column, b"terrain") % 100 < u64::from(self.settings.excluded_percent)
    }
}

impl SurfaceProbe for SimulatedWorld {
    fn probe_true_surface_y(&self, column: ColumnPos) -> i32 {
        if self.is_prepared(column) {
            self.surface_height(column)
        } else {
            self.settings.min_build_height
        }
    }

    fn min_build_height(&self) -> i32 {
        self.settings.min_build_height
    }
}

impl WorldHost for SimulatedWorld {
    fn request_preparation(&mut self, pos: HomePos) -> Result<bool, HostError> {
        if self.fail_preparation {
            return Err(HostError::new(format!("preparation refused at {pos}")));
        }
        let ready_at = Tick(self.now.value().saturating_add(self.settings.preparation_delay_ticks));
        self.prepared.entry(pos.column()).or_insert(ready_at);
        debug!(%pos, %ready_at, "Queued terrain preparation");
        Ok(true)
    }

    fn reserve_area(&mut self, grid: GridPos, radius: u32) {
        *self.reservations.entry(grid).or_default() += 1;
        trace!(%grid, radius, "Reserved area");
    }

    fn release_area(&mut self, grid: GridPos, radius: u32) {
        if let Some(count) = self.reservations.get_mut(&grid) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.reservations.remove(&grid);
            }
        }
        trace!(%grid, radius, "Released area");
    }

    fn place_participant_at(&mut self, id: ParticipantId, pos: HomePos, hold_above_ground: bool) {
        let entry = self.participants.entry(id).or_insert(SimParticipant {
            position: pos,
            held: hold_above_ground,
            online: true,
        });
        entry.position = pos;
        entry.held = hold_above_ground;
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
        self.participants.get(&id).is_some_and(|p| p.online)
    }

    fn set_default_spawn(&mut self, pos: HomePos) {
        self.default_spawn = Some(pos);
    }
}
