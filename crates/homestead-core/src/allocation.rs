//! Spiral slot allocation.
//!
//! Walks the spiral from the store's cursor, skipping slots whose centre
//! column the classifier rejects, and reserves the first acceptable slot for
//! a participant. The cursor moves past every inspected slot, accepted or not,
//! so two participants can never share an index.

use homestead_topology::{GridPos, HomePos, SpiralIndex, SpiralLayout};
use tracing::{debug, error, info};

use crate::config::HomesteadConfig;
use crate::host::TerrainClassifier;
use crate::participant::ParticipantId;
use crate::store::AssignmentStore;

/// Result of allocating a home.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Spiral index reserved for the participant.
    pub index: SpiralIndex,
    /// Grid cell of that index.
    pub grid: GridPos,
    /// Provisional home: the cell's centre column at the hold altitude.
    pub home: HomePos,
    /// Indices rejected by the classifier before this one was chosen.
    pub skipped: u64,
    /// The attempt limit ran out and `index` was taken without acceptance.
    pub exhausted: bool,
}

/// Finds and reserves the next acceptable spiral slot.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    layout: SpiralLayout,
    skip_excluded: bool,
    max_attempts: u32,
    hold_altitude: i32,
}

impl AllocationEngine {
    pub fn new(
        layout: SpiralLayout,
        skip_excluded: bool,
        max_attempts: u32,
        hold_altitude: i32,
    ) -> Self {
        Self {
            layout,
            skip_excluded,
            max_attempts,
            hold_altitude,
        }
    }

    pub fn from_config(config: &HomesteadConfig) -> Self {
        Self::new(
            config.layout(),
            config.skip_excluded_terrain,
            config.max_attempts,
            config.hold_altitude,
        )
    }

    /// The layout used to place slots.
    pub fn layout(&self) -> &SpiralLayout {
        &self.layout
    }

    /// Allocate a home for `id`, which must not already have one.
    ///
    /// Every rejected index is written to the store as soon as it is
    /// rejected. If `max_attempts` candidates are all rejected, the slot at
    /// the current cursor is used anyway. Either way the cursor ends one past
    /// the chosen index and the provisional assignment is recorded.
    pub fn allocate<C>(
        &self,
        store: &mut AssignmentStore,
        classifier: &C,
        id: ParticipantId,
    ) -> Allocation
    where
        C: TerrainClassifier + ?Sized,
    {
        let start = store.cursor();
        let mut index = start;
        let mut chosen = None;

        for _ in 0..self.max_attempts {
            let grid = self.layout.grid_for_index(index);
            let column = self.layout.column_for(grid);

            if self.skip_excluded && classifier.is_excluded_terrain(column) {
                debug!(%index, %grid, %column, "Skipping excluded terrain");
                index = index.next();
                store.set_cursor(index);
                continue;
            }

            chosen = Some(grid);
            break;
        }

        let skipped = index.value() - start.value();
        let (grid, exhausted) = match chosen {
            Some(grid) => {
                info!(participant = %id, %index, %grid, skipped, "Found home slot");
                (grid, false)
            }
            None => {
                let grid = self.layout.grid_for_index(index);
                error!(
                    participant = %id,
                    attempts = self.max_attempts,
                    %index,
                    %grid,
                    "No acceptable slot within attempt limit, using fallback"
                );
                (grid, true)
            }
        };

        store.set_cursor(index.next());
        let home = self.layout.column_for(grid).at_height(self.hold_altitude);
        store.put_assignment(id, home);

        Allocation {
            index,
            grid,
            home,
            skipped,
            exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homestead_topology::ColumnPos;
    use std::cell::Cell;
    use std::collections::HashSet;

    fn engine() -> AllocationEngine {
        AllocationEngine::from_config(&HomesteadConfig::default())
    }

    fn accept_all(_: ColumnPos) -> bool {
        false
    }

    #[test]
    fn first_allocation_takes_origin() {
        let mut store = AssignmentStore::new();
        let id = ParticipantId::from_name("a");

        let alloc = engine().allocate(&mut store, &accept_all, id);

        assert_eq!(alloc.index, SpiralIndex(0));
        assert_eq!(alloc.grid, GridPos::new(0, 0));
        assert_eq!(alloc.home, HomePos::new(8, 320, 8));
        assert_eq!(alloc.skipped, 0);
        assert!(!alloc.exhausted);
        assert_eq!(store.cursor(), SpiralIndex(1));
        assert_eq!(store.get_assignment(id), Some(alloc.home));
    }

    #[test]
    fn consecutive_allocations_reserve_consecutive_indices() {
        let mut store = AssignmentStore::new();
        let engine = engine();

        let indices: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| engine.allocate(&mut store, &accept_all, ParticipantId::from_name(n)).index)
            .collect();

        assert_eq!(indices, vec![SpiralIndex(0), SpiralIndex(1), SpiralIndex(2), SpiralIndex(3)]);
        assert_eq!(store.cursor(), SpiralIndex(4));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn excluded_slots_are_skipped_and_burned() {
        let layout = engine().layout().clone();
        let excluded: HashSet<ColumnPos> = (0..3)
            .map(|i| layout.column_for_index(SpiralIndex(i)))
            .collect();
        let classifier = |c: ColumnPos| excluded.contains(&c);

        let mut store = AssignmentStore::new();
        let alloc = engine().allocate(&mut store, &classifier, ParticipantId::from_name("a"));

        assert_eq!(alloc.index, SpiralIndex(3));
        assert_eq!(alloc.skipped, 3);
        assert_eq!(store.cursor(), SpiralIndex(4));

        // Next participant starts past the skipped and chosen slots
        let next = engine().allocate(&mut store, &classifier, ParticipantId::from_name("b"));
        assert_eq!(next.index, SpiralIndex(4));
    }

    #[test]
    fn exhaustion_falls_back_to_current_index() {
        let engine = AllocationEngine::new(SpiralLayout::new(25, 0, 0), true, 50, 320);
        let reject_all = |_: ColumnPos| true;
        let mut store = AssignmentStore::new();
        let id = ParticipantId::from_name("a");

        let alloc = engine.allocate(&mut store, &reject_all, id);

        assert!(alloc.exhausted);
        assert_eq!(alloc.index, SpiralIndex(50));
        assert_eq!(alloc.skipped, 50);
        assert_eq!(store.cursor(), SpiralIndex(51));
        assert_eq!(store.get_assignment(id), Some(alloc.home));
    }

    #[test]
    fn exhaustion_with_default_limit_terminates() {
        let reject_all = |_: ColumnPos| true;
        let mut store = AssignmentStore::new();

        let alloc = engine().allocate(&mut store, &reject_all, ParticipantId::from_name("a"));

        assert!(alloc.exhausted);
        assert_eq!(alloc.index, SpiralIndex(10_000));
        assert_eq!(store.cursor(), SpiralIndex(10_001));
    }

    #[test]
    fn classifier_ignored_when_policy_disabled() {
        let calls = Cell::new(0);
        let reject_all = |_: ColumnPos| {
            calls.set(calls.get() + 1);
            true
        };
        let engine = AllocationEngine::new(SpiralLayout::new(25, 0, 0), false, 10, 320);
        let mut store = AssignmentStore::new();

        let alloc = engine.allocate(&mut store, &reject_all, ParticipantId::from_name("a"));

        assert_eq!(calls.get(), 0);
        assert_eq!(alloc.index, SpiralIndex(0));
        assert!(!alloc.exhausted);
    }

    #[test]
    fn allocation_resumes_from_persisted_cursor() {
        let mut store = AssignmentStore::new();
        store.set_cursor(SpiralIndex(9));

        let alloc = engine().allocate(&mut store, &accept_all, ParticipantId::from_name("a"));

        assert_eq!(alloc.index, SpiralIndex(9));
        assert_eq!(alloc.grid, GridPos::new(50, -25));
    }
}
