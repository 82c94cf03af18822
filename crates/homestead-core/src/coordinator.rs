//! Join coordination.
//!
//! The coordinator owns the assignment store and the readiness tracker and
//! drives both from host events:
//!
//! - `on_join` allocates (or resumes) a home and puts the participant on hold
//! - `on_tick` polls readiness and places participants once their home is ready
//! - `on_leave` drops a pending participant
//! - `on_respawn`, `on_server_starting` and `on_recall_point_set` keep the
//!   host's spawn handling pointed at assigned homes
//!
//! Host capabilities are passed into every call; the coordinator holds no
//! reference to the host between calls.

use homestead_topology::{ColumnPos, HomePos, SpiralIndex, SpiralLayout};
use tracing::{debug, error, info, warn};

use crate::allocation::{Allocation, AllocationEngine};
use crate::config::HomesteadConfig;
use crate::error::Result;
use crate::host::WorldHost;
use crate::participant::{ParticipantId, Tick};
use crate::readiness::{PollOutcome, ReadinessConfig, ReadinessTracker};
use crate::store::AssignmentStore;

/// What `on_join` did for a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A fresh home was allocated and preparation requested.
    Allocated(Allocation),
    /// Participant was still awaiting preparation from an earlier session.
    Resumed { home: HomePos },
    /// Participant already has a ready home; nothing to do.
    AlreadyHomed { home: HomePos },
    /// Participant is already being tracked in this session.
    AlreadyPending,
}

/// A pending participant leaving the tracker during `on_tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Home is ready and the participant was placed on its surface.
    Homed { id: ParticipantId, home: HomePos },
    /// Readiness never stabilised; the participant was released in place.
    TimedOut { id: ParticipantId, target: ColumnPos },
    /// Participant went offline while pending.
    Abandoned { id: ParticipantId },
}

impl Resolution {
    pub fn participant(&self) -> ParticipantId {
        match self {
            Self::Homed { id, .. } | Self::TimedOut { id, .. } | Self::Abandoned { id } => *id,
        }
    }
}

/// Who issued a recall point change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallOrigin {
    /// The host, on behalf of the participant (e.g. using a bed).
    Host,
    /// The coordinator re-issuing a set it asked for.
    Coordinator,
}

/// How the caller should treat a recall point change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallDecision {
    /// Apply it unchanged.
    PassThrough,
    /// Re-issue it as a forced set with [`RecallOrigin::Coordinator`].
    Force,
}

/// Drives allocation, readiness and placement for joining participants.
#[derive(Debug)]
pub struct JoinCoordinator {
    config: HomesteadConfig,
    engine: AllocationEngine,
    store: AssignmentStore,
    tracker: ReadinessTracker,
    last_poll: Option<Tick>,
}

impl JoinCoordinator {
    /// Build a coordinator around a loaded store.
    pub fn new(config: HomesteadConfig, store: AssignmentStore) -> Result<Self> {
        config.validate()?;

        info!(
            cursor = %store.cursor(),
            assignments = store.len(),
            spacing = config.grid_spacing,
            "Join coordinator ready"
        );

        Ok(Self {
            engine: AllocationEngine::from_config(&config),
            tracker: ReadinessTracker::new(ReadinessConfig::from_config(&config)),
            config,
            store,
            last_poll: None,
        })
    }

    pub fn config(&self) -> &HomesteadConfig {
        &self.config
    }

    pub fn layout(&self) -> &SpiralLayout {
        self.engine.layout()
    }

    pub fn store(&self) -> &AssignmentStore {
        &self.store
    }

    /// Mutable store access for the persistence layer (flush, mark clean).
    pub fn store_mut(&mut self) -> &mut AssignmentStore {
        &mut self.store
    }

    pub fn tracker(&self) -> &ReadinessTracker {
        &self.tracker
    }

    /// Next untried spiral index.
    pub fn current_cursor(&self) -> SpiralIndex {
        self.store.cursor()
    }

    /// Recorded home of a participant.
    pub fn assignment(&self, id: ParticipantId) -> Option<HomePos> {
        self.store.get_assignment(id)
    }

    /// Handle a participant joining.
    pub fn on_join<H>(&mut self, host: &mut H, id: ParticipantId, now: Tick) -> JoinOutcome
    where
        H: WorldHost + ?Sized,
    {
        if let Some(home) = self.store.get_assignment(id) {
            if self.tracker.is_pending(id) {
                debug!(participant = %id, "Join while already pending, ignoring");
                return JoinOutcome::AlreadyPending;
            }

            if !host.is_awaiting_preparation(id) {
                debug!(participant = %id, %home, "Participant already homed");
                return JoinOutcome::AlreadyHomed { home };
            }

            let column = home.column();
            let grid = self.layout().grid_containing(column);
            let hold = column.at_height(self.config.hold_altitude);

            self.tracker.register(id, grid, now);
            host.reserve_area(grid, self.config.reservation_radius);
            host.place_participant_at(id, hold, true);

            info!(
                participant = %id,
                x = column.x,
                z = column.z,
                "Resuming wait for home preparation"
            );
            return JoinOutcome::Resumed { home: hold };
        }

        if let Some(stale) = self.tracker.cancel(id) {
            host.release_area(stale.target, self.config.reservation_radius);
            debug!(participant = %id, target = %stale.target, "Dropped stale pending entry");
        }

        let allocation = self.engine.allocate(&mut self.store, &*host, id);

        host.reserve_area(allocation.grid, self.config.reservation_radius);
        match host.request_preparation(allocation.home) {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    participant = %id,
                    home = %allocation.home,
                    "Host declined preparation request"
                );
            }
            Err(e) => {
                error!(
                    participant = %id,
                    home = %allocation.home,
                    error = %e,
                    "Preparation request failed, participant stays pending"
                );
            }
        }

        self.tracker.register(id, allocation.grid, now);
        host.place_participant_at(id, allocation.home, true);
        host.set_awaiting_preparation(id, true);

        info!(
            participant = %id,
            index = %allocation.index,
            x = allocation.home.x,
            z = allocation.home.z,
            "Allocated home"
        );
        JoinOutcome::Allocated(allocation)
    }

    /// Periodic driver. Polls pending participants on poll-interval ticks.
    ///
    /// Calling it more than once for the same tick polls only once.
    pub fn on_tick<H>(&mut self, host: &mut H, now: Tick) -> Vec<Resolution>
    where
        H: WorldHost + ?Sized,
    {
        if !now.is_multiple_of(self.config.poll_interval_ticks) || self.last_poll == Some(now) {
            return Vec::new();
        }
        self.last_poll = Some(now);

        let mut resolved = Vec::new();
        for id in self.tracker.pending_ids() {
            let Some(entry) = self.tracker.get(id).copied() else {
                continue;
            };
            let column = self.layout().column_for(entry.target);

            if !host.is_online(id) {
                self.tracker.cancel(id);
                host.release_area(entry.target, self.config.reservation_radius);
                info!(participant = %id, "Pending participant went offline");
                resolved.push(Resolution::Abandoned { id });
                continue;
            }

            let ready = host.is_ground_present(column);
            match self.tracker.poll(id, now, ready) {
                Some(PollOutcome::Ready(entry)) => {
                    let surface_y = host.probe_true_surface_y(column);
                    let home = column.at_height(surface_y.saturating_add(1));

                    self.store.put_assignment(id, home);
                    host.release_area(entry.target, self.config.reservation_radius);
                    host.set_awaiting_preparation(id, false);
                    host.place_participant_at(id, home, false);
                    host.set_persistent_recall_point(id, home);

                    info!(
                        participant = %id,
                        x = home.x,
                        y = home.y,
                        z = home.z,
                        waited = now.since(entry.started_at),
                        "Home ready, participant placed"
                    );
                    resolved.push(Resolution::Homed { id, home });
                }
                Some(PollOutcome::TimedOut(entry)) => {
                    host.release_area(entry.target, self.config.reservation_radius);
                    host.set_awaiting_preparation(id, false);

                    warn!(
                        participant = %id,
                        x = column.x,
                        z = column.z,
                        stability = entry.stability,
                        "Home preparation timed out, releasing participant"
                    );
                    resolved.push(Resolution::TimedOut { id, target: column });
                }
                Some(PollOutcome::StillPending { .. }) | None => {}
            }
        }
        resolved
    }

    /// Handle a participant leaving. Returns whether they were pending.
    ///
    /// The host's awaiting flag is left alone so the next join resumes.
    pub fn on_leave<H>(&mut self, host: &mut H, id: ParticipantId) -> bool
    where
        H: WorldHost + ?Sized,
    {
        match self.tracker.cancel(id) {
            Some(entry) => {
                host.release_area(entry.target, self.config.reservation_radius);
                debug!(participant = %id, "Pending participant left");
                true
            }
            None => false,
        }
    }

    /// Respawn fallback for participants without a usable respawn point.
    ///
    /// Returns the home the participant was sent to, if any.
    pub fn on_respawn<H>(
        &mut self,
        host: &mut H,
        id: ParticipantId,
        has_valid_spawn: bool,
    ) -> Option<HomePos>
    where
        H: WorldHost + ?Sized,
    {
        if has_valid_spawn {
            return None;
        }
        let home = self.store.get_assignment(id)?;
        host.place_participant_at(id, home, false);
        host.set_persistent_recall_point(id, home);
        debug!(participant = %id, %home, "Respawned at assigned home");
        Some(home)
    }

    /// Align the world's default spawn with spiral index 0.
    pub fn on_server_starting<H>(&mut self, host: &mut H) -> HomePos
    where
        H: WorldHost + ?Sized,
    {
        let spawn = self.layout().origin_column().at_height(self.config.spawn_height);
        host.set_default_spawn(spawn);
        info!(%spawn, "Default spawn aligned with spiral origin");
        spawn
    }

    /// Decide how to apply a recall point change.
    ///
    /// Unforced sets from the host would be forgotten by the host, so they
    /// are upgraded to forced. The coordinator's own re-issue passes through.
    pub fn on_recall_point_set(
        &self,
        pos: HomePos,
        forced: bool,
        origin: RecallOrigin,
    ) -> RecallDecision {
        match (origin, forced) {
            (RecallOrigin::Host, false) => {
                debug!(%pos, "Upgrading recall point to forced");
                RecallDecision::Force
            }
            _ => RecallDecision::PassThrough,
        }
    }

    /// Wipe all assignments and return the cursor to 0.
    ///
    /// Every pending participant is dropped from the tracker and its area
    /// released, so no stale target can resolve into the fresh store. Their
    /// awaiting flags stay set; the next join allocates them a new home.
    /// Returns the participants that were pending.
    pub fn reset_all_data<H>(&mut self, host: &mut H) -> Vec<ParticipantId>
    where
        H: WorldHost + ?Sized,
    {
        let pending = self.tracker.pending_ids();
        warn!(pending = pending.len(), "Resetting all assignment data");

        for &id in &pending {
            if let Some(entry) = self.tracker.cancel(id) {
                host.release_area(entry.target, self.config.reservation_radius);
            }
        }
        self.store.reset();
        pending
    }
}
