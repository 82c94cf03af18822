//! Readiness tracking for participants waiting on their home.
//!
//! Each pending participant moves through
//! `UNREGISTERED → PENDING → {READY, TIMED_OUT}`. Terminal outcomes are handed
//! back to the caller and the entry is dropped, so the tracker only ever holds
//! pending participants.
//!
//! # Debounce
//!
//! The readiness signal can flicker while terrain is still being generated.
//! A participant is only released after `stability_threshold` consecutive
//! positive polls; a single negative poll resets the count.
//!
//! # Timeout
//!
//! A participant still pending `timeout_ticks` after registration is released
//! anyway. Success is checked before timeout on every poll.

use std::collections::HashMap;

use homestead_topology::GridPos;
use tracing::{debug, trace};

use crate::config::HomesteadConfig;
use crate::participant::{ParticipantId, Tick};

/// A participant waiting for their target to become ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    /// Grid cell being prepared.
    pub target: GridPos,
    /// Tick the entry was registered at.
    pub started_at: Tick,
    /// Consecutive positive polls so far.
    pub stability: u32,
}

/// Outcome of polling a pending participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Still waiting; `stability` is the current consecutive positive count.
    StillPending { stability: u32 },
    /// Debounce satisfied. The entry has been removed.
    Ready(PendingEntry),
    /// Budget exceeded before the debounce was satisfied. The entry has been removed.
    TimedOut(PendingEntry),
}

impl std::fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StillPending { .. } => write!(f, "Pending"),
            Self::Ready(_) => write!(f, "Ready"),
            Self::TimedOut(_) => write!(f, "TimedOut"),
        }
    }
}

/// Debounce and timeout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessConfig {
    /// Consecutive positive polls needed for `Ready`.
    pub stability_threshold: u32,
    /// Ticks after registration beyond which an entry times out.
    pub timeout_ticks: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            stability_threshold: 3,
            timeout_ticks: 600,
        }
    }
}

impl ReadinessConfig {
    pub fn from_config(config: &HomesteadConfig) -> Self {
        Self {
            stability_threshold: config.stability_threshold,
            timeout_ticks: config.timeout_ticks(),
        }
    }
}

/// The set of participants currently waiting on preparation.
#[derive(Debug, Default)]
pub struct ReadinessTracker {
    config: ReadinessConfig,
    pending: HashMap<ParticipantId, PendingEntry>,
}

impl ReadinessTracker {
    pub fn new(config: ReadinessConfig) -> Self {
        Self {
            config,
            pending: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Start (or restart) waiting on `target` for `id`.
    ///
    /// Any previous entry for the participant is replaced.
    pub fn register(&mut self, id: ParticipantId, target: GridPos, now: Tick) {
        let entry = PendingEntry {
            target,
            started_at: now,
            stability: 0,
        };
        if self.pending.insert(id, entry).is_some() {
            debug!(participant = %id, %target, %now, "Re-registered pending participant");
        } else {
            debug!(participant = %id, %target, %now, "Registered pending participant");
        }
    }

    /// Feed one readiness sample for `id`.
    ///
    /// Returns `None` if the participant is not pending.
    pub fn poll(&mut self, id: ParticipantId, now: Tick, ready: bool) -> Option<PollOutcome> {
        let entry = self.pending.get_mut(&id)?;

        if ready {
            entry.stability = entry.stability.saturating_add(1);
        } else {
            entry.stability = 0;
        }

        trace!(
            participant = %id,
            ready,
            stability = entry.stability,
            threshold = self.config.stability_threshold,
            "Polled readiness"
        );

        if entry.stability >= self.config.stability_threshold {
            let entry = *entry;
            self.pending.remove(&id);
            return Some(PollOutcome::Ready(entry));
        }

        if now.since(entry.started_at) > self.config.timeout_ticks {
            let entry = *entry;
            self.pending.remove(&id);
            return Some(PollOutcome::TimedOut(entry));
        }

        Some(PollOutcome::StillPending {
            stability: entry.stability,
        })
    }

    /// Stop tracking `id`. Idempotent.
    pub fn cancel(&mut self, id: ParticipantId) -> Option<PendingEntry> {
        self.pending.remove(&id)
    }

    /// Whether `id` is waiting.
    pub fn is_pending(&self, id: ParticipantId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Entry for `id`, if pending.
    pub fn get(&self, id: ParticipantId) -> Option<&PendingEntry> {
        self.pending.get(&id)
    }

    /// Snapshot of pending ids, sorted so polling order is deterministic.
    pub fn pending_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.pending.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of pending participants.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ReadinessTracker {
        ReadinessTracker::new(ReadinessConfig::default())
    }

    fn id() -> ParticipantId {
        ParticipantId::from_name("waiting")
    }

    const TARGET: GridPos = GridPos::new(25, 0);

    #[test]
    fn unregistered_poll_is_noop() {
        let mut tracker = tracker();
        assert_eq!(tracker.poll(id(), Tick(20), true), None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn ready_after_three_consecutive_positives() {
        let mut tracker = tracker();
        tracker.register(id(), TARGET, Tick(0));

        assert_eq!(
            tracker.poll(id(), Tick(20), true),
            Some(PollOutcome::StillPending { stability: 1 })
        );
        assert_eq!(
            tracker.poll(id(), Tick(40), true),
            Some(PollOutcome::StillPending { stability: 2 })
        );

        let outcome = tracker.poll(id(), Tick(60), true);
        assert!(matches!(
            outcome,
            Some(PollOutcome::Ready(PendingEntry { target: TARGET, stability: 3, .. }))
        ));
        assert!(!tracker.is_pending(id()));
    }

    #[test]
    fn negative_poll_resets_counter() {
        let mut tracker = tracker();
        tracker.register(id(), TARGET, Tick(0));

        let samples = [true, true, false, true, true];
        for (i, ready) in samples.into_iter().enumerate() {
            let outcome = tracker.poll(id(), Tick(20 * (i as u64 + 1)), ready);
            assert!(
                matches!(outcome, Some(PollOutcome::StillPending { .. })),
                "poll {} resolved early: {:?}",
                i + 1,
                outcome
            );
        }
        assert_eq!(tracker.get(id()).map(|e| e.stability), Some(2));

        let sixth = tracker.poll(id(), Tick(120), true);
        assert!(matches!(sixth, Some(PollOutcome::Ready(_))));
    }

    #[test]
    fn times_out_with_partial_stability() {
        let mut tracker = tracker();
        tracker.register(id(), TARGET, Tick(100));

        assert!(matches!(
            tracker.poll(id(), Tick(680), true),
            Some(PollOutcome::StillPending { stability: 1 })
        ));

        // 601 ticks elapsed: over the 600 tick budget
        let outcome = tracker.poll(id(), Tick(701), false);
        assert!(matches!(
            outcome,
            Some(PollOutcome::TimedOut(PendingEntry { target: TARGET, .. }))
        ));
        assert!(!tracker.is_pending(id()));

        let mut tracker = self::tracker();
        tracker.register(id(), TARGET, Tick(0));
        tracker.poll(id(), Tick(580), true);
        assert!(matches!(
            tracker.poll(id(), Tick(601), true),
            Some(PollOutcome::TimedOut(PendingEntry { stability: 2, .. }))
        ));
    }

    #[test]
    fn timeout_is_strictly_greater_than_budget() {
        let mut tracker = tracker();
        tracker.register(id(), TARGET, Tick(0));
        assert!(matches!(
            tracker.poll(id(), Tick(600), false),
            Some(PollOutcome::StillPending { stability: 0 })
        ));
    }

    #[test]
    fn success_wins_over_timeout_on_same_poll() {
        let mut tracker = tracker();
        tracker.register(id(), TARGET, Tick(0));
        tracker.poll(id(), Tick(560), true);
        tracker.poll(id(), Tick(580), true);

        let outcome = tracker.poll(id(), Tick(10_000), true);
        assert!(matches!(outcome, Some(PollOutcome::Ready(_))));
    }

    #[test]
    fn register_overwrites_previous_entry() {
        let mut tracker = tracker();
        tracker.register(id(), TARGET, Tick(0));
        tracker.poll(id(), Tick(20), true);
        tracker.poll(id(), Tick(40), true);

        tracker.register(id(), GridPos::new(0, 25), Tick(50));

        let entry = tracker.get(id()).copied().unwrap();
        assert_eq!(entry.stability, 0);
        assert_eq!(entry.started_at, Tick(50));
        assert_eq!(entry.target, GridPos::new(0, 25));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut tracker = tracker();
        tracker.register(id(), TARGET, Tick(0));

        assert!(tracker.cancel(id()).is_some());
        assert!(tracker.cancel(id()).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn custom_threshold() {
        let mut tracker = ReadinessTracker::new(ReadinessConfig {
            stability_threshold: 1,
            timeout_ticks: 10,
        });
        tracker.register(id(), TARGET, Tick(0));
        assert!(matches!(tracker.poll(id(), Tick(1), true), Some(PollOutcome::Ready(_))));
    }

    #[test]
    fn pending_ids_are_sorted() {
        let mut tracker = tracker();
        let names = ["c", "a", "b"];
        for name in names {
            tracker.register(ParticipantId::from_name(name), TARGET, Tick(0));
        }
        let ids = tracker.pending_ids();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(PollOutcome::StillPending { stability: 1 }.to_string(), "Pending");
    }
}
