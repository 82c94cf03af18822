//! Durable assignment state: the spiral cursor and participant homes.
//!
//! The store is the sole owner of persisted state. It mutates in memory and
//! raises a dirty flag; flushing is the host persistence layer's job (see
//! [`StoreFile`](crate::persist::StoreFile)).

use std::collections::BTreeMap;

use homestead_topology::{HomePos, SpiralIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::participant::ParticipantId;

/// Logical persisted layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Next untried spiral index. May only be absent from a record with no assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiral_index: Option<u64>,
    /// One row per homed participant, ordered by participant id.
    #[serde(default)]
    pub assignments: Vec<AssignmentRecord>,
}

/// A single persisted assignment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub participant_id: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// In-memory assignment store.
#[derive(Debug, Clone, Default)]
pub struct AssignmentStore {
    cursor: SpiralIndex,
    assignments: BTreeMap<ParticipantId, HomePos>,
    dirty: bool,
}

impl AssignmentStore {
    /// Empty store at spiral index 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from its persisted record.
    ///
    /// Rejects unparsable or duplicated participant ids, and assignments
    /// without a cursor; the caller decides how to recover.
    pub fn from_record(record: StoreRecord) -> Result<Self> {
        let cursor = match record.spiral_index {
            Some(index) => index,
            None if record.assignments.is_empty() => 0,
            None => {
                return Err(Error::CorruptRecord(format!(
                    "spiral cursor missing alongside {} assignments",
                    record.assignments.len()
                )));
            }
        };

        let mut assignments = BTreeMap::new();
        for row in record.assignments {
            let id: ParticipantId = row.participant_id.parse()?;
            let previous = assignments.insert(id, HomePos::new(row.x, row.y, row.z));
            if previous.is_some() {
                return Err(Error::CorruptRecord(format!(
                    "participant {} assigned more than once",
                    id
                )));
            }
        }

        debug!(
            cursor,
            assignments = assignments.len(),
            "Loaded assignment store"
        );

        Ok(Self {
            cursor: SpiralIndex(cursor),
            assignments,
            dirty: false,
        })
    }

    /// Snapshot the store as its persisted record.
    pub fn to_record(&self) -> StoreRecord {
        StoreRecord {
            spiral_index: Some(self.cursor.value()),
            assignments: self
                .assignments
                .iter()
                .map(|(id, pos)| AssignmentRecord {
                    participant_id: id.to_string(),
                    x: pos.x,
                    y: pos.y,
                    z: pos.z,
                })
                .collect(),
        }
    }

    // --- Assignments ---

    /// Home recorded for a participant, if any.
    pub fn get_assignment(&self, id: ParticipantId) -> Option<HomePos> {
        self.assignments.get(&id).copied()
    }

    /// Record or overwrite a participant's home.
    pub fn put_assignment(&mut self, id: ParticipantId, pos: HomePos) {
        self.assignments.insert(id, pos);
        self.dirty = true;
    }

    /// All assignments in participant id order.
    pub fn assignments(&self) -> impl Iterator<Item = (&ParticipantId, &HomePos)> {
        self.assignments.iter()
    }

    /// Number of assigned participants.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Check if no participant has been assigned.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    // --- Cursor ---

    /// Next untried spiral index.
    pub fn cursor(&self) -> SpiralIndex {
        self.cursor
    }

    /// Move the cursor forward.
    ///
    /// The cursor never moves backwards outside of [`reset`](Self::reset);
    /// such requests are refused and `false` is returned.
    pub fn set_cursor(&mut self, index: SpiralIndex) -> bool {
        if index < self.cursor {
            warn!(
                current = %self.cursor,
                requested = %index,
                "Refusing to move spiral cursor backwards"
            );
            return false;
        }
        if index != self.cursor {
            self.cursor = index;
            self.dirty = true;
        }
        true
    }

    /// Wipe every assignment and return the cursor to 0.
    pub fn reset(&mut self) {
        info!(
            cleared = self.assignments.len(),
            cursor = %self.cursor,
            "Resetting assignment store"
        );
        self.cursor = SpiralIndex::ORIGIN;
        self.assignments.clear();
        self.dirty = true;
    }

    // --- Save scheduling ---

    /// Whether there are changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful flush.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
