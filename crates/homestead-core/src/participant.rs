//! Participant identity and host time.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a participant, persisted as a hyphenated UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    /// Wrap an existing UUID.
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Deterministic id for a synthetic participant known only by name.
    ///
    /// The same name always yields the same id, so simulated joins exercise
    /// the existing-assignment path on repeat.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v3(
            &Uuid::NAMESPACE_OID,
            format!("homestead-participant:{name}").as_bytes(),
        ))
    }

    /// Fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for ParticipantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A reading of the host's monotonic tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u64);

impl Tick {
    #[inline]
    pub const fn new(tick: u64) -> Self {
        Self(tick)
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier`, zero if `earlier` is in the future.
    #[inline]
    pub const fn since(&self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// True on ticks that fall on a multiple of `interval`.
    #[inline]
    pub const fn is_multiple_of(&self, interval: u64) -> bool {
        interval != 0 && self.0 % interval == 0
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_ids_are_stable() {
        let a = ParticipantId::from_name("alice");
        assert_eq!(a, ParticipantId::from_name("alice"));
        assert_ne!(a, ParticipantId::from_name("bob"));
    }

    #[test]
    fn display_parses_back() {
        let id = ParticipantId::random();
        let parsed: ParticipantId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("not-a-uuid".parse::<ParticipantId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ParticipantId::from_name("carol");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn tick_arithmetic() {
        assert_eq!(Tick(650).since(Tick(40)), 610);
        assert_eq!(Tick(5).since(Tick(40)), 0);
        assert!(Tick(40).is_multiple_of(20));
        assert!(!Tick(41).is_multiple_of(20));
        assert!(!Tick(40).is_multiple_of(0));
    }
}
