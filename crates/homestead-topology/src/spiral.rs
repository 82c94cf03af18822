//! Square spiral enumeration of the unit lattice.
//!
//! Index 0 is the origin. Every following index walks the square ring of
//! radius `r` before moving on to ring `r + 1`:
//!
//! - Ring 0: just the origin (1 slot)
//! - Ring r > 0: the `8r` points with `max(|x|, |z|) = r`
//!
//! Ring `r` ends at index `(2r+1)² - 1`, which sits at the corner `(r, -r)`.
//! Counting backwards from that corner the ring is traced along four edges of
//! length `2r`: bottom `(r,-r) → (-r,-r)`, left `(-r,-r) → (-r,r)`,
//! top `(-r,r) → (r,r)` and right `(r,r) → (r,-r+1)`.
//!
//! ```text
//!  index:  0      1      2      3      4       5       6       7      8
//!  unit:  (0,0)  (1,0)  (1,1)  (0,1)  (-1,1)  (-1,0)  (-1,-1) (0,-1) (1,-1)
//! ```

use crate::UnitCoord;

/// A spiral index - unique slot identifier in the spiral enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpiralIndex(pub u64);

impl SpiralIndex {
    /// Origin slot.
    pub const ORIGIN: Self = Self(0);

    /// Create from raw index.
    #[inline]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Get the raw index value.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The index immediately after this one, saturating at `u64::MAX`.
    #[inline]
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Determine which ring this index falls in.
    ///
    /// Ring 0: index 0
    /// Ring 1: indices 1-8
    /// Ring 2: indices 9-24
    /// Ring n: indices from (2n-1)² to (2n+1)²-1
    ///
    /// Equivalent to `ceil((sqrt(n + 1) - 1) / 2)`, computed without floats.
    pub fn ring(&self) -> u64 {
        if self.0 == 0 {
            return 0;
        }
        (isqrt(self.0) + 1) / 2
    }

    /// Offset within the ring (0 to 8n-1 for ring n > 0).
    pub fn offset_in_ring(&self) -> u64 {
        let ring = self.ring();
        if ring == 0 {
            return 0;
        }
        self.0 - total_slots_through(ring - 1)
    }
}

impl From<u64> for SpiralIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SpiralIndex> for u64 {
    fn from(value: SpiralIndex) -> Self {
        value.0
    }
}

impl std::fmt::Display for SpiralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ring containing `u64::MAX`. Larger rings have no addressable slots.
pub const MAX_INDEXED_RING: u64 = 1 << 31;

/// Total number of slots in ring n.
///
/// - Ring 0: 1 slot (origin)
/// - Ring n > 0: 8n slots
#[inline]
pub const fn slots_in_ring(ring: u64) -> u64 {
    if ring == 0 {
        1
    } else {
        ring.saturating_mul(8)
    }
}

/// Total slots through ring n (inclusive).
///
/// Formula: (2n+1)², saturating for rings beyond the `u64` index range.
#[inline]
pub const fn total_slots_through(ring: u64) -> u64 {
    let side = ring.saturating_mul(2).saturating_add(1);
    side.saturating_mul(side)
}

/// Floor of the square root, exact over the whole `u64` range.
fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    // The float estimate can be off by one in either direction for large n.
    let mut root = (n as f64).sqrt() as u64;
    while root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).map_or(false, |sq| sq <= n) {
        root += 1;
    }
    root
}

/// Iterator over spiral coordinates.
pub struct Spiral {
    current: u64,
    limit: Option<u64>,
}

impl Spiral {
    /// Create an infinite spiral iterator starting from origin.
    pub fn new() -> Self {
        Self {
            current: 0,
            limit: None,
        }
    }

    /// Create a spiral iterator that yields `count` coordinates.
    pub fn take_slots(count: u64) -> Self {
        Self {
            current: 0,
            limit: Some(count),
        }
    }

    /// Create a spiral iterator for a specific ring range.
    pub fn rings(start_ring: u64, end_ring: u64) -> Self {
        let start_slot = if start_ring == 0 {
            0
        } else {
            total_slots_through(start_ring - 1)
        };
        let end_slot = total_slots_through(end_ring);

        Self {
            current: start_slot,
            limit: Some(end_slot),
        }
    }
}

impl Default for Spiral {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Spiral {
    type Item = UnitCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(limit) = self.limit {
            if self.current >= limit {
                return None;
            }
        }

        let coord = spiral_to_unit(SpiralIndex(self.current));
        self.current = self.current.checked_add(1)?;
        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.current);
                (remaining as usize, Some(remaining as usize))
            }
            None => (usize::MAX, None),
        }
    }
}

/// Convert a spiral index to its unit lattice coordinate.
///
/// Total over every `u64`. Intermediates are `i128` so the ring maximum
/// `(2r+1)² - 1` cannot overflow near the top of the index range.
pub fn spiral_to_unit(index: SpiralIndex) -> UnitCoord {
    if index.0 == 0 {
        return UnitCoord::ORIGIN;
    }

    let n = i128::from(index.0);
    let r = i128::from(index.ring());
    let side = 2 * r;
    let max = (2 * r + 1) * (2 * r + 1) - 1;

    // Distance backwards from the ring's last slot at (r, -r)
    let d = max - n;

    let (x, z) = if d <= side {
        (r - d, -r)
    } else if d <= 2 * side {
        (-r, -r + (d - side))
    } else if d <= 3 * side {
        (-r + (d - 2 * side), r)
    } else {
        (r, r - (d - 3 * side))
    };

    // r <= 2^31 for any u64 index, so both axes fit in i64.
    UnitCoord::new(x as i64, z as i64)
}

/// Convert a unit coordinate to its spiral index.
///
/// Inverse of [`spiral_to_unit`]. Returns `None` when the coordinate lies on
/// a ring whose indices exceed the `u64` range.
pub fn unit_to_spiral(coord: UnitCoord) -> Option<SpiralIndex> {
    if coord == UnitCoord::ORIGIN {
        return Some(SpiralIndex::ORIGIN);
    }
    if coord.ring() > MAX_INDEXED_RING {
        return None;
    }

    let r = i128::from(coord.ring());
    let (x, z) = (i128::from(coord.x), i128::from(coord.z));
    let side = 2 * r;
    let max = (2 * r + 1) * (2 * r + 1) - 1;

    // Corners belong to the edge that reaches them first when walking back
    // from (r, -r): bottom, then left, then top, then right.
    let d = if z == -r {
        r - x
    } else if x == -r {
        side + z + r
    } else if z == r {
        2 * side + x + r
    } else {
        3 * side + r - z
    };

    u64::try_from(max - d).ok().map(SpiralIndex)
}
