//! Unit lattice coordinates produced by the spiral.
//!
//! A unit coordinate is an unscaled `(x, z)` lattice point. The ring of a
//! point is its Chebyshev distance from the origin, so ring `r` is the square
//! outline of points with `max(|x|, |z|) = r`.

/// A point on the unscaled square lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitCoord {
    /// East/west axis
    pub x: i64,
    /// North/south axis
    pub z: i64,
}

impl UnitCoord {
    /// Origin of the lattice.
    pub const ORIGIN: Self = Self { x: 0, z: 0 };

    /// Create a new coordinate.
    pub const fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }

    /// Chebyshev distance between two coordinates.
    pub fn chebyshev_distance(&self, other: &Self) -> u64 {
        let dx = (self.x - other.x).unsigned_abs();
        let dz = (self.z - other.z).unsigned_abs();
        dx.max(dz)
    }

    /// Ring number in the spiral (0 = origin, 1 = first ring, etc.)
    pub fn ring(&self) -> u64 {
        self.chebyshev_distance(&Self::ORIGIN)
    }
}

impl std::fmt::Display for UnitCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}
