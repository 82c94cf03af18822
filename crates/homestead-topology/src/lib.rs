//! Homestead Spiral Topology
//!
//! Deterministic square-spiral enumeration of lattice points, used to hand out
//! well-separated home locations one index at a time.
//!
//! # Enumeration
//!
//! Index 0 is the origin. The spiral then walks square rings of increasing
//! Chebyshev radius, each ring completely before the next:
//!
//! - Ring 0: 1 slot
//! - Ring r: 8r slots, indices `(2r-1)²` through `(2r+1)² - 1`
//!
//! The mapping is closed-form in both directions ([`spiral_to_unit`],
//! [`unit_to_spiral`]); nothing is cached or stored.
//!
//! # World Space
//!
//! [`SpiralLayout`] scales unit points by a grid spacing, shifts them by a
//! centre offset, and resolves each grid cell to the block column at its
//! centre.

mod layout;
mod spiral;
mod unit;

pub use layout::{ColumnPos, GridPos, HomePos, SpiralLayout};
pub use spiral::{
    slots_in_ring, spiral_to_unit, total_slots_through, unit_to_spiral, Spiral, SpiralIndex,
    MAX_INDEXED_RING,
};
pub use unit::UnitCoord;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_sizes_sum_to_totals() {
        let mut running = 0;
        for ring in 0..=50 {
            running += slots_in_ring(ring);
            assert_eq!(running, total_slots_through(ring));
        }
    }
}
