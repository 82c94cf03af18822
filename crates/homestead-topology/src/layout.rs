//! Scaling spiral slots into world space.
//!
//! A [`SpiralLayout`] turns unit lattice points into grid cells
//! (`unit * spacing + offset`) and grid cells into the block column at the
//! centre of each cell (`grid * cell_size + cell_size / 2`). All arithmetic is
//! done wide and saturated into `i32` world coordinates.

use crate::{spiral_to_unit, SpiralIndex, UnitCoord};

/// A grid cell in world space: a scaled and offset spiral slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridPos {
    pub x: i32,
    pub z: i32,
}

impl GridPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// A vertical block column in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnPos {
    pub x: i32,
    pub z: i32,
}

impl ColumnPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The block position in this column at height `y`.
    pub const fn at_height(&self, y: i32) -> HomePos {
        HomePos {
            x: self.x,
            y,
            z: self.z,
        }
    }
}

impl std::fmt::Display for ColumnPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// A full block position, as stored for a participant's home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HomePos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl HomePos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The column this position stands in.
    pub const fn column(&self) -> ColumnPos {
        ColumnPos {
            x: self.x,
            z: self.z,
        }
    }
}

impl std::fmt::Display for HomePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Placement parameters for the spiral in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpiralLayout {
    /// Grid cells between neighbouring spiral slots (expected >= 1)
    pub spacing: u32,
    /// Grid X of spiral index 0
    pub offset_x: i32,
    /// Grid Z of spiral index 0
    pub offset_z: i32,
    /// Blocks per grid cell edge (expected >= 1)
    pub cell_size: u32,
}

impl Default for SpiralLayout {
    fn default() -> Self {
        Self {
            spacing: 25,
            offset_x: 0,
            offset_z: 0,
            cell_size: 16,
        }
    }
}

impl SpiralLayout {
    /// Layout with one block per grid cell, so columns equal grid positions.
    pub const fn new(spacing: u32, offset_x: i32, offset_z: i32) -> Self {
        Self {
            spacing,
            offset_x,
            offset_z,
            cell_size: 1,
        }
    }

    /// Set the number of blocks per grid cell edge.
    #[must_use]
    pub const fn with_cell_size(mut self, cell_size: u32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Scale a unit coordinate into a grid cell.
    pub fn grid_for_unit(&self, unit: UnitCoord) -> GridPos {
        let spacing = i128::from(self.spacing);
        GridPos {
            x: saturate(i128::from(unit.x) * spacing + i128::from(self.offset_x)),
            z: saturate(i128::from(unit.z) * spacing + i128::from(self.offset_z)),
        }
    }

    /// Grid cell of a spiral index.
    pub fn grid_for_index(&self, index: SpiralIndex) -> GridPos {
        self.grid_for_unit(spiral_to_unit(index))
    }

    /// Block column at the centre of a grid cell.
    pub fn column_for(&self, grid: GridPos) -> ColumnPos {
        let size = i128::from(self.cell_size);
        let half = size / 2;
        ColumnPos {
            x: saturate(i128::from(grid.x) * size + half),
            z: saturate(i128::from(grid.z) * size + half),
        }
    }

    /// Centre column of a spiral index.
    pub fn column_for_index(&self, index: SpiralIndex) -> ColumnPos {
        self.column_for(self.grid_for_index(index))
    }

    /// Centre column of spiral index 0.
    pub fn origin_column(&self) -> ColumnPos {
        self.column_for_index(SpiralIndex::ORIGIN)
    }

    /// Grid cell that contains a block column.
    pub fn grid_containing(&self, column: ColumnPos) -> GridPos {
        let size = i32::try_from(self.cell_size.max(1)).unwrap_or(i32::MAX);
        GridPos {
            x: column.x.div_euclid(size),
            z: column.z.div_euclid(size),
        }
    }
}

fn saturate(value: i128) -> i32 {
    value.clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32
}
