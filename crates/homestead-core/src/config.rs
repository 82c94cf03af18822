//! Homestead configuration.

use std::str::FromStr;
use std::time::Duration;

use homestead_topology::SpiralLayout;

use crate::error::{Error, Result};

/// Highest accepted host tick rate. Keeps the tick period at or above one millisecond.
pub const MAX_TICKS_PER_SECOND: u32 = 1000;

/// Configuration for allocation, readiness polling and placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomesteadConfig {
    /// Distance between spiral points in grid cells (25 = 400 blocks at 16 blocks per cell).
    pub grid_spacing: u32,

    /// Grid X offset of the spiral centre.
    pub center_offset_x: i32,

    /// Grid Z offset of the spiral centre.
    pub center_offset_z: i32,

    /// Blocks per grid cell edge. Homes sit at the centre column of their cell.
    pub cell_size: u32,

    /// Discard candidates that land on excluded terrain (e.g. ocean or river).
    pub skip_excluded_terrain: bool,

    /// Candidates inspected before falling back to the current index.
    pub max_attempts: u32,

    /// Consecutive positive readiness polls needed to release a participant.
    pub stability_threshold: u32,

    /// Ticks between readiness polls.
    pub poll_interval_ticks: u64,

    /// How long a participant may wait before being released anyway.
    pub readiness_timeout: Duration,

    /// Host tick rate, used to convert the timeout into ticks.
    pub ticks_per_second: u32,

    /// Height at which waiting participants are held and provisional homes recorded.
    pub hold_altitude: i32,

    /// Radius, in grid cells, of the area kept loaded around a target.
    pub reservation_radius: u32,

    /// Height of the default world spawn aligned to spiral index 0.
    pub spawn_height: i32,
}

impl Default for HomesteadConfig {
    fn default() -> Self {
        Self {
            grid_spacing: 25,
            center_offset_x: 0,
            center_offset_z: 0,
            cell_size: 16,
            skip_excluded_terrain: true,
            max_attempts: 10_000,
            stability_threshold: 3,
            poll_interval_ticks: 20,
            readiness_timeout: Duration::from_secs(30),
            ticks_per_second: 20,
            hold_altitude: 320,
            reservation_radius: 3,
            spawn_height: 64,
        }
    }
}

impl HomesteadConfig {
    /// Create config from `HOMESTEAD_*` environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            grid_spacing: parse_or(&lookup, "HOMESTEAD_GRID_SPACING", defaults.grid_spacing)?,
            center_offset_x: parse_or(
                &lookup,
                "HOMESTEAD_CENTER_OFFSET_X",
                defaults.center_offset_x,
            )?,
            center_offset_z: parse_or(
                &lookup,
                "HOMESTEAD_CENTER_OFFSET_Z",
                defaults.center_offset_z,
            )?,
            cell_size: parse_or(&lookup, "HOMESTEAD_CELL_SIZE", defaults.cell_size)?,
            skip_excluded_terrain: parse_or(
                &lookup,
                "HOMESTEAD_SKIP_EXCLUDED_TERRAIN",
                defaults.skip_excluded_terrain,
            )?,
            max_attempts: parse_or(&lookup, "HOMESTEAD_MAX_ATTEMPTS", defaults.max_attempts)?,
            stability_threshold: parse_or(
                &lookup,
                "HOMESTEAD_STABILITY_THRESHOLD",
                defaults.stability_threshold,
            )?,
            poll_interval_ticks: parse_or(
                &lookup,
                "HOMESTEAD_POLL_INTERVAL_TICKS",
                defaults.poll_interval_ticks,
            )?,
            readiness_timeout: Duration::from_secs(parse_or(
                &lookup,
                "HOMESTEAD_READINESS_TIMEOUT_SECS",
                defaults.readiness_timeout.as_secs(),
            )?),
            ticks_per_second: parse_or(
                &lookup,
                "HOMESTEAD_TICKS_PER_SECOND",
                defaults.ticks_per_second,
            )?,
            hold_altitude: parse_or(&lookup, "HOMESTEAD_HOLD_ALTITUDE", defaults.hold_altitude)?,
            reservation_radius: parse_or(
                &lookup,
                "HOMESTEAD_RESERVATION_RADIUS",
                defaults.reservation_radius,
            )?,
            spawn_height: parse_or(&lookup, "HOMESTEAD_SPAWN_HEIGHT", defaults.spawn_height)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every value is within its allowed range.
    pub fn validate(&self) -> Result<()> {
        let at_least_one = [
            ("grid_spacing", u64::from(self.grid_spacing)),
            ("cell_size", u64::from(self.cell_size)),
            ("max_attempts", u64::from(self.max_attempts)),
            ("stability_threshold", u64::from(self.stability_threshold)),
            ("poll_interval_ticks", self.poll_interval_ticks),
            ("ticks_per_second", u64::from(self.ticks_per_second)),
        ];
        for (name, value) in at_least_one {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be at least 1")));
            }
        }
        if self.ticks_per_second > MAX_TICKS_PER_SECOND {
            return Err(Error::InvalidConfig(format!(
                "ticks_per_second must be at most {MAX_TICKS_PER_SECOND}"
            )));
        }
        Ok(())
    }

    /// Wall-clock time between host ticks.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.ticks_per_second.clamp(1, MAX_TICKS_PER_SECOND)
    }

    /// Spiral placement derived from the grid settings.
    pub fn layout(&self) -> SpiralLayout {
        SpiralLayout::new(self.grid_spacing, self.center_offset_x, self.center_offset_z)
            .with_cell_size(self.cell_size)
    }

    /// Readiness timeout expressed in host ticks, rounded up.
    pub fn timeout_ticks(&self) -> u64 {
        let millis = self.readiness_timeout.as_millis();
        let ticks = (millis * u128::from(self.ticks_per_second)).div_ceil(1000);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    /// Set the grid spacing.
    #[must_use]
    pub fn with_grid_spacing(mut self, spacing: u32) -> Self {
        self.grid_spacing = spacing;
        self
    }

    /// Set the spiral centre offset.
    #[must_use]
    pub fn with_center_offset(mut self, x: i32, z: i32) -> Self {
        self.center_offset_x = x;
        self.center_offset_z = z;
        self
    }

    /// Set blocks per grid cell edge.
    #[must_use]
    pub fn with_cell_size(mut self, cell_size: u32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Enable or disable skipping excluded terrain.
    #[must_use]
    pub fn with_skip_excluded_terrain(mut self, skip: bool) -> Self {
        self.skip_excluded_terrain = skip;
        self
    }

    /// Set the allocation attempt limit.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the readiness debounce threshold.
    #[must_use]
    pub fn with_stability_threshold(mut self, threshold: u32) -> Self {
        self.stability_threshold = threshold;
        self
    }

    /// Set the ticks between readiness polls.
    #[must_use]
    pub fn with_poll_interval(mut self, ticks: u64) -> Self {
        self.poll_interval_ticks = ticks;
        self
    }

    /// Set the readiness timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = timeout;
        self
    }

    /// Set the host tick rate.
    #[must_use]
    pub fn with_ticks_per_second(mut self, ticks: u32) -> Self {
        self.ticks_per_second = ticks;
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}
