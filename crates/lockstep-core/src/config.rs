//! Run configuration.

use crate::backend::StencilBounds;

/// Immutable configuration for one run.
///
/// Constructed once at startup and passed by reference to every component
/// that needs it; nothing mutates it afterwards. The discovered device count
/// is not part of the configuration - it is an observation, not a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Grid width in samples.
    pub nx: usize,
    /// Grid height in samples.
    pub ny: usize,
    /// Number of lockstep iterations to run.
    pub nticks: u32,
}

impl RunConfig {
    /// Create a configuration for an `nx` x `ny` grid stepped `nticks` times.
    pub fn new(nx: usize, ny: usize, nticks: u32) -> Self {
        Self { nx, ny, nticks }
    }

    /// Total samples per field.
    pub fn grid_len(&self) -> usize {
        self.nx * self.ny
    }

    /// Kernel-facing geometry with the unit halo the stencil uses.
    pub fn bounds(&self) -> StencilBounds {
        StencilBounds::unit_halo(self.nx, self.ny)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            nx: 128,
            ny: 128,
            nticks: 10,
        }
    }
}
