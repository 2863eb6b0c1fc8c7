//! Row-major 2D sample grids.

/// A fixed-size 2D grid of f32 samples, stored as a flat row-major vector.
///
/// Every field participating in a run shares the same `nx` x `ny` shape:
/// one host-resident staging field per device slot, plus the host
/// reference's current/next pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    nx: usize,
    ny: usize,
    data: Vec<f32>,
}

impl Field {
    /// Create a zero-filled field.
    pub fn zeroed(nx: usize, ny: usize) -> Self {
        Self {
            nx,
            ny,
            data: vec![0.0; nx * ny],
        }
    }

    /// Wrap existing samples.
    ///
    /// # Panics
    ///
    /// Panics if `samples.len() != nx * ny`.
    pub fn from_samples(nx: usize, ny: usize, samples: Vec<f32>) -> Self {
        assert_eq!(
            samples.len(),
            nx * ny,
            "sample count does not match {nx}x{ny} grid"
        );
        Self {
            nx,
            ny,
            data: samples,
        }
    }

    /// Grid width.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Grid height.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Total sample count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid has no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear index of column `i`, row `j`.
    #[inline(always)]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Sample at column `i`, row `j`.
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[self.idx(i, j)]
    }

    /// All samples, row-major.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// All samples, row-major, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Whether `other` has the same `nx` x `ny` shape.
    pub fn same_shape(&self, other: &Field) -> bool {
        self.nx == other.nx && self.ny == other.ny
    }
}
