//! Host-side stencil kernel.
//!
//! The host-executed equivalent of the device kernel: a weighted 5-point
//! average over the interior region, with halo samples copied through
//! unchanged. The device kernel in `lockstep-cuda` implements the same
//! arithmetic, so host and device results are directly comparable.

#![warn(missing_docs)]
#![warn(clippy::all)]

use rayon::prelude::*;

use lockstep_core::backend::StencilBounds;
use lockstep_core::field::Field;

/// Grids with at least this many samples take the parallel path.
///
/// Below it the per-row scheduling overhead outweighs the work.
const PARALLEL_THRESHOLD: usize = 256 * 256;

/// Weight of the center sample.
const CENTER_WEIGHT: f32 = 0.25;
/// Weight of each of the four neighbor samples (weights sum to 1).
const NEIGHBOR_WEIGHT: f32 = 0.1875;

/// Run one stencil step over `input`, writing into `output`.
///
/// # Panics
///
/// Panics if the two fields do not match `bounds`.
pub fn stencil_step(bounds: &StencilBounds, input: &Field, output: &mut Field) {
    stencil_step_slice(bounds, input.as_slice(), output.as_mut_slice());
}

/// Slice-level form of [`stencil_step`], row-major samples.
///
/// # Panics
///
/// Panics if either slice's length does not match `bounds`.
pub fn stencil_step_slice(bounds: &StencilBounds, input: &[f32], output: &mut [f32]) {
    assert_eq!(input.len(), bounds.len(), "input does not match bounds");
    assert_eq!(output.len(), bounds.len(), "output does not match bounds");
    debug_assert!(
        bounds.halo_x >= 1 && bounds.halo_y >= 1,
        "the 5-point kernel needs a halo of at least one sample"
    );

    // Halo margin is carried through unchanged.
    output.copy_from_slice(input);

    if bounds.len() >= PARALLEL_THRESHOLD {
        step_interior_parallel(bounds, input, output);
    } else {
        step_interior_sequential(bounds, input, output);
    }
}

#[inline(always)]
fn updated(input: &[f32], idx: usize, nx: usize) -> f32 {
    CENTER_WEIGHT * input[idx]
        + NEIGHBOR_WEIGHT * (input[idx - 1] + input[idx + 1] + input[idx - nx] + input[idx + nx])
}

fn step_interior_sequential(bounds: &StencilBounds, input: &[f32], output: &mut [f32]) {
    let nx = bounds.nx;
    for j in bounds.interior_y() {
        let row = j * nx;
        for i in bounds.interior_x() {
            output[row + i] = updated(input, row + i, nx);
        }
    }
}

fn step_interior_parallel(bounds: &StencilBounds, input: &[f32], output: &mut [f32]) {
    let nx = bounds.nx;
    let interior_y = bounds.interior_y();
    output
        .par_chunks_mut(nx)
        .enumerate()
        .for_each(|(j, row)| {
            if interior_y.contains(&j) {
                for i in bounds.interior_x() {
                    row[i] = updated(input, j * nx + i, nx);
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(nx: usize, ny: usize, i: usize, j: usize) -> Field {
        let mut field = Field::zeroed(nx, ny);
        let idx = field.idx(i, j);
        field.as_mut_slice()[idx] = 1.0;
        field
    }

    #[test]
    fn test_uniform_field_is_invariant() {
        // Weights sum to one, so a constant field maps to itself.
        let bounds = StencilBounds::unit_halo(8, 8);
        let input = Field::from_samples(8, 8, vec![0.75; 64]);
        let mut output = Field::zeroed(8, 8);

        stencil_step(&bounds, &input, &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn test_impulse_spreads_to_neighbors() {
        let bounds = StencilBounds::unit_halo(8, 8);
        let input = impulse(8, 8, 4, 4);
        let mut output = Field::zeroed(8, 8);

        stencil_step(&bounds, &input, &mut output);
        assert_eq!(output.get(4, 4), CENTER_WEIGHT);
        assert_eq!(output.get(3, 4), NEIGHBOR_WEIGHT);
        assert_eq!(output.get(5, 4), NEIGHBOR_WEIGHT);
        assert_eq!(output.get(4, 3), NEIGHBOR_WEIGHT);
        assert_eq!(output.get(4, 5), NEIGHBOR_WEIGHT);
        assert_eq!(output.get(2, 4), 0.0);
    }

    #[test]
    fn test_halo_is_copied_through() {
        let bounds = StencilBounds::unit_halo(4, 4);
        let samples: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let input = Field::from_samples(4, 4, samples);
        let mut output = Field::zeroed(4, 4);

        stencil_step(&bounds, &input, &mut output);
        for j in 0..4 {
            for i in 0..4 {
                if i == 0 || i == 3 || j == 0 || j == 3 {
                    assert_eq!(output.get(i, j), input.get(i, j), "halo at ({i},{j})");
                }
            }
        }
    }

    #[test]
    fn test_parallel_path_matches_sequential() {
        let nx = 64;
        let ny = 48;
        let bounds = StencilBounds::unit_halo(nx, ny);
        let input: Vec<f32> = (0..nx * ny).map(|v| ((v * 31 + 7) % 97) as f32 * 0.01).collect();

        let mut sequential = input.clone();
        let mut parallel = input.clone();
        step_interior_sequential(&bounds, &input, &mut sequential);
        step_interior_parallel(&bounds, &input, &mut parallel);

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_grid_without_interior_is_a_copy() {
        let bounds = StencilBounds::unit_halo(2, 2);
        let input = Field::from_samples(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let mut output = Field::zeroed(2, 2);

        stencil_step(&bounds, &input, &mut output);
        assert_eq!(output, input);
    }
}
