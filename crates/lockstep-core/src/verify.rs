//! Cross-result verification.
//!
//! After teardown has copied every device's final buffer back to host
//! memory, each final field is scanned against the host reference and the
//! maximum absolute difference plus its location is reported per device.
//! The scan is pure and deterministic; re-running it over the same inputs
//! yields the same report.

use crate::field::Field;

/// Maximum-difference report for one device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceDiff {
    /// Device the final field came from.
    pub device: usize,
    /// Largest absolute difference against the reference.
    pub max_diff: f32,
    /// `(i, j)` location of the maximum, first occurrence in row-major
    /// scan order on ties.
    pub location: (usize, usize),
}

/// Compare each device's final field against the host reference.
///
/// # Panics
///
/// Panics if any final field's shape differs from the reference's; all
/// fields of a run share one shape by construction.
pub fn verify(finals: &[(usize, Field)], reference: &Field) -> Vec<DeviceDiff> {
    finals
        .iter()
        .map(|(device, field)| diff_one(*device, field, reference))
        .collect()
}

fn diff_one(device: usize, field: &Field, reference: &Field) -> DeviceDiff {
    assert!(
        field.same_shape(reference),
        "device {device} field shape differs from reference"
    );

    let mut max_diff = 0.0f32;
    let mut location = (0, 0);
    if field.is_empty() {
        return DeviceDiff {
            device,
            max_diff,
            location,
        };
    }

    max_diff = (reference.as_slice()[0] - field.as_slice()[0]).abs();
    for j in 0..field.ny() {
        for i in 0..field.nx() {
            let diff = (reference.get(i, j) - field.get(i, j)).abs();
            // Strictly greater: ties keep the earliest row-major location.
            if diff > max_diff {
                max_diff = diff;
                location = (i, j);
            }
        }
    }

    DeviceDiff {
        device,
        max_diff,
        location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(nx: usize, ny: usize, samples: &[f32]) -> Field {
        Field::from_samples(nx, ny, samples.to_vec())
    }

    #[test]
    fn test_identical_fields_diff_zero_at_origin() {
        let a = field(4, 4, &[0.5; 16]);
        let diffs = verify(&[(0, a.clone())], &a);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].device, 0);
        assert_eq!(diffs[0].max_diff, 0.0);
        assert_eq!(diffs[0].location, (0, 0));
    }

    #[test]
    fn test_maximum_location_is_reported() {
        let reference = field(3, 3, &[0.0; 9]);
        let mut samples = [0.0f32; 9];
        samples[5] = -2.0; // (i=2, j=1)
        samples[7] = 1.0; // smaller diff at (1, 2)
        let diffs = verify(&[(4, field(3, 3, &samples))], &reference);
        assert_eq!(diffs[0].device, 4);
        assert_eq!(diffs[0].max_diff, 2.0);
        assert_eq!(diffs[0].location, (2, 1));
    }

    #[test]
    fn test_ties_resolve_to_first_row_major_occurrence() {
        let reference = field(3, 2, &[0.0; 6]);
        // Equal maxima at (1, 0) and (0, 1); the scan meets (1, 0) first.
        let samples = [0.0, 3.0, 0.0, 3.0, 0.0, 0.0];
        let diffs = verify(&[(0, field(3, 2, &samples))], &reference);
        assert_eq!(diffs[0].max_diff, 3.0);
        assert_eq!(diffs[0].location, (1, 0));
    }

    #[test]
    fn test_verification_is_idempotent() {
        let reference = field(4, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let final_field = field(4, 2, &[1.0, 2.5, 3.0, 4.0, 5.5, 6.0, 7.0, 8.0]);
        let finals = vec![(0, final_field)];

        let first = verify(&finals, &reference);
        let second = verify(&finals, &reference);
        assert_eq!(first, second);
    }

    #[test]
    fn test_multiple_devices_keep_their_order() {
        let reference = field(2, 2, &[0.0; 4]);
        let finals = vec![
            (0, field(2, 2, &[0.0, 0.0, 0.0, 1.0])),
            (1, field(2, 2, &[0.25, 0.0, 0.0, 0.0])),
        ];
        let diffs = verify(&finals, &reference);
        assert_eq!(diffs[0].device, 0);
        assert_eq!(diffs[0].max_diff, 1.0);
        assert_eq!(diffs[0].location, (1, 1));
        assert_eq!(diffs[1].device, 1);
        assert_eq!(diffs[1].max_diff, 0.25);
        assert_eq!(diffs[1].location, (0, 0));
    }
}
