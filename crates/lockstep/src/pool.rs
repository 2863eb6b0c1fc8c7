//! Per-iteration device fan-out.

use std::panic;
use std::thread;

use lockstep_core::backend::{DeviceContext, StencilBounds};
use lockstep_core::error::Result;
use lockstep_core::slot::DeviceSlot;

/// Run one step on every slot, one OS thread per slot, and join them all.
///
/// Statuses come back in slot order. Workers are independent - none touches
/// another's context or buffers - and a slow or failing device never blocks
/// the others: every worker runs to completion before this returns, and no
/// worker is cancelled on a sibling's failure.
pub fn run_iteration<C: DeviceContext>(
    slots: &mut [DeviceSlot<C>],
    bounds: &StencilBounds,
) -> Vec<Result<()>> {
    thread::scope(|scope| {
        let workers: Vec<_> = slots
            .iter_mut()
            .map(|slot| scope.spawn(move || slot.step(bounds)))
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::backend::DeviceBackend;
    use lockstep_core::error::LockstepError;
    use lockstep_core::field::Field;
    use lockstep_core::mock::{MockBackend, MockFailure};

    fn slots_for(backend: &MockBackend, count: usize) -> Vec<DeviceSlot<lockstep_core::mock::MockContext>> {
        (0..count)
            .map(|ordinal| {
                let ctx = backend.create_context(ordinal).unwrap();
                DeviceSlot::initialize(ctx, Field::zeroed(8, 8)).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_every_slot_steps_once() {
        let backend = MockBackend::new(4);
        let mut slots = slots_for(&backend, 4);
        let bounds = StencilBounds::unit_halo(8, 8);

        let statuses = run_iteration(&mut slots, &bounds);
        assert_eq!(statuses.len(), 4);
        assert!(statuses.iter().all(|s| s.is_ok()));
        assert!(slots.iter().all(|s| s.steps() == 1));
    }

    #[test]
    fn test_failing_device_does_not_block_siblings() {
        let backend = MockBackend::new(3).fail_device(1, MockFailure::KernelAtStep(1));
        let mut slots = slots_for(&backend, 3);
        let bounds = StencilBounds::unit_halo(8, 8);

        let statuses = run_iteration(&mut slots, &bounds);
        assert!(statuses[0].is_ok());
        assert!(matches!(
            statuses[1],
            Err(LockstepError::Kernel { device: 1, .. })
        ));
        assert!(statuses[2].is_ok());
        // Siblings committed their step; the failing slot did not.
        assert_eq!(slots[0].steps(), 1);
        assert_eq!(slots[1].steps(), 0);
        assert_eq!(slots[2].steps(), 1);
    }
}
