//! Lockstep iteration driving and abort handling.

use std::panic;
use std::thread;

use lockstep_core::backend::DeviceContext;
use lockstep_core::config::RunConfig;
use lockstep_core::error::Result;
use lockstep_core::slot::DeviceSlot;

use crate::host::HostReferenceRunner;
use crate::pool;

/// Coordinator lifecycle, advanced once per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No iteration launched yet.
    NotStarted,
    /// Iteration `i` (0-based) is in flight.
    Running(u32),
    /// All configured iterations committed on every slot.
    Completed,
    /// A device failed; its iteration was still joined before stopping.
    Aborted {
        /// Device the first observed failure is attributed to.
        device: usize,
    },
}

/// Drives `nticks` lockstep iterations over the device slots and the host
/// reference.
pub struct IterationCoordinator {
    config: RunConfig,
    state: RunState,
}

impl IterationCoordinator {
    /// Coordinator for one run.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            state: RunState::NotStarted,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every configured iteration.
    ///
    /// Each iteration forks two branches - the device fan-out and one host
    /// reference step - and joins both before looking at any status, so no
    /// slot starts iteration `i + 1` until every slot and the reference have
    /// finished iteration `i`. On the first failing status the coordinator
    /// records the device, keeps the already-joined iteration's results, and
    /// aborts: no further iterations launch, nothing in flight is cancelled,
    /// and the originating error propagates.
    pub fn run<C: DeviceContext>(
        &mut self,
        slots: &mut [DeviceSlot<C>],
        host: &mut HostReferenceRunner,
    ) -> Result<()> {
        let bounds = self.config.bounds();

        for tick in 0..self.config.nticks {
            self.state = RunState::Running(tick);

            let statuses = thread::scope(|scope| {
                let reference_branch = scope.spawn(|| host.run_iteration(&bounds));
                let statuses = pool::run_iteration(slots, &bounds);
                reference_branch
                    .join()
                    .unwrap_or_else(|payload| panic::resume_unwind(payload));
                statuses
            });

            for (slot, status) in slots.iter().zip(statuses) {
                if let Err(err) = status {
                    let device = err.device().unwrap_or_else(|| slot.ordinal());
                    self.state = RunState::Aborted { device };
                    return Err(err);
                }
            }
        }

        self.state = RunState::Completed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::backend::DeviceBackend;
    use lockstep_core::field::Field;
    use lockstep_core::mock::{MockBackend, MockContext};

    #[test]
    fn test_states_progress_to_completed() {
        let config = RunConfig::new(8, 8, 3);
        let backend = MockBackend::new(2);
        let mut slots: Vec<DeviceSlot<MockContext>> = (0..2)
            .map(|ordinal| {
                let ctx = backend.create_context(ordinal).unwrap();
                DeviceSlot::initialize(ctx, Field::zeroed(8, 8)).unwrap()
            })
            .collect();
        let mut host = HostReferenceRunner::new(Field::zeroed(8, 8));

        let mut coordinator = IterationCoordinator::new(config);
        assert_eq!(coordinator.state(), RunState::NotStarted);

        coordinator.run(&mut slots, &mut host).unwrap();
        assert_eq!(coordinator.state(), RunState::Completed);
        assert!(slots.iter().all(|s| s.steps() == 3));
        assert_eq!(host.steps(), 3);
    }

    #[test]
    fn test_zero_tick_run_completes_without_stepping() {
        let config = RunConfig::new(4, 4, 0);
        let mut slots: Vec<DeviceSlot<MockContext>> = Vec::new();
        let mut host = HostReferenceRunner::new(Field::zeroed(4, 4));

        let mut coordinator = IterationCoordinator::new(config);
        coordinator.run(&mut slots, &mut host).unwrap();
        assert_eq!(coordinator.state(), RunState::Completed);
        assert_eq!(host.steps(), 0);
    }
}
