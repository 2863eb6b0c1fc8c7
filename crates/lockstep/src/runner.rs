//! End-to-end run harness: discovery, seeding, lifecycle, verification.

use rand::Rng;

use lockstep_core::backend::{DeviceBackend, DeviceContext, StencilBounds};
use lockstep_core::config::RunConfig;
use lockstep_core::error::Result;
use lockstep_core::field::Field;
use lockstep_core::slot::DeviceSlot;
use lockstep_core::verify::{verify, DeviceDiff};

use crate::coordinator::IterationCoordinator;
use crate::host::HostReferenceRunner;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Number of devices the run used.
    pub devices: usize,
    /// Per-device verification results, in device order.
    pub diffs: Vec<DeviceDiff>,
}

/// Execute a full run on `backend`: random initial field, standard host
/// stencil as the reference.
pub fn execute<B: DeviceBackend>(backend: &B, config: &RunConfig) -> Result<RunReport> {
    let mut rng = rand::thread_rng();
    let samples: Vec<f32> = (0..config.grid_len()).map(|_| rng.gen::<f32>()).collect();
    let seed = Field::from_samples(config.nx, config.ny, samples);
    execute_seeded(backend, config, seed, lockstep_cpu::stencil_step)
}

/// Execute a full run with a caller-provided initial field and host kernel.
///
/// The flow: discover devices (zero is a valid no-op run), replicate the
/// seed per device and for the host reference, initialize every slot,
/// drive the iterations, tear every initialized slot down - best-effort,
/// even after a failure elsewhere - and verify the device results against
/// the reference.
///
/// # Panics
///
/// Panics if `seed` does not match the configured grid shape.
pub fn execute_seeded<B, K>(
    backend: &B,
    config: &RunConfig,
    seed: Field,
    host_kernel: K,
) -> Result<RunReport>
where
    B: DeviceBackend,
    K: Fn(&StencilBounds, &Field, &mut Field) + Send + 'static,
{
    assert!(
        seed.nx() == config.nx && seed.ny() == config.ny,
        "seed does not match the configured grid"
    );

    let ndevices = backend.device_count()?;
    tracing::info!("{ndevices} device(s) found");
    if ndevices == 0 {
        return Ok(RunReport {
            devices: 0,
            diffs: Vec::new(),
        });
    }
    // One worker per device plus the host reference branch.
    tracing::info!("{} worker threads used", ndevices + 1);

    let mut host = HostReferenceRunner::with_kernel(seed.clone(), host_kernel);

    let mut slots = Vec::with_capacity(ndevices);
    for ordinal in 0..ndevices {
        let slot = backend
            .create_context(ordinal)
            .and_then(|ctx| DeviceSlot::initialize(ctx, seed.clone()));
        match slot {
            Ok(slot) => slots.push(slot),
            Err(err) => {
                // Slots initialized before the failure still get torn down.
                let _ = teardown_all(slots);
                return Err(err);
            }
        }
    }

    let mut coordinator = IterationCoordinator::new(*config);
    let run_result = coordinator.run(&mut slots, &mut host);

    // Teardown runs for every initialized slot even after an aborted run.
    let (finals, teardown_result) = teardown_all(slots);

    run_result?;
    teardown_result?;

    let reference = host.into_reference();
    let diffs = verify(&finals, &reference);
    for diff in &diffs {
        tracing::info!(
            "device {} result abs max diff = {} @ ({},{})",
            diff.device,
            diff.max_diff,
            diff.location.0,
            diff.location.1
        );
    }

    Ok(RunReport {
        devices: ndevices,
        diffs,
    })
}

/// Tear every slot down, keeping the first error.
///
/// A slot's teardown failure is reported and does not stop the remaining
/// slots from getting their own teardown attempt.
fn teardown_all<C: DeviceContext>(
    slots: Vec<DeviceSlot<C>>,
) -> (Vec<(usize, Field)>, Result<()>) {
    let mut finals = Vec::with_capacity(slots.len());
    let mut first_error = None;

    for slot in slots {
        let ordinal = slot.ordinal();
        match slot.teardown() {
            Ok(field) => finals.push((ordinal, field)),
            Err(err) => {
                tracing::warn!("teardown failed on device {ordinal}: {err}");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    let status = match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    };
    (finals, status)
}
