//! Integration tests for the CUDA backend.
//!
//! All tests require CUDA hardware and are ignored by default.

use lockstep_core::backend::{DeviceBackend, StencilBounds};
use lockstep_core::field::Field;
use lockstep_core::slot::DeviceSlot;
use lockstep_cuda::CudaStencilBackend;

fn seed(nx: usize, ny: usize) -> Field {
    let samples = (0..nx * ny).map(|v| ((v * 17 + 3) % 89) as f32 * 0.01).collect();
    Field::from_samples(nx, ny, samples)
}

#[test]
#[ignore] // Requires CUDA hardware
fn test_device_enumeration() {
    let backend = CudaStencilBackend::new();
    let count = backend.device_count().expect("enumeration failed");
    println!("{count} CUDA device(s) found");
}

#[test]
#[ignore] // Requires CUDA hardware
fn test_init_step_teardown_roundtrip() {
    let backend = CudaStencilBackend::new();
    if backend.device_count().unwrap() == 0 {
        return;
    }

    let ctx = backend.create_context(0).expect("context creation failed");
    let slot = DeviceSlot::initialize(ctx, seed(32, 32)).expect("initialize failed");

    // No steps taken: teardown must return exactly what went in.
    let out = slot.teardown().expect("teardown failed");
    assert_eq!(out, seed(32, 32));
}

#[test]
#[ignore] // Requires CUDA hardware
fn test_steps_match_host_kernel() {
    let backend = CudaStencilBackend::new();
    if backend.device_count().unwrap() == 0 {
        return;
    }

    let nx = 32;
    let ny = 32;
    let nticks = 5;
    let bounds = StencilBounds::unit_halo(nx, ny);
    let initial = seed(nx, ny);

    let ctx = backend.create_context(0).expect("context creation failed");
    let mut slot = DeviceSlot::initialize(ctx, initial.clone()).expect("initialize failed");
    for _ in 0..nticks {
        slot.step(&bounds).expect("step failed");
    }
    assert_eq!(slot.steps(), nticks);
    let device_final = slot.teardown().expect("teardown failed");

    let mut current = initial;
    let mut next = Field::zeroed(nx, ny);
    for _ in 0..nticks {
        lockstep_cpu::stencil_step(&bounds, &current, &mut next);
        std::mem::swap(&mut current, &mut next);
    }

    let max_diff = device_final
        .as_slice()
        .iter()
        .zip(current.as_slice())
        .map(|(d, h)| (d - h).abs())
        .fold(0.0f32, f32::max);
    assert!(max_diff < 1e-6, "device diverged from host: {max_diff}");
}
