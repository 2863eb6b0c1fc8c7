//! # Lockstep
//!
//! Coordinates a fixed-size iterative stencil computation across every
//! discovered accelerator device and the host CPU, in lockstep: each
//! iteration runs one step on every device and one step of a host-side
//! reference concurrently, joins all of them at a barrier, and only then
//! starts the next iteration. After the final iteration every device's
//! result is copied back and compared against the reference.
//!
//! This crate owns the concurrency layer and the end-to-end harness:
//!
//! - [`pool`] - the one-thread-per-device fan-out for a single iteration
//! - [`host`] - the host reference with its own double buffer
//! - [`coordinator`] - the iteration loop, barrier, and abort handling
//! - [`runner`] - discovery, seeding, lifecycle, teardown, verification
//!
//! The backend seam and per-device state live in `lockstep-core`; the CUDA
//! backend is enabled with the `cuda` feature.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod host;
pub mod pool;
pub mod runner;

pub use coordinator::{IterationCoordinator, RunState};
pub use host::{HostKernel, HostReferenceRunner};
pub use runner::{execute, execute_seeded, RunReport};

/// Convenient re-exports for downstream users.
pub mod prelude {
    pub use crate::coordinator::{IterationCoordinator, RunState};
    pub use crate::host::{HostKernel, HostReferenceRunner};
    pub use crate::runner::{execute, execute_seeded, RunReport};
    pub use lockstep_core::backend::{DeviceBackend, DeviceContext, StencilBounds};
    pub use lockstep_core::config::RunConfig;
    pub use lockstep_core::error::{LockstepError, Result};
    pub use lockstep_core::field::Field;
    pub use lockstep_core::slot::DeviceSlot;
    pub use lockstep_core::verify::DeviceDiff;
}
