//! # Lockstep Core
//!
//! Backend-agnostic core of the lockstep multi-device stencil engine.
//!
//! A run replicates one initial 2D field across every discovered accelerator
//! device plus a host-side reference, advances all of them in lockstep for a
//! fixed number of iterations, and finally compares each device's result
//! against the reference.
//!
//! This crate owns the pieces that do not depend on any particular
//! accelerator API:
//!
//! - [`Field`] - a flat row-major grid of f32 samples
//! - [`DeviceBackend`] / [`DeviceContext`] - the seam real backends implement
//! - [`CurrentGuard`] - scoped "current context" acquisition
//! - [`DeviceSlot`] - per-device context, double buffer, and step counter
//! - [`verify`](crate::verify) - the final cross-result comparison
//! - [`mock`](crate::mock) - a deterministic backend for tests
//!
//! The concurrency layer (worker pool, host reference runner, iteration
//! coordinator) lives in the `lockstep` facade crate; the CUDA backend lives
//! in `lockstep-cuda`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod field;
pub mod mock;
pub mod slot;
pub mod verify;

pub use backend::{CurrentGuard, DeviceBackend, DeviceContext, StencilBounds};
pub use config::RunConfig;
pub use error::{ContextOp, Direction, LockstepError, Result};
pub use field::Field;
pub use slot::DeviceSlot;
pub use verify::DeviceDiff;
