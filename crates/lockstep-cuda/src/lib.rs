//! CUDA backend for the lockstep engine.
//!
//! Implements the `lockstep-core` backend traits on top of cudarc's driver
//! API. Each discovered device gets its own context and compiled stencil
//! module; the kernel source lives in `shaders/pattern2d.cu` and is compiled
//! to PTX at context creation via NVRTC.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod device;

pub use device::{CudaStencilBackend, CudaStencilContext};
