//! CUDA device enumeration and context management.

use std::sync::Arc;

use cudarc::driver::{
    CudaContext, CudaFunction, CudaModule, CudaSlice, CudaStream, LaunchConfig, PushKernelArg,
};
use cudarc::nvrtc::compile_ptx;

use lockstep_core::backend::{DeviceBackend, DeviceContext, StencilBounds};
use lockstep_core::error::{ContextOp, Direction, LockstepError, Result};

/// Stencil kernel source, compiled to PTX at context creation.
const KERNEL_SOURCE: &str = include_str!("../shaders/pattern2d.cu");

/// Kernel function name.
const FN_STENCIL: &str = "pattern2d";

/// Thread block edge for the 2D launch.
const BLOCK_DIM: u32 = 16;

/// CUDA implementation of [`DeviceBackend`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CudaStencilBackend;

impl CudaStencilBackend {
    /// Create the backend. Discovery happens in [`DeviceBackend::device_count`].
    pub fn new() -> Self {
        Self
    }
}

impl DeviceBackend for CudaStencilBackend {
    type Context = CudaStencilContext;

    fn device_count(&self) -> Result<usize> {
        let count = CudaContext::device_count()
            .map_err(|e| LockstepError::Discovery(e.to_string()))?;
        Ok(count as usize)
    }

    fn create_context(&self, ordinal: usize) -> Result<CudaStencilContext> {
        CudaStencilContext::new(ordinal)
    }
}

/// One CUDA device's context, stream, and compiled stencil module.
pub struct CudaStencilContext {
    ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    /// Keeps the compiled module alive for `func`.
    _module: Arc<CudaModule>,
    func: CudaFunction,
    ordinal: usize,
}

impl CudaStencilContext {
    fn new(ordinal: usize) -> Result<Self> {
        let ctx = CudaContext::new(ordinal).map_err(|e| context_error(ordinal, ContextOp::Create, e))?;

        let name = ctx
            .name()
            .map_err(|e| context_error(ordinal, ContextOp::Create, e))?;
        let (major, minor) = ctx
            .compute_capability()
            .map_err(|e| context_error(ordinal, ContextOp::Create, e))?;
        tracing::info!("device {ordinal}: {name} (CC {major}.{minor})");

        let ptx = compile_ptx(KERNEL_SOURCE).map_err(|e| LockstepError::Kernel {
            device: ordinal,
            reason: format!("NVRTC compilation failed: {e}"),
        })?;
        let module = ctx.load_module(ptx).map_err(|e| LockstepError::Kernel {
            device: ordinal,
            reason: format!("cannot load stencil module: {e}"),
        })?;
        let func = module.load_function(FN_STENCIL).map_err(|e| LockstepError::Kernel {
            device: ordinal,
            reason: format!("stencil function not found: {e}"),
        })?;

        let stream = ctx.default_stream();

        Ok(Self {
            ctx,
            stream,
            _module: module,
            func,
            ordinal,
        })
    }
}

impl DeviceContext for CudaStencilContext {
    type Buffer = CudaSlice<f32>;

    fn ordinal(&self) -> usize {
        self.ordinal
    }

    fn make_current(&self) -> Result<()> {
        self.ctx
            .bind_to_thread()
            .map_err(|e| context_error(self.ordinal, ContextOp::MakeCurrent, e))
    }

    fn release_current(&self) -> Result<()> {
        // cudarc tracks the bound context per thread and rebinds before
        // stream operations; the safe driver API has no explicit pop.
        Ok(())
    }

    fn alloc(&self, len: usize) -> Result<CudaSlice<f32>> {
        self.stream
            .alloc_zeros::<f32>(len)
            .map_err(|e| LockstepError::Allocation {
                device: self.ordinal,
                elements: len,
                reason: e.to_string(),
            })
    }

    fn upload(&self, src: &[f32], dst: &mut CudaSlice<f32>) -> Result<()> {
        self.stream
            .memcpy_htod(src, dst)
            .map_err(|e| transfer_error(self.ordinal, Direction::HostToDevice, e))
    }

    fn download(&self, src: &CudaSlice<f32>, dst: &mut [f32]) -> Result<()> {
        self.stream
            .memcpy_dtoh(src, dst)
            .map_err(|e| transfer_error(self.ordinal, Direction::DeviceToHost, e))?;
        self.stream
            .synchronize()
            .map_err(|e| transfer_error(self.ordinal, Direction::DeviceToHost, e))
    }

    fn launch_stencil(
        &self,
        bounds: &StencilBounds,
        input: &CudaSlice<f32>,
        output: &mut CudaSlice<f32>,
    ) -> Result<()> {
        let nx = bounds.nx as i32;
        let ny = bounds.ny as i32;
        let hx = bounds.halo_x as i32;
        let hy = bounds.halo_y as i32;
        let device = self.ordinal as i32;

        let cfg = LaunchConfig {
            grid_dim: (
                (bounds.nx as u32).div_ceil(BLOCK_DIM),
                (bounds.ny as u32).div_ceil(BLOCK_DIM),
                1,
            ),
            block_dim: (BLOCK_DIM, BLOCK_DIM, 1),
            shared_mem_bytes: 0,
        };

        let mut builder = self.stream.launch_builder(&self.func);
        builder.arg(input);
        builder.arg(output);
        builder.arg(&nx);
        builder.arg(&ny);
        builder.arg(&hx);
        builder.arg(&hy);
        builder.arg(&device);
        unsafe { builder.launch(cfg) }.map_err(|e| LockstepError::Kernel {
            device: self.ordinal,
            reason: format!("stencil launch failed: {e}"),
        })?;

        // The step contract is synchronous: the swap must not commit before
        // the device has finished writing the output buffer.
        self.stream.synchronize().map_err(|e| LockstepError::Kernel {
            device: self.ordinal,
            reason: format!("stencil synchronize failed: {e}"),
        })
    }

    fn free(&self, buffer: CudaSlice<f32>) -> Result<()> {
        drop(buffer);
        Ok(())
    }

    fn destroy(self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|e| context_error(self.ordinal, ContextOp::Destroy, e))
        // Dropping the last Arc releases the driver context.
    }
}

fn context_error(device: usize, op: ContextOp, err: impl std::fmt::Display) -> LockstepError {
    LockstepError::Context {
        device,
        op,
        reason: err.to_string(),
    }
}

fn transfer_error(device: usize, direction: Direction, err: impl std::fmt::Display) -> LockstepError {
    LockstepError::Transfer {
        device,
        direction,
        reason: err.to_string(),
    }
}
