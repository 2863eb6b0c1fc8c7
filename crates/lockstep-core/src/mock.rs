//! Mock backend for exercising the engine without accelerator hardware.
//!
//! `MockBackend` is a deterministic, fully in-process [`DeviceBackend`]:
//! device count is configurable, the kernel is an injectable host function
//! (identity by default), and individual devices can be scripted to fail at
//! a chosen point in their lifecycle. Shared counters track live contexts,
//! live buffers, and make-current/release pairing so tests can assert that
//! nothing leaks and that the scoped-acquisition discipline held.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{DeviceBackend, DeviceContext, StencilBounds};
use crate::error::{ContextOp, Direction, LockstepError, Result};

/// Kernel function run by mock devices: `(bounds, input, output, device)`.
pub type MockKernel = Arc<dyn Fn(&StencilBounds, &[f32], &mut [f32], usize) + Send + Sync>;

/// Scripted failure for one mock device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// `create_context` fails for this device.
    ContextCreate,
    /// The stencil kernel reports failure on the given 1-based step.
    KernelAtStep(u32),
    /// `destroy` fails for this device's context.
    Destroy,
}

/// Resource counters shared between a backend, its contexts, and tests.
#[derive(Debug, Default)]
pub struct MockStats {
    /// Contexts created and not yet destroyed or dropped.
    pub live_contexts: usize,
    /// Buffers allocated and not yet freed or dropped.
    pub live_buffers: usize,
    /// Total successful `create_context` calls.
    pub contexts_created: usize,
    /// Total orderly `destroy` calls.
    pub contexts_destroyed: usize,
    /// Total `make_current` calls.
    pub binds: u64,
    /// Total `release_current` calls.
    pub releases: u64,
}

/// Deterministic in-process device backend.
pub struct MockBackend {
    devices: usize,
    kernel: MockKernel,
    failures: Vec<(usize, MockFailure)>,
    stats: Arc<Mutex<MockStats>>,
    next_buffer_id: Arc<AtomicU64>,
}

impl MockBackend {
    /// Backend with `devices` devices and the identity kernel.
    pub fn new(devices: usize) -> Self {
        Self::with_kernel(
            devices,
            Arc::new(|_bounds, input, output, _device| output.copy_from_slice(input)),
        )
    }

    /// Backend with `devices` devices running `kernel` on every step.
    pub fn with_kernel(devices: usize, kernel: MockKernel) -> Self {
        Self {
            devices,
            kernel,
            failures: Vec::new(),
            stats: Arc::new(Mutex::new(MockStats::default())),
            next_buffer_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Script `failure` for `device`.
    pub fn fail_device(mut self, device: usize, failure: MockFailure) -> Self {
        self.failures.push((device, failure));
        self
    }

    /// Handle to the shared resource counters.
    pub fn stats(&self) -> Arc<Mutex<MockStats>> {
        Arc::clone(&self.stats)
    }

    fn failure_for(&self, device: usize) -> Option<MockFailure> {
        self.failures
            .iter()
            .find(|(d, _)| *d == device)
            .map(|(_, f)| *f)
    }
}

impl DeviceBackend for MockBackend {
    type Context = MockContext;

    fn device_count(&self) -> Result<usize> {
        Ok(self.devices)
    }

    fn create_context(&self, ordinal: usize) -> Result<MockContext> {
        let failure = self.failure_for(ordinal);
        if failure == Some(MockFailure::ContextCreate) {
            return Err(LockstepError::Context {
                device: ordinal,
                op: ContextOp::Create,
                reason: "scripted context-create failure".to_string(),
            });
        }

        let fail_at = match failure {
            Some(MockFailure::KernelAtStep(step)) => Some(step),
            _ => None,
        };

        {
            let mut stats = self.stats.lock();
            stats.contexts_created += 1;
            stats.live_contexts += 1;
        }

        Ok(MockContext {
            ordinal,
            kernel: Arc::clone(&self.kernel),
            fail_at,
            fail_destroy: failure == Some(MockFailure::Destroy),
            launches: AtomicU32::new(0),
            stats: Arc::clone(&self.stats),
            next_buffer_id: Arc::clone(&self.next_buffer_id),
            destroyed: false,
        })
    }
}

/// Execution context of one mock device.
pub struct MockContext {
    ordinal: usize,
    kernel: MockKernel,
    fail_at: Option<u32>,
    fail_destroy: bool,
    launches: AtomicU32,
    stats: Arc<Mutex<MockStats>>,
    next_buffer_id: Arc<AtomicU64>,
    destroyed: bool,
}

impl std::fmt::Debug for MockContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockContext")
            .field("ordinal", &self.ordinal)
            .field("fail_at", &self.fail_at)
            .field("fail_destroy", &self.fail_destroy)
            .field("launches", &self.launches)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

/// A mock device-resident buffer.
///
/// Carries a process-unique id so tests can observe the input/output role
/// swap as a relabeling of the same two buffer objects.
pub struct MockBuffer {
    id: u64,
    data: Vec<f32>,
    stats: Arc<Mutex<MockStats>>,
}

impl MockBuffer {
    /// Process-unique buffer identity.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.stats.lock().live_buffers -= 1;
    }
}

impl DeviceContext for MockContext {
    type Buffer = MockBuffer;

    fn ordinal(&self) -> usize {
        self.ordinal
    }

    fn make_current(&self) -> Result<()> {
        self.stats.lock().binds += 1;
        Ok(())
    }

    fn release_current(&self) -> Result<()> {
        self.stats.lock().releases += 1;
        Ok(())
    }

    fn alloc(&self, len: usize) -> Result<MockBuffer> {
        let mut stats = self.stats.lock();
        stats.live_buffers += 1;
        Ok(MockBuffer {
            id: self.next_buffer_id.fetch_add(1, Ordering::Relaxed),
            data: vec![0.0; len],
            stats: Arc::clone(&self.stats),
        })
    }

    fn upload(&self, src: &[f32], dst: &mut MockBuffer) -> Result<()> {
        if src.len() != dst.data.len() {
            return Err(LockstepError::Transfer {
                device: self.ordinal,
                direction: Direction::HostToDevice,
                reason: format!("length mismatch: {} vs {}", src.len(), dst.data.len()),
            });
        }
        dst.data.copy_from_slice(src);
        Ok(())
    }

    fn download(&self, src: &MockBuffer, dst: &mut [f32]) -> Result<()> {
        if src.data.len() != dst.len() {
            return Err(LockstepError::Transfer {
                device: self.ordinal,
                direction: Direction::DeviceToHost,
                reason: format!("length mismatch: {} vs {}", src.data.len(), dst.len()),
            });
        }
        dst.copy_from_slice(&src.data);
        Ok(())
    }

    fn launch_stencil(
        &self,
        bounds: &StencilBounds,
        input: &MockBuffer,
        output: &mut MockBuffer,
    ) -> Result<()> {
        let launch = self.launches.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_at == Some(launch) {
            return Err(LockstepError::Kernel {
                device: self.ordinal,
                reason: format!("scripted kernel failure at step {launch}"),
            });
        }
        (self.kernel)(bounds, &input.data, &mut output.data, self.ordinal);
        Ok(())
    }

    fn free(&self, buffer: MockBuffer) -> Result<()> {
        // MockBuffer::drop does the bookkeeping.
        drop(buffer);
        Ok(())
    }

    fn destroy(mut self) -> Result<()> {
        if self.fail_destroy {
            // Dropped un-destroyed below; live_contexts still falls.
            return Err(LockstepError::Context {
                device: self.ordinal,
                op: ContextOp::Destroy,
                reason: "scripted destroy failure".to_string(),
            });
        }
        self.destroyed = true;
        let mut stats = self.stats.lock();
        stats.live_contexts -= 1;
        stats.contexts_destroyed += 1;
        Ok(())
    }
}

impl Drop for MockContext {
    fn drop(&mut self) {
        if !self.destroyed {
            self.stats.lock().live_contexts -= 1;
        }
    }
}
