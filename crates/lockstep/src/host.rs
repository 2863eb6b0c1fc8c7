//! Concurrent host-side reference computation.

use std::mem;

use lockstep_core::backend::StencilBounds;
use lockstep_core::field::Field;

/// Host-executed stencil function: `(bounds, current, next)`.
pub type HostKernel = Box<dyn Fn(&StencilBounds, &Field, &mut Field) + Send>;

/// Runs the reference computation on the host, double-buffered like every
/// device slot.
///
/// The runner exclusively owns its two fields; it shares no mutable state
/// with the device workers it runs concurrently with. Ordering against the
/// device pool exists only at the per-iteration join barrier.
pub struct HostReferenceRunner {
    /// Field carrying the *current* role.
    current: Field,
    /// Field carrying the *next* role.
    next: Field,
    kernel: HostKernel,
    steps: u32,
}

impl HostReferenceRunner {
    /// Runner seeded with `initial`, using the standard host stencil.
    pub fn new(initial: Field) -> Self {
        Self::with_kernel(initial, lockstep_cpu::stencil_step)
    }

    /// Runner seeded with `initial`, using a caller-supplied kernel.
    pub fn with_kernel(
        initial: Field,
        kernel: impl Fn(&StencilBounds, &Field, &mut Field) + Send + 'static,
    ) -> Self {
        let next = Field::zeroed(initial.nx(), initial.ny());
        Self {
            current: initial,
            next,
            kernel: Box::new(kernel),
            steps: 0,
        }
    }

    /// Run one step, *current* -> *next*, then swap the role labels.
    pub fn run_iteration(&mut self, bounds: &StencilBounds) {
        (self.kernel)(bounds, &self.current, &mut self.next);
        mem::swap(&mut self.current, &mut self.next);
        self.steps += 1;
    }

    /// Number of completed reference steps.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// The field holding the newest reference data.
    pub fn reference(&self) -> &Field {
        &self.current
    }

    /// Consume the runner, returning the final reference field.
    pub fn into_reference(self) -> Field {
        self.current
    }
}
