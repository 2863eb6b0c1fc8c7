//! Per-device slot lifecycle and step execution.
//!
//! A [`DeviceSlot`] bundles one device's execution context, its two
//! device-resident buffers, the host-resident staging field, and a step
//! counter. The two buffers are double-buffered: exactly one carries the
//! *input* role and the other the *output* role at any time, and a
//! successful step swaps the labels - a handle swap, never a data copy.

use std::mem;

use crate::backend::{CurrentGuard, DeviceContext, StencilBounds};
use crate::error::{LockstepError, Result};
use crate::field::Field;

/// One discovered device's context, buffers, and status.
pub struct DeviceSlot<C: DeviceContext> {
    ordinal: usize,
    ctx: C,
    /// Buffer currently carrying the *input* role.
    input: C::Buffer,
    /// Buffer currently carrying the *output* role.
    output: C::Buffer,
    /// Host-resident staging copy (initial data in, final data out).
    staging: Field,
    steps: u32,
    last_error: Option<LockstepError>,
}

impl<C: DeviceContext> DeviceSlot<C> {
    /// Initialize a slot: allocate both device buffers and upload `staging`
    /// into the *input* buffer.
    ///
    /// The context is made current only for the duration of this call; on
    /// return (success or failure) it is no longer current on the calling
    /// thread. Any failure is fatal to the run and is attributed to this
    /// device.
    pub fn initialize(ctx: C, staging: Field) -> Result<Self> {
        let ordinal = ctx.ordinal();
        let len = staging.len();

        let guard = CurrentGuard::bind(&ctx)?;
        let mut input = ctx.alloc(len)?;
        let output = ctx.alloc(len)?;
        ctx.upload(staging.as_slice(), &mut input)?;
        guard.pop()?;

        tracing::info!("device {ordinal} initialized");
        Ok(Self {
            ordinal,
            ctx,
            input,
            output,
            staging,
            steps: 0,
            last_error: None,
        })
    }

    /// Run one step: stencil kernel over the *input* buffer into the
    /// *output* buffer, then commit by swapping the role labels and
    /// incrementing the step counter.
    ///
    /// On failure nothing commits: the labels keep their roles and the
    /// counter keeps its value, so the counter always equals the number of
    /// successful steps.
    pub fn step(&mut self, bounds: &StencilBounds) -> Result<()> {
        let result = self.try_step(bounds);
        if let Err(err) = &result {
            self.last_error = Some(err.clone());
        }
        result
    }

    fn try_step(&mut self, bounds: &StencilBounds) -> Result<()> {
        let guard = CurrentGuard::bind(&self.ctx)?;
        self.ctx.launch_stencil(bounds, &self.input, &mut self.output)?;
        guard.pop()?;

        mem::swap(&mut self.input, &mut self.output);
        self.steps += 1;
        tracing::debug!("device {} completed step {}", self.ordinal, self.steps);
        Ok(())
    }

    /// Tear the slot down: copy the *input* buffer back into the staging
    /// field, free both buffers, destroy the context, and return the final
    /// host-resident field.
    pub fn teardown(self) -> Result<Field> {
        let DeviceSlot {
            ordinal,
            ctx,
            input,
            output,
            mut staging,
            ..
        } = self;

        let guard = CurrentGuard::bind(&ctx)?;
        ctx.download(&input, staging.as_mut_slice())?;
        ctx.free(input)?;
        ctx.free(output)?;
        guard.pop()?;
        ctx.destroy()?;

        tracing::info!("device {ordinal} deinitialized");
        Ok(staging)
    }

    /// Device ordinal this slot belongs to.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Number of successfully committed steps.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// The error from the most recent failed operation, if any.
    pub fn last_error(&self) -> Option<&LockstepError> {
        self.last_error.as_ref()
    }

    /// The buffer currently carrying the *input* role.
    pub fn input_buffer(&self) -> &C::Buffer {
        &self.input
    }

    /// The buffer currently carrying the *output* role.
    pub fn output_buffer(&self) -> &C::Buffer {
        &self.output
    }
}
