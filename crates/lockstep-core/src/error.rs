//! Error taxonomy for the lockstep engine.
//!
//! Every error in this engine is fatal to the run: there are no retries, and
//! each error names the device and operation it originated from so a failed
//! run is attributable. Teardown of already-initialized devices is still
//! attempted after a fatal error elsewhere.

use std::fmt;

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, LockstepError>;

/// Context-lifecycle operations, for error attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOp {
    /// Acquiring a device's execution context.
    Create,
    /// Making a context current on the calling thread.
    MakeCurrent,
    /// Releasing a context from the calling thread.
    Release,
    /// Destroying a context.
    Destroy,
}

impl fmt::Display for ContextOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextOp::Create => "create",
            ContextOp::MakeCurrent => "make-current",
            ContextOp::Release => "release",
            ContextOp::Destroy => "destroy",
        };
        f.write_str(s)
    }
}

/// Direction of a host/device memory copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host memory into a device buffer.
    HostToDevice,
    /// Device buffer into host memory.
    DeviceToHost,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::HostToDevice => "host-to-device",
            Direction::DeviceToHost => "device-to-host",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by the lockstep engine.
#[derive(Debug, Clone, Error)]
pub enum LockstepError {
    /// Device enumeration failed.
    #[error("cannot enumerate devices: {0}")]
    Discovery(String),

    /// A context-lifecycle operation failed on one device.
    #[error("context {op} failed on device {device}: {reason}")]
    Context {
        /// Device the context belongs to.
        device: usize,
        /// The lifecycle operation that failed.
        op: ContextOp,
        /// Backend-reported failure description.
        reason: String,
    },

    /// A device buffer allocation failed.
    #[error("cannot allocate {elements}-element buffer on device {device}: {reason}")]
    Allocation {
        /// Device the allocation was for.
        device: usize,
        /// Requested buffer length in f32 elements.
        elements: usize,
        /// Backend-reported failure description.
        reason: String,
    },

    /// A host/device memory copy failed.
    #[error("{direction} transfer failed on device {device}: {reason}")]
    Transfer {
        /// Device involved in the copy.
        device: usize,
        /// Copy direction.
        direction: Direction,
        /// Backend-reported failure description.
        reason: String,
    },

    /// The stencil kernel reported a failure on one device.
    #[error("stencil kernel failed on device {device}: {reason}")]
    Kernel {
        /// Device the kernel ran on.
        device: usize,
        /// Backend-reported failure description.
        reason: String,
    },
}

impl LockstepError {
    /// Index of the device the error is attributed to, if any.
    pub fn device(&self) -> Option<usize> {
        match self {
            LockstepError::Discovery(_) => None,
            LockstepError::Context { device, .. }
            | LockstepError::Allocation { device, .. }
            | LockstepError::Transfer { device, .. }
            | LockstepError::Kernel { device, .. } => Some(*device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_attribution() {
        let err = LockstepError::Kernel {
            device: 3,
            reason: "status 1".to_string(),
        };
        assert_eq!(err.device(), Some(3));

        let err = LockstepError::Discovery("no driver".to_string());
        assert_eq!(err.device(), None);
    }

    #[test]
    fn test_error_messages_name_device_and_operation() {
        let err = LockstepError::Context {
            device: 1,
            op: ContextOp::MakeCurrent,
            reason: "driver busy".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("device 1"));
        assert!(msg.contains("make-current"));

        let err = LockstepError::Transfer {
            device: 0,
            direction: Direction::DeviceToHost,
            reason: "bus error".to_string(),
        };
        assert!(err.to_string().contains("device-to-host"));
    }
}
