//! Relay error types

use thiserror::Error;

/// Errors produced by the relay core.
///
/// Every error is local to the single call or hot-plug event that
/// produced it; no error kind degrades other registered devices.
#[derive(Error, Debug)]
pub enum MuxError {
    /// Caller asked for non-blocking I/O, a non-zero offset, or a
    /// length other than one full report.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// All minor IDs are taken; the device stays unregistered.
    #[error("out of minor IDs")]
    ResourceExhausted,

    /// The control transfer itself failed.
    #[error("control transfer failed: {0}")]
    TransferFault(String),

    /// The transfer completed but moved the wrong number of bytes.
    #[error("transfer length mismatch: got {actual}, expected {expected}")]
    TransferLength { actual: usize, expected: usize },

    /// Buffer or session allocation failed.
    #[error("out of memory")]
    AllocationFault,

    /// Failure while moving bytes to or from the caller.
    #[error("fault while copying caller data: {0}")]
    FaultyCopy(String),

    /// The device node could not be created for a registered session.
    #[error("failed to publish device node: {0}")]
    PublicationFault(String),

    /// The session's device has been detached.
    #[error("device disconnected")]
    Disconnected,
}

impl From<hidapi::HidError> for MuxError {
    fn from(e: hidapi::HidError) -> Self {
        MuxError::TransferFault(e.to_string())
    }
}
