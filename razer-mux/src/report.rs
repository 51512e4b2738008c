//! Fixed-length report constants and request/outcome validation
//!
//! Every exchange with a device moves exactly one report in one
//! direction. The two checks here guard both ends of a call: the shape
//! of what the caller asked for, and the length of what the transport
//! actually moved. Neither check ever coerces; a short request is
//! rejected, not truncated.

use std::time::Duration;

use tracing::{error, info};

use crate::error::MuxError;

/// Report payload length in bytes, identical for both directions.
pub const REPORT_LENGTH: usize = 90;

/// wValue of the control request: report type 3 (feature), report ID 0.
pub const REPORT_VALUE: u16 = 0x0300;

/// wIndex of the control request: interface 0.
pub const REPORT_INDEX: u16 = 0x0000;

/// Control transfer timeout, shared by both directions.
pub const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

/// Shape of a caller read/write request.
#[derive(Debug, Clone, Copy)]
pub struct IoRequest {
    /// Number of bytes the caller wants moved.
    pub count: usize,
    /// File offset the caller positioned at.
    pub offset: u64,
    /// Caller asked for non-blocking semantics.
    pub nonblocking: bool,
}

impl IoRequest {
    /// A well-formed blocking request for exactly one report.
    pub fn report() -> Self {
        Self {
            count: REPORT_LENGTH,
            offset: 0,
            nonblocking: false,
        }
    }
}

/// Check the shape of a caller request.
///
/// The exchange is inherently blocking and has no seek or partial
/// transfer semantics, so anything but a blocking, zero-offset,
/// full-report request is rejected.
pub fn check_request(op: &'static str, req: &IoRequest) -> Result<(), MuxError> {
    if req.nonblocking {
        info!("{} failed: non-blocking not supported", op);
        return Err(MuxError::InvalidRequest(format!(
            "{op}: non-blocking not supported"
        )));
    }

    if req.offset != 0 {
        info!("{} failed: offset={}, expected 0", op, req.offset);
        return Err(MuxError::InvalidRequest(format!(
            "{op}: offset={}, expected 0",
            req.offset
        )));
    }

    if req.count != REPORT_LENGTH {
        info!("{} failed: count={}, expected {}", op, req.count, REPORT_LENGTH);
        return Err(MuxError::InvalidRequest(format!(
            "{op}: count={}, expected {REPORT_LENGTH}",
            req.count
        )));
    }

    Ok(())
}

/// Check the outcome of a control transfer.
///
/// Errors propagate unchanged; a transfer that completed with any
/// length other than one full report is an error too. This guards
/// against a transport that partially completes without failing.
pub fn check_transfer(
    op: &'static str,
    outcome: Result<usize, MuxError>,
) -> Result<usize, MuxError> {
    match outcome {
        Err(e) => {
            error!("{} transfer failed: {}", op, e);
            Err(e)
        }
        Ok(n) if n != REPORT_LENGTH => {
            error!("{} transfer error: length={}, expected {}", op, n, REPORT_LENGTH);
            Err(MuxError::TransferLength {
                actual: n,
                expected: REPORT_LENGTH,
            })
        }
        Ok(n) => Ok(n),
    }
}
