//! Control-channel transport primitive

use std::sync::Mutex;

use hidapi::HidDevice;
use tracing::trace;

use crate::error::MuxError;

/// Direction of a control exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// GET_REPORT: the device fills the buffer.
    DeviceToHost,
    /// SET_REPORT: the buffer is sent to the device.
    HostToDevice,
}

/// Blocking, timeout-bounded control exchange of exactly `report.len()`
/// bytes in the given direction.
///
/// Implementations either move the whole buffer or return an error; the
/// relay rejects anything in between via the outcome check. Calls may
/// block for up to [`crate::report::CONTROL_TIMEOUT`].
pub trait ControlTransport: Send + Sync {
    fn exchange(&self, dir: Direction, report: &mut [u8]) -> Result<usize, MuxError>;
}

/// hidapi-backed transport using feature reports.
///
/// A feature GET/SET with report ID 0 is the usbhid rendering of the
/// class-scoped, interface-recipient GET_REPORT/SET_REPORT control
/// request with wValue [`crate::report::REPORT_VALUE`] and wIndex
/// [`crate::report::REPORT_INDEX`] that the devices speak.
pub struct HidReportTransport {
    device: Mutex<HidDevice>,
    path: String,
}

impl HidReportTransport {
    pub fn new(device: HidDevice, path: impl Into<String>) -> Self {
        Self {
            device: Mutex::new(device),
            path: path.into(),
        }
    }

    /// The hidapi path this transport was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ControlTransport for HidReportTransport {
    fn exchange(&self, dir: Direction, report: &mut [u8]) -> Result<usize, MuxError> {
        // hidapi frames feature reports with a leading report-ID byte
        // (0 here); strip it again before reporting the moved length.
        let mut framed = vec![0u8; report.len() + 1];
        let device = self.device.lock().unwrap();

        match dir {
            Direction::HostToDevice => {
                framed[1..].copy_from_slice(report);
                device.send_feature_report(&framed)?;
                trace!("sent feature report on {}", self.path);
                Ok(report.len())
            }
            Direction::DeviceToHost => {
                let n = device.get_feature_report(&mut framed)?;
                report.copy_from_slice(&framed[1..]);
                trace!("read feature report on {}", self.path);
                // The count includes the report-ID byte.
                Ok(n.saturating_sub(1))
            }
        }
    }
}
