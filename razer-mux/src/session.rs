//! Caller-facing read/write entry points for a registered session

use std::sync::Arc;

use tracing::debug;

use crate::error::MuxError;
use crate::registry::{Minor, Registry};
use crate::report::{self, IoRequest, REPORT_LENGTH};
use crate::transport::Direction;

/// A caller-facing handle to one registered device.
///
/// The session carries only its minor and a reference to the registry;
/// the device handle is looked up per call, so a session opened before
/// a detach fails fast afterwards instead of touching a dead device.
#[derive(Clone)]
pub struct DeviceSession {
    minor: Minor,
    registry: Arc<Registry>,
}

impl DeviceSession {
    pub fn new(minor: Minor, registry: Arc<Registry>) -> Self {
        Self { minor, registry }
    }

    pub fn minor(&self) -> Minor {
        self.minor
    }

    /// Relay one report from the device to the caller.
    ///
    /// Validates the request shape, performs the blocking device-to-host
    /// exchange outside the registry lock, and returns exactly
    /// [`REPORT_LENGTH`] bytes or an error, never a short read.
    pub fn read(&self, req: &IoRequest) -> Result<Vec<u8>, MuxError> {
        report::check_request("read", req)?;

        let mut data = vec![0u8; REPORT_LENGTH];
        let device = self
            .registry
            .device(self.minor)
            .ok_or(MuxError::Disconnected)?;

        let n = report::check_transfer("read", device.exchange(Direction::DeviceToHost, &mut data))?;
        debug!("read {} bytes from minor {}", n, self.minor);
        Ok(data)
    }

    /// Relay one report from the caller to the device.
    ///
    /// The payload must hold exactly the validated count; a mismatch
    /// means the caller's bytes could not be taken as presented.
    pub fn write(&self, req: &IoRequest, payload: &[u8]) -> Result<usize, MuxError> {
        report::check_request("write", req)?;

        let mut data = vec![0u8; REPORT_LENGTH];
        if payload.len() != req.count {
            return Err(MuxError::FaultyCopy(format!(
                "caller supplied {} bytes, expected {}",
                payload.len(),
                req.count
            )));
        }
        data.copy_from_slice(payload);

        let device = self
            .registry
            .device(self.minor)
            .ok_or(MuxError::Disconnected)?;

        let n = report::check_transfer("write", device.exchange(Direction::HostToDevice, &mut data))?;
        debug!("wrote {} bytes to minor {}", n, self.minor);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::registry::DeviceEntry;
    use crate::transport::ControlTransport;

    /// Stateful stub: a write stores the request, a read returns a
    /// device-generated answer. Counts exchanges to prove rejected
    /// requests never reach the transport.
    struct StubDevice {
        exchanges: AtomicUsize,
        last_request: Mutex<Vec<u8>>,
    }

    impl StubDevice {
        fn new() -> Self {
            Self {
                exchanges: AtomicUsize::new(0),
                last_request: Mutex::new(vec![0u8; REPORT_LENGTH]),
            }
        }
    }

    impl ControlTransport for StubDevice {
        fn exchange(&self, dir: Direction, report: &mut [u8]) -> Result<usize, MuxError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            match dir {
                Direction::HostToDevice => {
                    self.last_request.lock().unwrap().copy_from_slice(report);
                    Ok(report.len())
                }
                Direction::DeviceToHost => {
                    let request = self.last_request.lock().unwrap();
                    report[0] = 0x02;
                    report[1..8].copy_from_slice(&request[1..8]);
                    for b in &mut report[8..] {
                        *b = 0x5A;
                    }
                    Ok(report.len())
                }
            }
        }
    }

    fn session_with_stub() -> (DeviceSession, Arc<StubDevice>) {
        let registry = Arc::new(Registry::new());
        let device = Arc::new(StubDevice::new());
        registry.lock().insert(
            0,
            DeviceEntry {
                minor: 0,
                device: device.clone(),
            },
        );
        (DeviceSession::new(0, registry), device)
    }

    #[test]
    fn wrong_count_never_reaches_the_transport() {
        let (session, device) = session_with_stub();
        for count in [REPORT_LENGTH - 1, REPORT_LENGTH + 1] {
            let req = IoRequest {
                count,
                ..IoRequest::report()
            };
            assert!(matches!(
                session.read(&req),
                Err(MuxError::InvalidRequest(_))
            ));
            assert!(matches!(
                session.write(&req, &vec![0u8; count]),
                Err(MuxError::InvalidRequest(_))
            ));
        }
        assert_eq!(device.exchanges.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn nonblocking_never_reaches_the_transport() {
        let (session, device) = session_with_stub();
        let req = IoRequest {
            nonblocking: true,
            ..IoRequest::report()
        };
        assert!(session.read(&req).is_err());
        assert_eq!(device.exchanges.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn write_then_read_is_request_response_not_loopback() {
        let (session, _) = session_with_stub();

        let mut payload = vec![0u8; REPORT_LENGTH];
        payload[1] = 0x1f;
        payload[7] = 0x80;
        payload[10] = 0xEE;
        assert_eq!(
            session.write(&IoRequest::report(), &payload).unwrap(),
            REPORT_LENGTH
        );

        let response = session.read(&IoRequest::report()).unwrap();
        assert_eq!(response.len(), REPORT_LENGTH);
        // The device answered; the report is not the payload echoed back.
        assert_ne!(response, payload);
        assert_eq!(response[0], 0x02);
        assert_eq!(&response[1..8], &payload[1..8]);
    }

    #[test]
    fn payload_shorter_than_count_is_a_copy_fault() {
        let (session, device) = session_with_stub();
        let err = session
            .write(&IoRequest::report(), &[0u8; REPORT_LENGTH - 1])
            .unwrap_err();
        assert!(matches!(err, MuxError::FaultyCopy(_)));
        assert_eq!(device.exchanges.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detached_session_fails_instead_of_hanging() {
        let (session, _) = session_with_stub();
        session.registry.lock().remove(0);

        assert!(matches!(
            session.read(&IoRequest::report()),
            Err(MuxError::Disconnected)
        ));
        assert!(matches!(
            session.write(&IoRequest::report(), &[0u8; REPORT_LENGTH]),
            Err(MuxError::Disconnected)
        ));
    }

    #[test]
    fn short_transfer_from_the_device_is_rejected() {
        struct ShortDevice;
        impl ControlTransport for ShortDevice {
            fn exchange(&self, _dir: Direction, _report: &mut [u8]) -> Result<usize, MuxError> {
                Ok(REPORT_LENGTH - 5)
            }
        }

        let registry = Arc::new(Registry::new());
        registry.lock().insert(
            3,
            DeviceEntry {
                minor: 3,
                device: Arc::new(ShortDevice),
            },
        );
        let session = DeviceSession::new(3, registry);

        assert!(matches!(
            session.read(&IoRequest::report()),
            Err(MuxError::TransferLength { .. })
        ));
    }
}
