//! Wire protocol spoken over a published device node
//!
//! One request per exchange: a fixed little-endian header, followed by
//! the payload for writes. The response is a status header, followed by
//! the payload for successful reads. The header carries the caller's
//! count/offset/blocking parameters verbatim so the relay core, not
//! the socket layer, decides what is acceptable.

use std::mem::size_of;

use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use razer_mux::{IoRequest, MuxError, REPORT_LENGTH};

/// Request operations.
pub mod op {
    pub const READ: u8 = 1;
    pub const WRITE: u8 = 2;
}

/// Request flags.
pub mod flag {
    /// Caller asks for non-blocking semantics (always rejected).
    pub const NONBLOCK: u8 = 0x01;
}

/// Response status codes, one per error kind plus OK.
pub mod status {
    pub const OK: u8 = 0;
    pub const INVALID_REQUEST: u8 = 1;
    pub const RESOURCE_EXHAUSTED: u8 = 2;
    pub const TRANSFER_FAULT: u8 = 3;
    pub const TRANSFER_LENGTH: u8 = 4;
    pub const ALLOCATION_FAULT: u8 = 5;
    pub const FAULTY_COPY: u8 = 6;
    pub const PUBLICATION_FAULT: u8 = 7;
    pub const DISCONNECTED: u8 = 8;
}

/// Largest payload a write request may carry. Anything bigger is
/// rejected without draining the stream.
pub const MAX_PAYLOAD: usize = 4096;

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy)]
#[repr(C)]
pub struct RequestHeader {
    pub op: u8,
    pub flags: u8,
    pub reserved: [u8; 2],
    pub count: U32,
    pub offset: U64,
}

pub const REQUEST_HEADER_LEN: usize = size_of::<RequestHeader>();

impl RequestHeader {
    /// Header for a blocking read of one report.
    pub fn read() -> Self {
        Self {
            op: op::READ,
            flags: 0,
            reserved: [0; 2],
            count: U32::new(REPORT_LENGTH as u32),
            offset: U64::new(0),
        }
    }

    /// Header for a blocking write of one report.
    pub fn write() -> Self {
        Self {
            op: op::WRITE,
            ..Self::read()
        }
    }

    /// The request shape this header asks for.
    pub fn to_io_request(&self) -> IoRequest {
        IoRequest {
            count: self.count.get() as usize,
            offset: self.offset.get(),
            nonblocking: self.flags & flag::NONBLOCK != 0,
        }
    }
}

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy)]
#[repr(C)]
pub struct ResponseHeader {
    pub status: u8,
    pub reserved: [u8; 3],
    /// Payload length (read) or bytes written (write).
    pub len: U32,
}

pub const RESPONSE_HEADER_LEN: usize = size_of::<ResponseHeader>();

impl ResponseHeader {
    pub fn ok(len: u32) -> Self {
        Self {
            status: status::OK,
            reserved: [0; 3],
            len: U32::new(len),
        }
    }

    pub fn error(status: u8) -> Self {
        Self {
            status,
            reserved: [0; 3],
            len: U32::new(0),
        }
    }
}

/// Wire status code for an error.
pub fn status_of(err: &MuxError) -> u8 {
    match err {
        MuxError::InvalidRequest(_) => status::INVALID_REQUEST,
        MuxError::ResourceExhausted => status::RESOURCE_EXHAUSTED,
        MuxError::TransferFault(_) => status::TRANSFER_FAULT,
        MuxError::TransferLength { .. } => status::TRANSFER_LENGTH,
        MuxError::AllocationFault => status::ALLOCATION_FAULT,
        MuxError::FaultyCopy(_) => status::FAULTY_COPY,
        MuxError::PublicationFault(_) => status::PUBLICATION_FAULT,
        MuxError::Disconnected => status::DISCONNECTED,
    }
}

/// Error for a wire status code. Message detail is not carried over the
/// wire, only the kind.
pub fn error_of(code: u8) -> MuxError {
    match code {
        status::INVALID_REQUEST => MuxError::InvalidRequest("rejected by multiplexer".into()),
        status::RESOURCE_EXHAUSTED => MuxError::ResourceExhausted,
        status::TRANSFER_FAULT => MuxError::TransferFault("reported by multiplexer".into()),
        status::TRANSFER_LENGTH => MuxError::TransferLength {
            actual: 0,
            expected: REPORT_LENGTH,
        },
        status::ALLOCATION_FAULT => MuxError::AllocationFault,
        status::FAULTY_COPY => MuxError::FaultyCopy("reported by multiplexer".into()),
        status::PUBLICATION_FAULT => MuxError::PublicationFault("reported by multiplexer".into()),
        status::DISCONNECTED => MuxError::Disconnected,
        other => MuxError::TransferFault(format!("unknown status {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sizes_are_fixed() {
        assert_eq!(REQUEST_HEADER_LEN, 16);
        assert_eq!(RESPONSE_HEADER_LEN, 8);
    }

    #[test]
    fn request_header_roundtrips() {
        let header = RequestHeader::write();
        let bytes = header.as_bytes().to_vec();
        let parsed = RequestHeader::read_from_bytes(&bytes).unwrap();
        assert_eq!(parsed.op, op::WRITE);
        assert_eq!(parsed.count.get() as usize, REPORT_LENGTH);
        assert_eq!(parsed.offset.get(), 0);
    }

    #[test]
    fn io_request_reflects_header_fields() {
        let mut header = RequestHeader::read();
        header.flags = flag::NONBLOCK;
        header.count = U32::new(89);
        header.offset = U64::new(7);

        let req = header.to_io_request();
        assert!(req.nonblocking);
        assert_eq!(req.count, 89);
        assert_eq!(req.offset, 7);
    }

    #[test]
    fn status_codes_roundtrip_error_kinds() {
        let errors = [
            MuxError::InvalidRequest("x".into()),
            MuxError::ResourceExhausted,
            MuxError::TransferFault("x".into()),
            MuxError::TransferLength {
                actual: 1,
                expected: REPORT_LENGTH,
            },
            MuxError::AllocationFault,
            MuxError::FaultyCopy("x".into()),
            MuxError::PublicationFault("x".into()),
            MuxError::Disconnected,
        ];
        for err in errors {
            let code = status_of(&err);
            assert_eq!(status_of(&error_of(code)), code);
        }
    }
}
