//! Razer command framing for the 90-byte report protocol
//!
//! The multiplexer relays reports as opaque bytes; this module knows
//! the command frame the devices actually speak and backs the query
//! subcommands. A frame carries a transaction ID, command class/ID, an
//! argument area, and an XOR checksum over bytes 2..88 stored at
//! byte 88. Responses echo bytes 1..8 of the request and report status
//! 0x02 on success.

use razer_mux::REPORT_LENGTH;
use thiserror::Error;

/// Byte offsets within a frame.
mod field {
    /// Response status (0x02 = success).
    pub const STATUS: usize = 0;
    /// Transaction ID.
    pub const TRANSACTION: usize = 1;
    /// Argument length.
    pub const DATA_SIZE: usize = 5;
    /// Command class.
    pub const CLASS: usize = 6;
    /// Command ID.
    pub const COMMAND: usize = 7;
    /// First argument byte.
    pub const ARGS: usize = 8;
    /// XOR checksum over bytes 2..88.
    pub const CHECKSUM: usize = 88;
}

/// Status value a device reports on success.
const STATUS_SUCCESS: u8 = 0x02;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("device reported status 0x{0:02X}")]
    BadStatus(u8),

    #[error("response checksum mismatch")]
    BadChecksum,

    #[error("response does not match the request")]
    Mismatched,

    #[error("invalid hex payload")]
    BadHex,
}

/// One 90-byte command frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    data: [u8; REPORT_LENGTH],
}

impl Message {
    /// Zero-initialized frame.
    pub fn new() -> Self {
        Self {
            data: [0u8; REPORT_LENGTH],
        }
    }

    /// Build a command frame and seal it with its checksum.
    pub fn command(transaction: u8, class: u8, command: u8, data_size: u8, args: &[u8]) -> Self {
        let mut msg = Self::new();
        msg.data[field::TRANSACTION] = transaction;
        msg.data[field::DATA_SIZE] = data_size;
        msg.data[field::CLASS] = class;
        msg.data[field::COMMAND] = command;
        msg.data[field::ARGS..field::ARGS + args.len()].copy_from_slice(args);
        msg.data[field::CHECKSUM] = msg.checksum();
        msg
    }

    pub fn from_bytes(data: [u8; REPORT_LENGTH]) -> Self {
        Self { data }
    }

    pub fn bytes(&self) -> &[u8; REPORT_LENGTH] {
        &self.data
    }

    /// XOR of bytes 2..88.
    pub fn checksum(&self) -> u8 {
        self.data[2..field::CHECKSUM].iter().fold(0, |acc, b| acc ^ b)
    }

    /// Argument byte at `i`, relative to the argument area.
    pub fn arg(&self, i: usize) -> u8 {
        self.data[field::ARGS + i]
    }

    /// Validate a response against the request that produced it.
    pub fn validate_response(&self, response: &Message) -> Result<(), ProtocolError> {
        if response.data[field::STATUS] != STATUS_SUCCESS {
            return Err(ProtocolError::BadStatus(response.data[field::STATUS]));
        }
        if response.data[field::CHECKSUM] != response.checksum() {
            return Err(ProtocolError::BadChecksum);
        }
        // Transaction through command ID must echo the request.
        if response.data[1..field::ARGS] != self.data[1..field::ARGS] {
            return Err(ProtocolError::Mismatched);
        }
        Ok(())
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

/// Request the battery level (class 0x07, command 0x80).
pub fn battery_request() -> Message {
    Message::command(0x1f, 0x07, 0x80, 0x02, &[])
}

/// Percentage from a battery response; devices report 0-255.
pub fn parse_battery(response: &Message) -> u8 {
    (response.arg(1) as f32 * 100.0 / 255.0) as u8
}

/// Request the serial number (class 0x00, command 0x82).
pub fn serial_request() -> Message {
    Message::command(0x08, 0x00, 0x82, 0x16, &[])
}

/// NUL-terminated ASCII serial from a response.
pub fn parse_serial(response: &Message) -> String {
    response.bytes()[field::ARGS..field::CHECKSUM]
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Parse a hex string ("001f2a" or "00 1f 2a") into a report frame,
/// zero-padding to the full length.
pub fn report_from_hex(s: &str) -> Result<[u8; REPORT_LENGTH], ProtocolError> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() % 2 != 0 || compact.len() / 2 > REPORT_LENGTH {
        return Err(ProtocolError::BadHex);
    }

    let mut report = [0u8; REPORT_LENGTH];
    for (i, pair) in compact.as_bytes().chunks(2).enumerate() {
        let digits = std::str::from_utf8(pair).map_err(|_| ProtocolError::BadHex)?;
        report[i] = u8::from_str_radix(digits, 16).map_err(|_| ProtocolError::BadHex)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build the response a well-behaved device would send back.
    fn response_for(request: &Message, args: &[u8]) -> Message {
        let mut data = *request.bytes();
        data[field::STATUS] = STATUS_SUCCESS;
        data[field::ARGS..field::ARGS + args.len()].copy_from_slice(args);
        let mut response = Message::from_bytes(data);
        response.data[field::CHECKSUM] = response.checksum();
        response
    }

    #[test]
    fn command_frames_are_sealed_with_their_checksum() {
        let msg = battery_request();
        assert_eq!(msg.bytes()[field::CHECKSUM], msg.checksum());
        assert_eq!(msg.bytes()[field::TRANSACTION], 0x1f);
        assert_eq!(msg.bytes()[field::CLASS], 0x07);
        assert_eq!(msg.bytes()[field::COMMAND], 0x80);
    }

    #[test]
    fn valid_response_is_accepted() {
        let request = battery_request();
        let response = response_for(&request, &[0x00, 0xff]);
        assert!(request.validate_response(&response).is_ok());
    }

    #[test]
    fn bad_status_is_rejected() {
        let request = battery_request();
        let mut response = response_for(&request, &[]);
        response.data[field::STATUS] = 0x05;
        assert!(matches!(
            request.validate_response(&response),
            Err(ProtocolError::BadStatus(0x05))
        ));
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let request = battery_request();
        let mut response = response_for(&request, &[]);
        response.data[20] ^= 0xff;
        assert!(matches!(
            request.validate_response(&response),
            Err(ProtocolError::BadChecksum)
        ));
    }

    #[test]
    fn mismatched_command_is_rejected() {
        let request = battery_request();
        let mut other = serial_request();
        other.data[field::STATUS] = STATUS_SUCCESS;
        other.data[field::CHECKSUM] = other.checksum();
        assert!(matches!(
            request.validate_response(&other),
            Err(ProtocolError::Mismatched)
        ));
    }

    #[test]
    fn battery_scales_to_percent() {
        let request = battery_request();
        assert_eq!(parse_battery(&response_for(&request, &[0x00, 0xff])), 100);
        assert_eq!(parse_battery(&response_for(&request, &[0x00, 0x00])), 0);
        // 128/255 of full scale.
        assert_eq!(parse_battery(&response_for(&request, &[0x00, 0x80])), 50);
    }

    #[test]
    fn serial_stops_at_first_nul() {
        let request = serial_request();
        let response = response_for(&request, b"PM2031H00000000\0junk");
        assert_eq!(parse_serial(&response), "PM2031H00000000");
    }

    #[test]
    fn hex_payloads_parse_and_pad() {
        let report = report_from_hex("00 1f 00").unwrap();
        assert_eq!(report[1], 0x1f);
        assert_eq!(report[3], 0);

        assert!(report_from_hex("0").is_err());
        assert!(report_from_hex("zz").is_err());
        assert!(report_from_hex(&"00".repeat(REPORT_LENGTH + 1)).is_err());
    }
}
