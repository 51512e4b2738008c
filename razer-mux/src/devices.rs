//! Supported device identities
//!
//! Single source of truth for the vendor/product IDs the enumeration
//! layer looks for. The relay core itself never consults these; new
//! product IDs extend the match table without touching it.

/// Razer vendor ID.
pub const VENDOR_ID: u16 = 0x1532;

/// DeathAdder V2 Pro, USB cable.
pub const PID_DEATHADDER_V2_PRO_WIRED: u16 = 0x007c;

/// DeathAdder V2 Pro, 2.4GHz dongle.
pub const PID_DEATHADDER_V2_PRO_WIRELESS: u16 = 0x007d;

/// Default (vendor, product) match list.
pub const SUPPORTED_DEVICES: &[(u16, u16)] = &[
    (VENDOR_ID, PID_DEATHADDER_V2_PRO_WIRED),
    (VENDOR_ID, PID_DEATHADDER_V2_PRO_WIRELESS),
];

/// Declarative set of (vendor, product) pairs consulted by the
/// hot-plug scanner.
#[derive(Debug, Clone)]
pub struct MatchTable {
    pairs: Vec<(u16, u16)>,
}

impl MatchTable {
    /// Table pre-populated with the built-in supported devices.
    pub fn new() -> Self {
        Self {
            pairs: SUPPORTED_DEVICES.to_vec(),
        }
    }

    /// Add another (vendor, product) pair to match.
    pub fn with_device(mut self, vid: u16, pid: u16) -> Self {
        if !self.pairs.contains(&(vid, pid)) {
            self.pairs.push((vid, pid));
        }
        self
    }

    #[inline]
    pub fn matches(&self, vid: u16, pid: u16) -> bool {
        self.pairs.contains(&(vid, pid))
    }

    pub fn pairs(&self) -> &[(u16, u16)] {
        &self.pairs
    }
}

impl Default for MatchTable {
    fn default() -> Self {
        Self::new()
    }
}
