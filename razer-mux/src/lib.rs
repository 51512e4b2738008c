//! Registry and report-relay core for Razer raw report multiplexing
//!
//! This crate holds the device pool and the fixed-length report relay:
//!
//! - a capacity-bounded slot table mapping minor IDs to live devices
//! - attach/detach lifecycle handling for hot-plugged devices
//! - blocking read/write of exactly one 90-byte report per call
//!
//! The enumeration layer (udev/hidapi scanning) and the node publisher
//! (how a registered minor becomes caller-visible) live in the daemon;
//! this crate only defines the seams they plug into.

pub mod devices;
pub mod error;
pub mod lifecycle;
pub mod publish;
pub mod registry;
pub mod report;
pub mod session;
pub mod transport;

pub use devices::{MatchTable, SUPPORTED_DEVICES, VENDOR_ID};
pub use error::MuxError;
pub use lifecycle::{LifecycleController, PRIMARY_INTERFACE};
pub use publish::{node_name, NodePublisher, NODE_PREFIX};
pub use registry::{DeviceEntry, Minor, Registry, SlotTable, MAX_DEVICES};
pub use report::{IoRequest, CONTROL_TIMEOUT, REPORT_INDEX, REPORT_LENGTH, REPORT_VALUE};
pub use session::DeviceSession;
pub use transport::{ControlTransport, Direction, HidReportTransport};
