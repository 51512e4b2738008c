// Razer raw-report multiplexer - shared library
// Socket nodes, wire protocol, hot-plug scanning, and client helpers

pub mod client;
pub mod hotplug;
pub mod node;
pub mod protocol;
pub mod wire;

pub use client::{battery_level, list_nodes, query, serial_number, ClientError, NodeClient};
pub use hotplug::HotplugWatcher;
pub use node::SocketPublisher;
pub use protocol::Message;
