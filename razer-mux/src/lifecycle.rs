//! Attach/detach lifecycle for the device pool
//!
//! Reacts to hot-plug notifications from the enumeration layer: an
//! attach allocates the lowest free minor, fills its slot and publishes
//! the node; a detach withdraws the node and frees the slot. All state
//! transitions happen inside the registry's exclusion domain so
//! concurrent attach/detach events cannot interleave half-built slots.

use std::sync::Arc;

use tracing::{error, info};

use crate::error::MuxError;
use crate::publish::{node_name, NodePublisher};
use crate::registry::{DeviceEntry, Minor, Registry};
use crate::session::DeviceSession;
use crate::transport::ControlTransport;

/// Interface selector of the primary interface. Only it is registered;
/// a multi-interface device must not produce duplicate nodes.
pub const PRIMARY_INTERFACE: i32 = 0;

pub struct LifecycleController {
    registry: Arc<Registry>,
    publisher: Arc<dyn NodePublisher>,
}

impl LifecycleController {
    pub fn new(registry: Arc<Registry>, publisher: Arc<dyn NodePublisher>) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handle an attach notification for one discovered interface.
    ///
    /// Non-primary interfaces are ignored and return `Ok(None)` with no
    /// state change. On success the new minor is returned; the caller
    /// keeps it as the context for the matching detach. A failure
    /// leaves the table exactly as it was and affects no other device.
    pub fn on_attach(
        &self,
        device: Arc<dyn ControlTransport>,
        interface: i32,
    ) -> Result<Option<Minor>, MuxError> {
        if interface != PRIMARY_INTERFACE {
            return Ok(None);
        }

        let mut table = self.registry.lock();

        let minor = table.next_free_minor().ok_or_else(|| {
            error!("out of minor IDs");
            MuxError::ResourceExhausted
        })?;

        table.insert(minor, DeviceEntry { minor, device });

        // Publish after insert; unwind the slot if the node cannot be
        // created so the minor stays reusable.
        let session = DeviceSession::new(minor, self.registry.clone());
        if let Err(e) = self.publisher.publish(minor, session) {
            table.remove(minor);
            error!("failed to publish {}: {}", node_name(minor), e);
            return Err(e);
        }

        info!("registered {}", node_name(minor));
        Ok(Some(minor))
    }

    /// Handle a detach notification.
    ///
    /// An unknown or already empty minor is a silent no-op. Otherwise
    /// the node is unpublished before the slot is freed, so no new
    /// caller can open a handle to a slot mid-teardown.
    pub fn on_detach(&self, minor: Minor) {
        let mut table = self.registry.lock();
        if table.get(minor).is_none() {
            return;
        }

        self.publisher.unpublish(minor);
        table.remove(minor);
        info!("unregistered {}", node_name(minor));
    }

    /// Detach every live session. Process teardown plumbing.
    pub fn shutdown(&self) {
        let occupied = self.registry.lock().occupied();
        for minor in occupied {
            self.on_detach(minor);
        }
    }
}
