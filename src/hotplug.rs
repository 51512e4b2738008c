//! Hot-plug scanning driven by udev notifications
//!
//! Rather than decoding individual udev payloads, any hidraw add or
//! remove event triggers a full rescan: the current hidapi enumeration
//! is reconciled against what we have attached so far. Every matching
//! HID interface gets exactly one attach notification (the controller
//! filters non-primary interfaces); a vanished path that had a
//! registered minor gets the detach.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use hidapi::HidApi;
use tokio_udev::{AsyncMonitorSocket, EventType, MonitorBuilder};
use tracing::{debug, info, warn};

use razer_mux::{HidReportTransport, LifecycleController, MatchTable, Minor};

/// Settle time between a udev event and the rescan, so freshly plugged
/// interfaces are all enumerable.
const SETTLE_DELAY: Duration = Duration::from_millis(200);

pub struct HotplugWatcher {
    lifecycle: Arc<LifecycleController>,
    matches: MatchTable,
    /// Attach bookkeeping keyed by hidapi device path. `None` marks an
    /// interface that was probed but not registered (non-primary).
    attached: HashMap<String, Option<Minor>>,
}

impl HotplugWatcher {
    pub fn new(lifecycle: Arc<LifecycleController>, matches: MatchTable) -> Self {
        Self {
            lifecycle,
            matches,
            attached: HashMap::new(),
        }
    }

    /// Reconcile the registry with the currently enumerable devices.
    pub fn rescan(&mut self) {
        let api = match HidApi::new() {
            Ok(api) => api,
            Err(e) => {
                warn!("hidapi enumeration failed: {}", e);
                return;
            }
        };

        let present: Vec<hidapi::DeviceInfo> = api
            .device_list()
            .filter(|info| self.matches.matches(info.vendor_id(), info.product_id()))
            .cloned()
            .collect();
        let present_paths: HashSet<String> = present.iter().map(path_of).collect();

        // Detach devices that are gone.
        let gone: Vec<String> = self
            .attached
            .keys()
            .filter(|path| !present_paths.contains(*path))
            .cloned()
            .collect();
        for path in gone {
            if let Some(Some(minor)) = self.attached.remove(&path) {
                info!("device removed: {} (minor {})", path, minor);
                self.lifecycle.on_detach(minor);
            }
        }

        // Attach devices that are new.
        for info in &present {
            let path = path_of(info);
            if self.attached.contains_key(&path) {
                continue;
            }

            let device = match info.open_device(&api) {
                Ok(dev) => Arc::new(HidReportTransport::new(dev, path.clone())),
                Err(e) => {
                    warn!("failed to open {}: {}", path, e);
                    continue;
                }
            };

            match self.lifecycle.on_attach(device, info.interface_number()) {
                Ok(Some(minor)) => {
                    info!(
                        "device attached: {:04x}:{:04x} at {} (minor {})",
                        info.vendor_id(),
                        info.product_id(),
                        path,
                        minor
                    );
                    self.attached.insert(path, Some(minor));
                }
                Ok(None) => {
                    debug!(
                        "skipping non-primary interface {} at {}",
                        info.interface_number(),
                        path
                    );
                    self.attached.insert(path, None);
                }
                // Attach failures leave the path unrecorded so the next
                // rescan retries; only this device is affected.
                Err(e) => warn!("attach failed for {}: {}", path, e),
            }
        }
    }

    /// Run until the daemon shuts down: one initial scan, then a rescan
    /// per hidraw add/remove event.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.rescan();

        let monitor: AsyncMonitorSocket = MonitorBuilder::new()
            .context("creating udev monitor")?
            .match_subsystem("hidraw")
            .context("filtering hidraw subsystem")?
            .listen()
            .context("listening for udev events")?
            .try_into()
            .context("binding udev monitor to the runtime")?;
        info!("watching udev hidraw events");

        let mut events = monitor;
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(e) => e,
                Err(e) => {
                    warn!("udev event error: {}", e);
                    continue;
                }
            };
            match event.event_type() {
                EventType::Add | EventType::Remove => {
                    debug!("hidraw {:?} event, rescanning", event.event_type());
                    tokio::time::sleep(SETTLE_DELAY).await;
                    self.rescan();
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn path_of(info: &hidapi::DeviceInfo) -> String {
    info.path().to_string_lossy().into_owned()
}
