//! Namespace publication seam
//!
//! How a registered minor becomes reachable by callers is up to the
//! daemon (the stock publisher binds a Unix socket per node); the relay
//! core only fixes the naming scheme and the publish/unpublish contract.

use crate::error::MuxError;
use crate::registry::Minor;
use crate::session::DeviceSession;

/// Prefix of published node names.
pub const NODE_PREFIX: &str = "razer";

/// Deterministic node name for a minor: `razer0`, `razer1`, ...
pub fn node_name(minor: Minor) -> String {
    format!("{NODE_PREFIX}{minor}")
}

/// Makes a registered session reachable by its node name.
///
/// Both operations are invoked with the registry's exclusion domain
/// held; implementations must not call back into the registry.
/// `unpublish` must withdraw the name before it returns so no new
/// caller can reach a slot that is about to be freed.
pub trait NodePublisher: Send + Sync {
    fn publish(&self, minor: Minor, session: DeviceSession) -> Result<(), MuxError>;
    fn unpublish(&self, minor: Minor);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_names_are_prefix_plus_decimal_minor() {
        assert_eq!(node_name(0), "razer0");
        assert_eq!(node_name(9), "razer9");
    }
}
