//! Type definitions for mirrormgrd

use serde::{Deserialize, Serialize};

/// Reason code of a port-state notification.
///
/// Wire encoding follows the OpenFlow port-status reason field:
/// 0 = added, 1 = removed, 2 = modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortReason {
    /// A port was attached to the switch.
    Added,
    /// A port was detached from the switch.
    Removed,
    /// Port attributes changed.
    Modified,
}

impl PortReason {
    /// Decodes the wire reason code. Unknown codes are rejected.
    pub fn from_wire(code: u8) -> Option<Self> {
        match code {
            0 => Some(PortReason::Added),
            1 => Some(PortReason::Removed),
            2 => Some(PortReason::Modified),
            _ => None,
        }
    }
}

/// A port-state-change notification from the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStateEvent {
    /// Opaque datapath identifier of the switch that saw the change.
    pub datapath_id: u64,
    /// OpenFlow port number local to that switch.
    pub port_no: u32,
    /// What happened to the port.
    pub reason: PortReason,
}

impl PortStateEvent {
    /// Create a new event.
    pub fn new(datapath_id: u64, port_no: u32, reason: PortReason) -> Self {
        Self {
            datapath_id,
            port_no,
            reason,
        }
    }
}

/// Role assigned to an interface whose role is not pinned by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultRole {
    /// Unpinned interfaces become mirror sources (ingress selection).
    #[default]
    Source,
    /// Unpinned interfaces become mirror destinations (egress selection).
    Destination,
}

/// Result of classifying one bridge's interfaces into mirror roles.
///
/// Order within each list follows the order interfaces were delivered by the
/// topology query; an interface appears in at most one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Interfaces whose ingress traffic is selected.
    pub sources: Vec<String>,
    /// Interfaces whose egress traffic is selected.
    pub destinations: Vec<String>,
}

impl Classification {
    /// Returns true if nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.destinations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_reason_from_wire() {
        assert_eq!(PortReason::from_wire(0), Some(PortReason::Added));
        assert_eq!(PortReason::from_wire(1), Some(PortReason::Removed));
        assert_eq!(PortReason::from_wire(2), Some(PortReason::Modified));
        assert_eq!(PortReason::from_wire(3), None);
        assert_eq!(PortReason::from_wire(255), None);
    }

    #[test]
    fn test_default_role_default() {
        assert_eq!(DefaultRole::default(), DefaultRole::Source);
    }

    #[test]
    fn test_default_role_serde() {
        let role: DefaultRole = toml::Value::String("destination".to_string())
            .try_into()
            .unwrap();
        assert_eq!(role, DefaultRole::Destination);
    }

    #[test]
    fn test_classification_is_empty() {
        assert!(Classification::default().is_empty());

        let classification = Classification {
            sources: vec!["eth1".to_string()],
            destinations: Vec::new(),
        };
        assert!(!classification.is_empty());
    }
}
