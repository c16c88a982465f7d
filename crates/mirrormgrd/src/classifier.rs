//! Interface role classification.
//!
//! Assigns every interface of a bridge to exactly one mirror role. Pure
//! function of the interface list and the configuration; the reconciler
//! feeds its output straight into the mutation builder.

use crate::config::MirrorConfig;
use crate::types::{Classification, DefaultRole};

/// Classifies a bridge's interfaces into mirror sources and destinations.
///
/// Order-preserving over `ifaces`. An interface lands in at most one list:
/// the global exception set and the session's own output interface are
/// dropped first, then pinned roles apply, then the configured default role.
///
/// When `bridge` is the configured host bridge, the bridge's own port-zero
/// device is appended as a final source so host management traffic is
/// mirrored as well.
pub fn classify(
    config: &MirrorConfig,
    bridge: &str,
    session: &str,
    ifaces: &[String],
) -> Classification {
    let output = config.output_for(session).unwrap_or_default();

    let mut classification = Classification::default();

    for iface in ifaces {
        if config.is_exception(iface) || iface == output {
            continue;
        }

        if config.is_pinned_source(session, iface) {
            classification.sources.push(iface.clone());
        } else if config.is_pinned_destination(session, iface) {
            classification.destinations.push(iface.clone());
        } else {
            match config.default_role {
                DefaultRole::Source => classification.sources.push(iface.clone()),
                DefaultRole::Destination => classification.destinations.push(iface.clone()),
            }
        }
    }

    if config.host_bridge.as_deref() == Some(bridge)
        && !config.is_exception(bridge)
        && bridge != output
    {
        classification.sources.push(bridge.to_string());
    }

    classification
}
