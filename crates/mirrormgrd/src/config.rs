//! Configuration file support for mirrormgrd
//!
//! Loads and validates the mirror policy from a TOML file.
//! Default location: /etc/mirrormgr/mirrormgrd.conf
//!
//! The configuration is loaded once at startup, validated, and passed by
//! reference into every component that needs it; nothing mutates it after
//! that.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mirror_common::{MirrorError, MirrorResult};

use crate::types::DefaultRole;

/// Management-channel tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Bound on one command round trip, in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl ChannelConfig {
    /// Command timeout as a [`Duration`].
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Complete mirrormgrd configuration.
///
/// The mirror tables are keyed by session name, not bridge name; `bridges`
/// maps each managed bridge to its session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Interfaces that never participate in any mirror, in any role.
    #[serde(default)]
    pub exceptions: Vec<String>,

    /// Managed bridge name -> mirror session name.
    ///
    /// A BTreeMap keeps the startup rebuild order deterministic.
    #[serde(default)]
    pub bridges: BTreeMap<String, String>,

    /// Session name -> output interface. Must cover every session referenced
    /// by `bridges`.
    #[serde(default)]
    pub output_ports: HashMap<String, String>,

    /// Session name -> interfaces pinned as mirror sources.
    #[serde(default)]
    pub source_ports: HashMap<String, Vec<String>>,

    /// Session name -> interfaces pinned as mirror destinations.
    #[serde(default)]
    pub destination_ports: HashMap<String, Vec<String>>,

    /// Role applied to interfaces that are neither pinned nor excluded.
    #[serde(default)]
    pub default_role: DefaultRole,

    /// Bridge hosting the hypervisor's management traffic. When set, that
    /// bridge's own port-zero device is appended as an extra mirror source
    /// so host management traffic is mirrored too.
    #[serde(default)]
    pub host_bridge: Option<String>,

    /// Management-channel tunables.
    #[serde(default)]
    pub channel: ChannelConfig,
}

fn default_command_timeout() -> u64 {
    10
}

impl MirrorConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> MirrorResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            MirrorError::config("file", format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> MirrorResult<Self> {
        let config: MirrorConfig = toml::from_str(contents)
            .map_err(|e| MirrorError::config("file", format!("parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration invariants. Violations are fatal at startup.
    pub fn validate(&self) -> MirrorResult<()> {
        if self.bridges.is_empty() {
            return Err(MirrorError::config("bridges", "no bridges configured"));
        }

        // Every session bound to a bridge must have a non-empty output
        // interface; a mirror without an output port cannot exist.
        for (bridge, session) in &self.bridges {
            match self.output_ports.get(session) {
                None => {
                    return Err(MirrorError::config(
                        "output_ports",
                        format!(
                            "session '{}' (bridge '{}') has no output interface",
                            session, bridge
                        ),
                    ));
                }
                Some(output) if output.is_empty() => {
                    return Err(MirrorError::config(
                        "output_ports",
                        format!("session '{}' has an empty output interface", session),
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(host_bridge) = &self.host_bridge {
            if !self.bridges.contains_key(host_bridge) {
                return Err(MirrorError::config(
                    "host_bridge",
                    format!("'{}' is not a managed bridge", host_bridge),
                ));
            }
        }

        Ok(())
    }

    /// Session name for a managed bridge, if any.
    pub fn session_for(&self, bridge: &str) -> Option<&str> {
        self.bridges.get(bridge).map(String::as_str)
    }

    /// Output interface for a session. Guaranteed present for managed
    /// bridges once `validate` has passed.
    pub fn output_for(&self, session: &str) -> Option<&str> {
        self.output_ports.get(session).map(String::as_str)
    }

    /// True if the interface is in the global exception set.
    pub fn is_exception(&self, iface: &str) -> bool {
        self.exceptions.iter().any(|e| e == iface)
    }

    /// True if the bridge is under management.
    pub fn is_managed(&self, bridge: &str) -> bool {
        self.bridges.contains_key(bridge)
    }

    /// True if `iface` is pinned as a source for `session`.
    pub fn is_pinned_source(&self, session: &str, iface: &str) -> bool {
        self.source_ports
            .get(session)
            .is_some_and(|list| list.iter().any(|i| i == iface))
    }

    /// True if `iface` is pinned as a destination for `session`.
    pub fn is_pinned_destination(&self, session: &str, iface: &str) -> bool {
        self.destination_ports
            .get(session)
            .is_some_and(|list| list.iter().any(|i| i == iface))
    }
}
