//! Topology queries against the switch management plane.
//!
//! Three lookups, all round trips over the management channel: datapath id
//! to bridge name, (bridge, OpenFlow port number) to interface name, and the
//! interface listing of a bridge. Query failures at the transport level
//! surface as channel errors; an absent or malformed entry is `NotFound`.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use mirror_common::{ManagementChannel, MirrorError, MirrorResult};

use crate::commands::{build_dump_ports_cmd, build_find_bridge_cmd, build_list_ifaces_cmd};

/// Matches one `<ofport>(<iface>)` entry of a port-description dump.
static PORT_DESC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\(([^)]+)\)").expect("Invalid regex pattern"));

/// Read-only view of the switch topology.
#[derive(Clone)]
pub struct TopologyClient {
    channel: Arc<dyn ManagementChannel>,
}

impl TopologyClient {
    /// Creates a client over the given channel.
    pub fn new(channel: Arc<dyn ManagementChannel>) -> Self {
        Self { channel }
    }

    /// Resolves a datapath id to its bridge name.
    ///
    /// The table-formatted query output carries a header line, a rule line,
    /// and one quoted name per matching bridge; anything other than exactly
    /// one match is `NotFound`.
    pub async fn resolve_bridge(&self, datapath_id: u64) -> MirrorResult<String> {
        let cmd = build_find_bridge_cmd(datapath_id);
        let output = self.channel.run(&cmd).await?;

        let lines: Vec<&str> = output.lines().collect();
        if lines.len() != 3 {
            return Err(MirrorError::not_found(
                "bridge",
                format!("datapath_id={:016x}", datapath_id),
            ));
        }

        let name = lines[2].trim().trim_matches('"');
        if name.is_empty() {
            return Err(MirrorError::not_found(
                "bridge",
                format!("datapath_id={:016x}", datapath_id),
            ));
        }

        Ok(name.to_string())
    }

    /// Resolves an OpenFlow port number to its interface name on a bridge.
    pub async fn resolve_interface(&self, bridge: &str, port_no: u32) -> MirrorResult<String> {
        let cmd = build_dump_ports_cmd(bridge);
        let output = self.channel.run(&cmd).await?;

        for cap in PORT_DESC_RE.captures_iter(&output) {
            let number: u32 = match cap[1].parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if number == port_no {
                return Ok(cap[2].to_string());
            }
        }

        Err(MirrorError::not_found(
            "interface",
            format!("{} port {}", bridge, port_no),
        ))
    }

    /// Lists the interfaces currently attached to a bridge.
    ///
    /// Order is whatever the switch reports; stable within one call.
    pub async fn list_interfaces(&self, bridge: &str) -> MirrorResult<Vec<String>> {
        let cmd = build_list_ifaces_cmd(bridge);
        let output = self.channel.run(&cmd).await?;

        Ok(output.split_whitespace().map(String::from).collect())
    }
}
