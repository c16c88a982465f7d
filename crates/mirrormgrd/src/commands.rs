//! Command builders for OVSDB mirror operations.
//!
//! The mirror mutation is assembled as a sequence of typed clauses and
//! serialized once at the end, so handle numbering and separators cannot
//! drift out of step with the interface lists. Handles (`@src0`, `@dst0`,
//! `@out`, `@m`) live only inside the one command they are minted for.
//!
//! The serialized grammar is parsed by `ovs-vsctl` on the target host, so
//! the clause text is exact: clauses joined by ` -- `, the bridge binding
//! first, then one `get Port` clause per participating interface, then the
//! mirror creation consuming every minted handle.

use mirror_common::shellquote;

use crate::types::Classification;

/// Path of the OVSDB management utility on the target host.
pub const OVS_VSCTL_CMD: &str = "ovs-vsctl";

/// Path of the OpenFlow management utility on the target host.
pub const OVS_OFCTL_CMD: &str = "ovs-ofctl";

/// A transient reference minted inside one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    /// `@src<i>` — a resolved source port.
    Src(usize),
    /// `@dst<i>` — a resolved destination port.
    Dst(usize),
    /// `@out` — the resolved output port.
    Out,
    /// `@m` — the mirror object being created.
    Mirror,
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handle::Src(i) => write!(f, "@src{}", i),
            Handle::Dst(i) => write!(f, "@dst{}", i),
            Handle::Out => write!(f, "@out"),
            Handle::Mirror => write!(f, "@m"),
        }
    }
}

/// One clause of a mirror mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `set Bridge <bridge> mirrors=@m` — rebinds the bridge's mirror set to
    /// the mirror created later in the same request.
    SetBridgeMirrors { bridge: String },
    /// `--id=<handle> get Port <iface>` — resolves a port object and binds
    /// it to a handle for later clauses.
    GetPort { handle: Handle, iface: String },
    /// `--id=@m create Mirror ...` — creates the mirror, consuming every
    /// handle minted by the preceding clauses.
    CreateMirror {
        session: String,
        src_handles: Vec<Handle>,
        dst_handles: Vec<Handle>,
        out_handle: Handle,
    },
}

impl Clause {
    fn serialize(&self) -> String {
        // Bridge, interface and session names are shell-quoted: interface
        // names arrive from live query output and the whole command goes
        // through the shell before ovs-vsctl parses it. The shell strips the
        // quotes again, so the clause grammar the target sees is unchanged.
        match self {
            Clause::SetBridgeMirrors { bridge } => {
                format!(
                    "set Bridge {} mirrors={}",
                    shellquote(bridge),
                    Handle::Mirror
                )
            }
            Clause::GetPort { handle, iface } => {
                format!("--id={} get Port {}", handle, shellquote(iface))
            }
            Clause::CreateMirror {
                session,
                src_handles,
                dst_handles,
                out_handle,
            } => {
                let mut attrs = format!(
                    "--id={} create Mirror name={}",
                    Handle::Mirror,
                    shellquote(session)
                );
                if !src_handles.is_empty() {
                    attrs.push_str(&format!(" select-src-port={}", join_handles(src_handles)));
                }
                if !dst_handles.is_empty() {
                    attrs.push_str(&format!(" select-dst-port={}", join_handles(dst_handles)));
                }
                attrs.push_str(&format!(" output-port={}", out_handle));
                attrs
            }
        }
    }
}

fn join_handles(handles: &[Handle]) -> String {
    handles
        .iter()
        .map(Handle::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Builder for one atomic mirror replacement.
///
/// Either the whole request applies and the new session replaces the old
/// binding, or it fails and the bridge keeps its previous state; no
/// intermediate state is observable on the target.
#[derive(Debug, Clone)]
pub struct MirrorMutation {
    bridge: String,
    session: String,
    output: String,
    sources: Vec<String>,
    destinations: Vec<String>,
}

impl MirrorMutation {
    /// Starts a mutation for one bridge/session pair.
    pub fn new(
        bridge: impl Into<String>,
        session: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            bridge: bridge.into(),
            session: session.into(),
            output: output.into(),
            sources: Vec::new(),
            destinations: Vec::new(),
        }
    }

    /// Adds a source interface.
    pub fn add_source(&mut self, iface: impl Into<String>) -> &mut Self {
        self.sources.push(iface.into());
        self
    }

    /// Adds a destination interface.
    pub fn add_destination(&mut self, iface: impl Into<String>) -> &mut Self {
        self.destinations.push(iface.into());
        self
    }

    /// Adds every interface of a classification result.
    pub fn add_classification(&mut self, classification: &Classification) -> &mut Self {
        for iface in &classification.sources {
            self.add_source(iface.clone());
        }
        for iface in &classification.destinations {
            self.add_destination(iface.clone());
        }
        self
    }

    /// The typed clause sequence, in submission order.
    pub fn clauses(&self) -> Vec<Clause> {
        let mut clauses = vec![Clause::SetBridgeMirrors {
            bridge: self.bridge.clone(),
        }];

        let src_handles: Vec<Handle> = (0..self.sources.len()).map(Handle::Src).collect();
        let dst_handles: Vec<Handle> = (0..self.destinations.len()).map(Handle::Dst).collect();

        for (handle, iface) in src_handles.iter().zip(&self.sources) {
            clauses.push(Clause::GetPort {
                handle: *handle,
                iface: iface.clone(),
            });
        }
        for (handle, iface) in dst_handles.iter().zip(&self.destinations) {
            clauses.push(Clause::GetPort {
                handle: *handle,
                iface: iface.clone(),
            });
        }
        clauses.push(Clause::GetPort {
            handle: Handle::Out,
            iface: self.output.clone(),
        });
        clauses.push(Clause::CreateMirror {
            session: self.session.clone(),
            src_handles,
            dst_handles,
            out_handle: Handle::Out,
        });

        clauses
    }

    /// Serializes the mutation into one `ovs-vsctl` command.
    pub fn into_command(self) -> String {
        let clauses: Vec<String> = self.clauses().iter().map(Clause::serialize).collect();
        format!("{} -- {}", OVS_VSCTL_CMD, clauses.join(" -- "))
    }
}

/// Build the command that drops a bridge's existing mirror binding.
///
/// Issued before each rebuild so two mirrors with the same session name
/// never coexist on the bridge.
pub fn build_clear_mirrors_cmd(bridge: &str) -> String {
    format!(
        "{} clear Bridge {} mirrors",
        OVS_VSCTL_CMD,
        shellquote(bridge)
    )
}

/// Build the bridge lookup command for a datapath id.
///
/// OVSDB stores datapath ids as 16-digit lowercase hex strings, so the id
/// is rendered zero-padded to that width.
pub fn build_find_bridge_cmd(datapath_id: u64) -> String {
    format!(
        "{} -f table --columns=name find Bridge datapath_id={:016x}",
        OVS_VSCTL_CMD, datapath_id
    )
}

/// Build the port-description dump command for a bridge.
pub fn build_dump_ports_cmd(bridge: &str) -> String {
    format!("{} dump-ports-desc {}", OVS_OFCTL_CMD, shellquote(bridge))
}

/// Build the interface listing command for a bridge.
pub fn build_list_ifaces_cmd(bridge: &str) -> String {
    format!("{} list-ifaces {}", OVS_VSCTL_CMD, shellquote(bridge))
}
