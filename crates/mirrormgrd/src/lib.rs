//! # mirrormgrd - OVS Port-Mirror Reconciliation Daemon
//!
//! Keeps the mirror (SPAN) session of each managed Open vSwitch bridge
//! consistent with the bridge's live interface set, reacting to port-state
//! notifications from an OpenFlow control channel.
//!
//! ## Responsibilities
//! - Full mirror rebuild for every configured bridge at startup
//! - Event-triggered rebuild when a port is added to a managed bridge
//! - Role classification of interfaces (source / destination / excluded /
//!   output) from the configured policy
//! - Atomic replacement of a bridge's mirror binding via one `ovs-vsctl`
//!   request
//!
//! ## Components
//! - [`config`]: the mirror policy, loaded once from TOML and immutable
//! - [`topology`]: datapath/port/interface lookups over the management channel
//! - [`classifier`]: pure interface-to-role classification
//! - [`commands`]: typed-clause builder for the mirror mutation grammar
//! - [`mirror_mgr`]: the reconciler (clear, list, classify, build, submit)
//! - [`dispatcher`]: the event loop feeding the reconciler

pub mod classifier;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod mirror_mgr;
pub mod topology;
pub mod types;

#[cfg(test)]
mod testutil;

pub use classifier::classify;
pub use commands::{build_clear_mirrors_cmd, Clause, Handle, MirrorMutation};
pub use config::{ChannelConfig, MirrorConfig};
pub use dispatcher::EventDispatcher;
pub use mirror_mgr::MirrorMgr;
pub use topology::TopologyClient;
pub use types::{Classification, DefaultRole, PortReason, PortStateEvent};
