//! Common infrastructure for the OVS mirror manager.
//!
//! This crate provides the pieces shared by the mirror daemons:
//!
//! - [`channel`]: management-channel abstraction — execution of `ovs-vsctl` /
//!   `ovs-ofctl` commands with proper quoting, a bounded per-command timeout,
//!   and serialized access to one channel instance
//! - [`error`]: the error taxonomy for mirror operations
//!
//! # Architecture
//!
//! All mutations of the switch database go through a single
//! [`ManagementChannel`]. The channel accepts an opaque command string and
//! returns its standard output; a non-zero exit status or a timeout surfaces
//! as [`MirrorError::Channel`]. The production implementation
//! ([`ShellChannel`]) funnels every command through a mutex so that
//! concurrent reconciliations never interleave round trips on the same
//! connection.

pub mod channel;
pub mod error;

// Re-export commonly used items at crate root
pub use channel::{shellquote, ExecResult, ManagementChannel, ShellChannel};
pub use error::{MirrorError, MirrorResult};
