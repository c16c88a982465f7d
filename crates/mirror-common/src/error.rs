//! Error types for mirror operations.
//!
//! All errors implement `std::error::Error` via `thiserror`.

use std::io;
use thiserror::Error;

/// Result type alias for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Errors that can occur while managing mirror sessions.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// An entity expected in a query result was absent (unknown datapath id,
    /// unknown port number, malformed table output).
    #[error("Not found: {entity} (query: {query})")]
    NotFound {
        /// What was being looked up (e.g. "bridge", "interface").
        entity: String,
        /// The query or key that produced no usable result.
        query: String,
    },

    /// A management-channel command failed: non-zero exit status, transport
    /// failure, or timeout.
    #[error("Channel command failed: '{command}': {message}")]
    Channel {
        /// The command that failed.
        command: String,
        /// Exit status and captured output, or the transport failure.
        message: String,
    },

    /// The channel process could not be spawned at all.
    #[error("Failed to spawn channel command '{command}': {source}")]
    ChannelSpawn {
        /// The command that could not be started.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Configuration invariant violation. Fatal at startup.
    #[error("Invalid configuration for {field}: {message}")]
    Config {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },
}

impl MirrorError {
    /// Creates a not-found error.
    pub fn not_found(entity: impl Into<String>, query: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            query: query.into(),
        }
    }

    /// Creates a channel error.
    pub fn channel(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error means "the entity does not exist" rather
    /// than "the lookup could not be performed". The event dispatcher drops
    /// events on not-found and escalates everything else.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MirrorError::NotFound { .. })
    }

    /// Returns true for transport-level failures that may succeed once the
    /// channel recovers.
    pub fn is_channel(&self) -> bool {
        matches!(
            self,
            MirrorError::Channel { .. } | MirrorError::ChannelSpawn { .. }
        )
    }
}
