//! Error types for the interface manager.
//!
//! Nothing here is fatal to the process: the worst outcome is an interface
//! parked in an error state awaiting operator intervention. Lookup misses on
//! the query surface are `None`, not errors; only commands addressed to a
//! nonexistent index fail with [`IfaceMgrError::OutOfRange`].

use chassis_hal::{LinkFault, RailFault};
use thiserror::Error;

/// Result type for interface manager operations.
pub type IfaceMgrResult<T> = Result<T, IfaceMgrError>;

/// Errors that can occur during interface manager operations.
#[derive(Debug, Error)]
pub enum IfaceMgrError {
    /// A regulator failed to respond to an enable request.
    #[error("rail '{rail}' fault: {source}")]
    Rail {
        /// Name of the failing rail.
        rail: String,
        /// The underlying driver fault.
        #[source]
        source: RailFault,
    },

    /// The link layer refused a bring-up request.
    #[error("link-up request failed: {0}")]
    Link(#[from] LinkFault),

    /// Board configuration validation error.
    #[error("invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// A command addressed an index outside the interface table.
    #[error("interface index {index} out of range ({count} interfaces)")]
    OutOfRange {
        /// The requested index.
        index: usize,
        /// Number of interfaces in the table.
        count: usize,
    },

    /// The interface does not support the requested operation.
    #[error("interface '{name}' does not support {operation}")]
    Unsupported {
        /// Interface name.
        name: String,
        /// The unsupported operation.
        operation: String,
    },

    /// Failed to read the board configuration file.
    #[error("failed to read board config: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the board configuration file.
    #[error("failed to parse board config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl IfaceMgrError {
    /// Creates a rail fault error.
    pub fn rail(rail: impl Into<String>, source: RailFault) -> Self {
        Self::Rail {
            rail: rail.into(),
            source,
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(index: usize, count: usize) -> Self {
        Self::OutOfRange { index, count }
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            name: name.into(),
            operation: operation.into(),
        }
    }
}
