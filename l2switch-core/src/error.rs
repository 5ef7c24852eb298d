//! Error types for l2switch

use thiserror::Error;

/// Result type alias for switch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for l2switch
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing switch configuration. Fatal at startup.
    #[error("Configuration error (line {line}): {reason}")]
    Config { line: usize, reason: String },

    /// Frame shorter than the header it claims to carry
    #[error("Frame too short: {actual} bytes, need {needed}")]
    FrameTooShort { needed: usize, actual: usize },

    /// VLAN tag missing, unexpected or unreadable
    #[error("Malformed VLAN tag: {0}")]
    MalformedTag(String),

    /// Link-layer receive/transmit failure
    #[error("Link error on port {port}: {reason}")]
    Link { port: usize, reason: String },

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Port index outside the configured port range
    #[error("Port {0} out of range")]
    PortOutOfRange(usize),

    /// Protocol-specific error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Background task failed or panicked
    #[error("Task failed: {0}")]
    Task(String),
}

impl Error {
    /// Create a configuration error for a given (1-based) line
    pub fn config<S: Into<String>>(line: usize, reason: S) -> Self {
        Error::Config {
            line,
            reason: reason.into(),
        }
    }

    /// Create a protocol error with a custom message
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a link error for a port
    pub fn link<S: Into<String>>(port: usize, reason: S) -> Self {
        Error::Link {
            port,
            reason: reason.into(),
        }
    }

    /// Create a frame-too-short error
    pub fn too_short(needed: usize, actual: usize) -> Self {
        Error::FrameTooShort { needed, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::config(3, "bad VLAN id 'x'");
        assert_eq!(
            err.to_string(),
            "Configuration error (line 3): bad VLAN id 'x'"
        );
    }

    #[test]
    fn test_link_error_display() {
        let err = Error::link(2, "link down");
        assert_eq!(err.to_string(), "Link error on port 2: link down");
        assert_eq!(
            Error::too_short(18, 3).to_string(),
            "Frame too short: 3 bytes, need 18"
        );
    }
}
