//! Error types for mcprobe
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! The variants mirror the failure taxonomy of the protocol core:
//!
//! - [`McprobeError::Config`] -- malformed or incomplete transport
//!   configuration; raised before any connection attempt and never logged.
//! - [`McprobeError::NotConnected`] -- a capability operation was invoked
//!   while the session was disconnected; caller misuse, never logged.
//! - [`McprobeError::Transport`] -- connection setup or I/O failure on the
//!   underlying channel.
//! - [`McprobeError::Protocol`] -- the server returned an error for a
//!   specific operation; logged as a `response` entry before propagation.
//! - [`McprobeError::Unsupported`] -- the connected server does not
//!   implement an optional capability.
//! - [`McprobeError::Timeout`] -- no response arrived within the request
//!   deadline.

use thiserror::Error;

/// Main error type for mcprobe operations
#[derive(Error, Debug)]
pub enum McprobeError {
    /// Malformed or incomplete transport configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Capability operation invoked while the session is disconnected
    #[error("Not connected: call the operation inside a connected session")]
    NotConnected,

    /// Connection setup or I/O failure on the underlying channel
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server returned an error for a specific operation
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation not implemented by the connected server
    #[error("Unsupported capability: {0}")]
    Unsupported(String),

    /// No response arrived within the request deadline
    #[error("Request timeout: method={method}")]
    Timeout {
        /// The method that timed out
        method: String,
    },

    /// The server negotiated a protocol version this client does not accept
    #[error("Unsupported protocol version: expected one of {expected:?}, got {got}")]
    ProtocolVersion {
        /// Versions this client accepts
        expected: Vec<String>,
        /// Version the server selected
        got: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for mcprobe operations
///
/// Uses `anyhow::Error` as the error type so that callers get rich context
/// while typed variants remain recoverable via `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = McprobeError::Config("no transport selected".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: no transport selected"
        );
    }

    #[test]
    fn test_not_connected_error_display() {
        let error = McprobeError::NotConnected;
        assert!(error.to_string().contains("Not connected"));
    }

    #[test]
    fn test_transport_error_display() {
        let error = McprobeError::Transport("child exited".to_string());
        assert_eq!(error.to_string(), "Transport error: child exited");
    }

    #[test]
    fn test_protocol_error_display() {
        let error = McprobeError::Protocol("Method not found".to_string());
        assert_eq!(error.to_string(), "Protocol error: Method not found");
    }

    #[test]
    fn test_unsupported_error_display() {
        let error = McprobeError::Unsupported("sampling".to_string());
        assert_eq!(error.to_string(), "Unsupported capability: sampling");
    }

    #[test]
    fn test_timeout_error_display() {
        let error = McprobeError::Timeout {
            method: "tools/call".to_string(),
        };
        assert!(error.to_string().contains("tools/call"));
    }

    #[test]
    fn test_protocol_version_error_display() {
        let error = McprobeError::ProtocolVersion {
            expected: vec!["2025-03-26".to_string()],
            got: "1999-01-01".to_string(),
        };
        let s = error.to_string();
        assert!(s.contains("1999-01-01"));
        assert!(s.contains("2025-03-26"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: McprobeError = io_error.into();
        assert!(matches!(error, McprobeError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{bad json}").unwrap_err();
        let error: McprobeError = json_error.into();
        assert!(matches!(error, McprobeError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<McprobeError>();
    }

    #[test]
    fn test_downcast_from_anyhow() {
        let err: anyhow::Error = McprobeError::NotConnected.into();
        assert!(matches!(
            err.downcast_ref::<McprobeError>(),
            Some(McprobeError::NotConnected)
        ));
    }
}
