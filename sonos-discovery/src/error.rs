//! Error types for the discovery system.

use soap_client::SoapError;
use std::time::Duration;
use thiserror::Error;

/// Error type for discovery operations.
///
/// Only `Socket` and `Timeout` ever reach a caller in normal operation.
/// `Transport`, `Decode` and `InvalidDevice` describe why a single SSDP
/// candidate was dropped; the discovery loop logs and skips them.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Binding or sending on the UDP socket failed
    #[error("socket error ({context}): {source}")]
    Socket {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// An HTTP request (device description or SOAP control action) failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed SSDP framing, URL or XML
    #[error("decode error: {0}")]
    Decode(String),

    /// The device description decoded but does not describe a Sonos player
    #[error("invalid device: {0}")]
    InvalidDevice(String),

    /// No device with the requested room name appeared before the deadline
    #[error("no room named {room:?} found within {timeout:?}")]
    Timeout { room: String, timeout: Duration },
}

impl DiscoveryError {
    pub(crate) fn socket(context: &'static str, source: std::io::Error) -> Self {
        Self::Socket { context, source }
    }
}

impl From<SoapError> for DiscoveryError {
    fn from(error: SoapError) -> Self {
        DiscoveryError::Transport(error.to_string())
    }
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
