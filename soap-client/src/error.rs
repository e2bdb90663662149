//! Error types for the SOAP client

use thiserror::Error;

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Connection, DNS or I/O failure before a response was read
    #[error("Network error: {0}")]
    Network(String),

    /// The device answered with a non-2xx status that carried no SOAP fault
    #[error("HTTP status {0}")]
    Http(u16),

    /// XML parsing error, or a response missing the expected elements
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// SOAP fault returned by the device, carrying the UPnP error code
    #[error("SOAP fault: error code {0}")]
    Fault(u16),
}
