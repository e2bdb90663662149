//! Minimal SOAP client for UPnP control endpoints
//!
//! Sonos players expose every UPnP service as an HTTP control URL that
//! accepts a SOAP envelope naming one action. This crate builds that
//! envelope from an action name and a list of string arguments, posts it,
//! and hands back the `<{Action}Response>` element for the caller to read.
//! It knows nothing about individual services.

mod error;

pub use error::SoapError;

use std::time::Duration;
use xmltree::Element;

/// A minimal SOAP client for UPnP device communication
#[derive(Debug, Clone)]
pub struct SoapClient {
    agent: ureq::Agent,
}

impl SoapClient {
    /// Create a new SOAP client with default timeouts (5s connect, 10s read)
    pub fn new() -> Self {
        Self::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
    }

    /// Create a SOAP client with explicit connect and read timeouts
    pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(connect)
                .timeout_read(read)
                .build(),
        }
    }

    /// Invoke `action` on the service at `control_url` and return the
    /// `<{action}Response>` element.
    ///
    /// # Arguments
    /// * `control_url` - Absolute control URL, e.g. `http://192.168.1.20:1400/ZoneGroupTopology/Control`
    /// * `service_uri` - Service type, e.g. `urn:schemas-upnp-org:service:ZoneGroupTopology:1`
    /// * `action` - Action name, e.g. `GetZoneGroupState`
    /// * `args` - Action arguments in declaration order; values are XML-escaped
    pub fn call(
        &self,
        control_url: &str,
        service_uri: &str,
        action: &str,
        args: &[(&str, &str)],
    ) -> Result<Element, SoapError> {
        let body = build_envelope(service_uri, action, args);
        let soap_action = format!("\"{}#{}\"", service_uri, action);

        let result = self
            .agent
            .post(control_url)
            .set("Content-Type", "text/xml; charset=\"utf-8\"")
            .set("SOAPACTION", &soap_action)
            .send_string(&body);

        let xml_text = match result {
            Ok(response) => response
                .into_string()
                .map_err(|e| SoapError::Network(e.to_string()))?,
            Err(ureq::Error::Status(status, response)) => {
                // UPnP reports action failures as HTTP 500 with a fault body
                let text = response.into_string().unwrap_or_default();
                return Err(match Element::parse(text.as_bytes()) {
                    Ok(xml) => match self.extract_response(&xml, action) {
                        Err(fault @ SoapError::Fault(_)) => fault,
                        _ => SoapError::Http(status),
                    },
                    Err(_) => SoapError::Http(status),
                });
            }
            Err(e) => return Err(SoapError::Network(e.to_string())),
        };

        let xml = Element::parse(xml_text.as_bytes())
            .map_err(|e| SoapError::Parse(e.to_string()))?;

        self.extract_response(&xml, action)
    }

    fn extract_response(&self, xml: &Element, action: &str) -> Result<Element, SoapError> {
        let body = xml
            .get_child("Body")
            .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

        if let Some(fault) = body.get_child("Fault") {
            let error_code = fault
                .get_child("detail")
                .and_then(|d| d.get_child("UPnPError"))
                .and_then(|e| e.get_child("errorCode"))
                .and_then(|c| c.get_text())
                .and_then(|t| t.trim().parse::<u16>().ok())
                .unwrap_or(500);
            return Err(SoapError::Fault(error_code));
        }

        let response_name = format!("{}Response", action);
        body.get_child(response_name.as_str())
            .cloned()
            .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the text of a named output argument from an action response.
///
/// Entities are already unescaped, so an argument carrying embedded XML
/// comes back as the raw inner document.
pub fn response_field(response: &Element, name: &str) -> Option<String> {
    response
        .get_child(name)
        .map(|child| child.get_text().map(|t| t.into_owned()).unwrap_or_default())
}

fn build_envelope(service_uri: &str, action: &str, args: &[(&str, &str)]) -> String {
    let payload: String = args
        .iter()
        .map(|(name, value)| format!("<{name}>{}</{name}>", escape_xml(value)))
        .collect();

    format!(
        r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action} xmlns:u="{service_uri}">{payload}</u:{action}></s:Body></s:Envelope>"#
    )
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
