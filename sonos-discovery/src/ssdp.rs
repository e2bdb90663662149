//! SSDP wire format: the M-SEARCH request and HTTP-over-UDP replies.
//!
//! Replies arrive as unicast datagrams shaped like HTTP/1.1 responses.
//! Anything that does not frame as one is foreign traffic and decodes to
//! an error the discovery loop skips.

use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use url::Url;

/// Build the M-SEARCH datagram for `config`.
pub(crate) fn build_msearch(config: &DiscoveryConfig) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         \r\n",
        config.mx, config.search_target
    )
}

/// One decoded SSDP search reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SsdpResponse {
    pub status: u16,
    headers: Vec<(String, String)>,
}

impl SsdpResponse {
    /// Decode a datagram as an HTTP/1.x response.
    pub fn parse(datagram: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(datagram)
            .map_err(|_| DiscoveryError::Decode("datagram is not UTF-8".to_string()))?;

        let mut lines = text.split("\r\n").flat_map(|l| l.split('\n'));
        let status_line = lines
            .next()
            .ok_or_else(|| DiscoveryError::Decode("empty datagram".to_string()))?;
        let status = parse_status_line(status_line)?;

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                DiscoveryError::Decode(format!("malformed header line: {:?}", line))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(DiscoveryError::Decode(format!("malformed header line: {:?}", line)));
            }
            headers.push((name.to_string(), value.trim().to_string()));
        }

        if status != 200 {
            return Err(DiscoveryError::Decode(format!("unexpected status {}", status)));
        }

        Ok(Self { status, headers })
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The device description URL advertised in `LOCATION`.
    pub fn location(&self) -> Result<Url> {
        let raw = self
            .header("LOCATION")
            .ok_or_else(|| DiscoveryError::Decode("missing LOCATION header".to_string()))?;
        Url::parse(raw)
            .map_err(|e| DiscoveryError::Decode(format!("bad LOCATION {:?}: {}", raw, e)))
    }

    pub fn search_target(&self) -> Option<&str> {
        self.header("ST")
    }

    pub fn usn(&self) -> Option<&str> {
        self.header("USN")
    }

    pub fn server(&self) -> Option<&str> {
        self.header("SERVER")
    }
}

fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(DiscoveryError::Decode(format!("not an HTTP response: {:?}", line)));
    }
    parts
        .next()
        .filter(|code| code.len() == 3)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| DiscoveryError::Decode(format!("bad status line: {:?}", line)))
}
