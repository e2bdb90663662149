//! Discovery configuration.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

/// SSDP multicast group and port.
pub const SSDP_MULTICAST_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900));

/// Search target that only Sonos players answer.
pub const ZONE_PLAYER_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// Settings for a discovery session.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Destination of the M-SEARCH datagram. The `HOST` header always names
    /// the standard group, even when this points elsewhere.
    /// Default: 239.255.255.250:1900
    pub multicast_addr: SocketAddr,

    /// `ST` header of the search
    /// Default: urn:schemas-upnp-org:device:ZonePlayer:1
    pub search_target: String,

    /// `MX` header. Devices spread their replies over this many seconds;
    /// it does not bound how long the session listens.
    /// Default: 5
    pub mx: u8,

    /// Multicast TTL for the search datagram
    /// Default: 4
    pub multicast_ttl: u32,

    /// Timeout for device description and SOAP requests
    /// Default: 5 seconds
    pub http_timeout: Duration,

    /// Publish each UDN at most once per session.
    /// Default: false (every qualifying reply is published)
    pub dedupe_by_udn: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            multicast_addr: SSDP_MULTICAST_ADDR,
            search_target: ZONE_PLAYER_SEARCH_TARGET.to_string(),
            mx: 5,
            multicast_ttl: 4,
            http_timeout: Duration::from_secs(5),
            dedupe_by_udn: false,
        }
    }
}

impl DiscoveryConfig {
    /// Create a DiscoveryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for one-shot household scans: unique coordinators only
    pub fn household_scan() -> Self {
        Self {
            dedupe_by_udn: true,
            ..Default::default()
        }
    }

    pub fn with_multicast_addr(mut self, addr: SocketAddr) -> Self {
        self.multicast_addr = addr;
        self
    }

    pub fn with_search_target(mut self, search_target: impl Into<String>) -> Self {
        self.search_target = search_target.into();
        self
    }

    pub fn with_mx(mut self, mx: u8) -> Self {
        self.mx = mx;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_dedupe_by_udn(mut self, dedupe: bool) -> Self {
        self.dedupe_by_udn = dedupe;
        self
    }
}
