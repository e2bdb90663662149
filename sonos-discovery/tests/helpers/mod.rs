//! Shared fixtures for the discovery integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use sonos_discovery::{DeviceResolver, DiscoveredDevice, DiscoveryConfig, DiscoveryError, Result};
use tokio::net::UdpSocket;
use url::Url;

/// A player as seen from the test: identity plus where it is described.
#[derive(Debug, Clone)]
pub struct PlayerFixture {
    pub udn: String,
    pub room_name: String,
    pub location: String,
}

impl PlayerFixture {
    pub fn new(id: &str, room_name: &str) -> Self {
        Self {
            udn: format!("uuid:{}", id),
            room_name: room_name.to_string(),
            location: format!("http://192.168.1.{}:1400/xml/device_description.xml", host_octet(id)),
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn short_id(&self) -> &str {
        self.udn.trim_start_matches("uuid:")
    }

    pub fn device(&self) -> DiscoveredDevice {
        DiscoveredDevice::new(self.udn.clone(), self.room_name.clone(), self.location_url())
    }

    pub fn location_url(&self) -> Url {
        Url::parse(&self.location).unwrap()
    }

    /// SSDP search reply advertising this player
    pub fn ssdp_response(&self) -> String {
        ssdp_response(&self.location, self.short_id())
    }

    /// UPnP device description document for this player
    pub fn description_xml(&self) -> String {
        description_xml(&self.udn, &self.room_name)
    }
}

fn host_octet(id: &str) -> u8 {
    id.bytes().fold(0u8, |acc, b| acc.wrapping_add(b)) % 200 + 10
}

pub fn ssdp_response(location: &str, usn_id: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         CACHE-CONTROL: max-age = 1800\r\n\
         EXT:\r\n\
         LOCATION: {}\r\n\
         SERVER: Linux UPnP/1.0 Sonos/70.3-88200 (ZPS9)\r\n\
         ST: urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
         USN: uuid:{}::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
         X-RINCON-BOOTSEQ: 123\r\n\
         X-RINCON-HOUSEHOLD: Sonos_test\r\n\r\n",
        location, usn_id
    )
}

pub fn description_xml(udn: &str, room_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:ZonePlayer:1</deviceType>
    <friendlyName>{room} - Sonos One</friendlyName>
    <manufacturer>Sonos, Inc.</manufacturer>
    <modelNumber>S18</modelNumber>
    <modelName>Sonos One</modelName>
    <UDN>{udn}</UDN>
    <roomName>{room}</roomName>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:ZoneGroupTopology:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:ZoneGroupTopology</serviceId>
        <controlURL>/ZoneGroupTopology/Control</controlURL>
        <eventSubURL>/ZoneGroupTopology/Event</eventSubURL>
        <SCPDURL>/xml/ZoneGroupTopology1.xml</SCPDURL>
      </service>
    </serviceList>
  </device>
</root>"#,
        udn = udn,
        room = room_name
    )
}

/// Inner topology document with one group per `(coordinator, members)` entry.
pub fn zone_group_state_xml(groups: &[(&str, &[&str])]) -> String {
    let groups: String = groups
        .iter()
        .enumerate()
        .map(|(i, (coordinator, members))| {
            let members: String = members
                .iter()
                .map(|id| {
                    format!(
                        r#"<ZoneGroupMember UUID="{id}" Location="http://192.168.1.50:1400/xml/device_description.xml" ZoneName="{id}"/>"#,
                        id = id
                    )
                })
                .collect();
            format!(
                r#"<ZoneGroup Coordinator="{}" ID="{}:{}">{}</ZoneGroup>"#,
                coordinator, coordinator, i, members
            )
        })
        .collect();
    format!(
        "<ZoneGroupState><ZoneGroups>{}</ZoneGroups><VanishedDevices></VanishedDevices></ZoneGroupState>",
        groups
    )
}

/// `GetZoneGroupStateResponse` envelope carrying `state` as an escaped argument.
pub fn zone_group_state_envelope(state: &str) -> String {
    let escaped = state
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    format!(
        r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:GetZoneGroupStateResponse xmlns:u="urn:schemas-upnp-org:service:ZoneGroupTopology:1"><ZoneGroupState>{}</ZoneGroupState></u:GetZoneGroupStateResponse></s:Body></s:Envelope>"#,
        escaped
    )
}

/// In-memory resolver: known locations describe to fixed devices, and
/// only listed UDNs are coordinators.
#[derive(Default)]
pub struct FakeResolver {
    devices: HashMap<String, DiscoveredDevice>,
    coordinators: HashSet<String>,
    delay: Option<Duration>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coordinator(mut self, player: &PlayerFixture) -> Self {
        self.coordinators.insert(player.udn.clone());
        self.member(player)
    }

    pub fn member(mut self, player: &PlayerFixture) -> Self {
        self.devices.insert(player.location.clone(), player.device());
        self
    }

    /// Sleep this long in every `describe`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl DeviceResolver for FakeResolver {
    async fn describe(&self, location: &Url) -> Result<DiscoveredDevice> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.devices
            .get(location.as_str())
            .cloned()
            .ok_or_else(|| DiscoveryError::Transport(format!("no device at {}", location)))
    }

    async fn is_coordinator(&self, device: &DiscoveredDevice) -> Result<bool> {
        Ok(self.coordinators.contains(&device.udn))
    }
}

/// Loopback socket standing in for the SSDP multicast group.
///
/// Sessions configured with [`FakeGroup::config`] send their M-SEARCH
/// here, and the test answers from this socket the way players would.
pub struct FakeGroup {
    socket: UdpSocket,
}

impl FakeGroup {
    pub async fn bind() -> Self {
        Self {
            socket: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    pub fn config(&self) -> DiscoveryConfig {
        DiscoveryConfig::default().with_multicast_addr(self.addr())
    }

    /// Wait for the next M-SEARCH; returns its text and where to reply.
    pub async fn accept_search(&self) -> (String, SocketAddr) {
        let mut buf = [0u8; 2048];
        let (len, from) = tokio::time::timeout(Duration::from_secs(2), self.socket.recv_from(&mut buf))
            .await
            .expect("no M-SEARCH received")
            .unwrap();
        let request = String::from_utf8(buf[..len].to_vec()).unwrap();
        // The session binds 0.0.0.0; answer on loopback
        let to = SocketAddr::from(([127, 0, 0, 1], from.port()));
        (request, to)
    }

    pub async fn reply(&self, to: SocketAddr, datagram: impl AsRef<[u8]>) {
        self.socket.send_to(datagram.as_ref(), to).await.unwrap();
    }
}

/// Receive with a deadline so a broken reader fails the test instead of hanging it.
pub async fn recv_within(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<DiscoveredDevice>,
    within: Duration,
) -> Option<DiscoveredDevice> {
    tokio::time::timeout(within, rx.recv()).await.ok().flatten()
}
