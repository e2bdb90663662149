//! Device description parsing and the `DiscoveredDevice` record.
//!
//! Every SSDP reply points at a UPnP device description document. This
//! module fetches that document, decodes it, and turns it into the
//! `DiscoveredDevice` handed to callers.

use crate::error::{DiscoveryError, Result};
use serde::Deserialize;
use url::Url;

/// UPnP device description root element.
#[derive(Debug, Deserialize)]
pub struct Root {
    pub device: DeviceDescription,
}

/// Device description as published by the player.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescription {
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model_name: String,
    pub model_number: Option<String>,
    pub serial_num: Option<String>,
    #[serde(rename = "UDN")]
    pub udn: String,
    pub room_name: Option<String>,
    pub display_name: Option<String>,
    pub service_list: Option<ServiceList>,
    pub device_list: Option<DeviceList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceList {
    #[serde(rename = "service", default)]
    pub services: Vec<ServiceDescription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceList {
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceDescription>,
}

/// One `<service>` entry of a device description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceDescription {
    #[serde(rename = "serviceType")]
    pub service_type: String,
    #[serde(rename = "serviceId", default)]
    pub service_id: String,
    #[serde(rename = "controlURL")]
    pub control_url: String,
    #[serde(rename = "eventSubURL", default)]
    pub event_sub_url: String,
    #[serde(rename = "SCPDURL", default)]
    pub scpd_url: String,
}

impl DeviceDescription {
    /// Parse device description from XML.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::Decode` if the XML is malformed or missing required fields.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root: Root = quick_xml::de::from_str(xml)
            .map_err(|e| DiscoveryError::Decode(format!("Failed to parse device XML: {}", e)))?;

        Ok(root.device)
    }

    /// Check if this device is a Sonos player.
    pub fn is_sonos_device(&self) -> bool {
        self.manufacturer.to_lowercase().contains("sonos")
            || self.device_type.contains("ZonePlayer")
    }

    /// Services of this device and every embedded device, depth first.
    pub fn all_services(&self) -> Vec<ServiceDescription> {
        let mut services: Vec<ServiceDescription> = self
            .service_list
            .as_ref()
            .map(|list| list.services.clone())
            .unwrap_or_default();
        if let Some(list) = &self.device_list {
            for device in &list.devices {
                services.extend(device.all_services());
            }
        }
        services
    }

    /// Convert into the public record for a device found at `location`.
    pub fn into_discovered(self, location: Url) -> Result<DiscoveredDevice> {
        let room_name = self
            .room_name
            .clone()
            .ok_or_else(|| DiscoveryError::Decode(format!("{} has no roomName", self.udn)))?;
        let services = self.all_services();

        Ok(DiscoveredDevice {
            base_url: base_url_of(&location),
            location,
            udn: self.udn,
            room_name,
            model_name: self.model_name,
            services,
        })
    }
}

/// A Sonos player found on the network.
///
/// Built fresh for every qualifying SSDP reply. Nothing is cached, so two
/// replies from one player produce two equal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Unique device name, e.g. "uuid:RINCON_000E58A0123456"
    pub udn: String,
    /// Room the player is assigned to
    pub room_name: String,
    pub model_name: String,
    /// URL of the device description document
    pub location: Url,
    /// Root of every control and event endpoint, e.g. "http://192.168.1.100:1400/"
    pub base_url: Url,
    pub services: Vec<ServiceDescription>,
}

impl DiscoveredDevice {
    /// Minimal record with no service list.
    pub fn new(udn: impl Into<String>, room_name: impl Into<String>, location: Url) -> Self {
        Self {
            udn: udn.into(),
            room_name: room_name.into(),
            model_name: String::new(),
            base_url: base_url_of(&location),
            location,
            services: Vec::new(),
        }
    }

    /// The UDN without its "uuid:" prefix, as used in zone group topology.
    pub fn short_id(&self) -> &str {
        self.udn.strip_prefix("uuid:").unwrap_or(&self.udn)
    }

    /// Look up a service by full type URN or by its name ("ZoneGroupTopology").
    pub fn service(&self, name: &str) -> Option<&ServiceDescription> {
        self.services
            .iter()
            .find(|s| s.service_type == name || s.service_type.split(':').nth(3) == Some(name))
    }

    pub fn control_url(&self, service: &str) -> Option<Url> {
        self.service(service)
            .and_then(|s| self.base_url.join(&s.control_url).ok())
    }

    pub fn event_url(&self, service: &str) -> Option<Url> {
        self.service(service)
            .filter(|s| !s.event_sub_url.is_empty())
            .and_then(|s| self.base_url.join(&s.event_sub_url).ok())
    }
}

/// Fetch and decode the description document at `location`.
pub async fn fetch_description(
    http: &reqwest::Client,
    location: &Url,
) -> Result<DeviceDescription> {
    let response = http
        .get(location.clone())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            DiscoveryError::Transport(format!("Failed to fetch device description: {}", e))
        })?;

    let xml = response
        .text()
        .await
        .map_err(|e| DiscoveryError::Transport(format!("Failed to read response body: {}", e)))?;

    DeviceDescription::from_xml(&xml)
}

fn base_url_of(location: &Url) -> Url {
    let mut base = location.clone();
    base.set_path("/");
    base.set_query(None);
    base.set_fragment(None);
    base
}
