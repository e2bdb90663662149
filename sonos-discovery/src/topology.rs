//! Zone group topology: fetching, two-stage decoding and the coordinator check.
//!
//! `GetZoneGroupState` answers with a SOAP response whose `ZoneGroupState`
//! argument is itself an escaped XML document. Decoding happens in two
//! passes: the SOAP client yields the action response element, from which
//! [`zone_group_state_field`] lifts the inner document as a string; then
//! [`ZoneGroupState::from_xml`] decodes that string on its own.

use crate::error::{DiscoveryError, Result};
use quick_xml::events::Event;
use serde::Deserialize;
use soap_client::{response_field, SoapClient};
use xmltree::Element;

pub const ZONE_GROUP_TOPOLOGY_SERVICE: &str = "urn:schemas-upnp-org:service:ZoneGroupTopology:1";

/// Control path used when a device description does not list the service.
pub const ZONE_GROUP_TOPOLOGY_CONTROL_PATH: &str = "/ZoneGroupTopology/Control";

const GET_ZONE_GROUP_STATE: &str = "GetZoneGroupState";

/// Snapshot of every zone group in the household.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneGroupState {
    /// Groups in the order the device reported them
    pub groups: Vec<ZoneGroup>,
    pub vanished_devices: Vec<VanishedDevice>,
}

/// A set of players playing in sync.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ZoneGroup {
    /// Short id of the coordinating player (UDN without "uuid:")
    #[serde(rename = "@Coordinator")]
    pub coordinator: String,

    #[serde(rename = "@ID")]
    pub id: String,

    #[serde(rename = "ZoneGroupMember", default)]
    pub members: Vec<ZoneGroupMember>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ZoneGroupMember {
    #[serde(rename = "@UUID")]
    pub uuid: String,

    #[serde(rename = "@Location", default)]
    pub location: String,

    #[serde(rename = "@ZoneName", default)]
    pub zone_name: String,

    #[serde(rename = "@Icon", default)]
    pub icon: Option<String>,

    #[serde(rename = "@SoftwareVersion", default)]
    pub software_version: Option<String>,

    #[serde(rename = "@Invisible", default)]
    pub invisible: Option<String>,

    #[serde(rename = "@IsZoneBridge", default)]
    pub is_zone_bridge: Option<String>,

    /// Home theater channel map, present on soundbars with satellites
    #[serde(rename = "@HTSatChanMapSet", default)]
    pub ht_sat_chan_map_set: Option<String>,

    #[serde(rename = "@WirelessMode", default)]
    pub wireless_mode: Option<String>,

    #[serde(rename = "@ChannelFreq", default)]
    pub channel_freq: Option<String>,

    #[serde(rename = "Satellite", default)]
    pub satellites: Vec<Satellite>,
}

/// Surround or sub speaker bonded to a home theater member.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Satellite {
    #[serde(rename = "@UUID")]
    pub uuid: String,

    #[serde(rename = "@Location", default)]
    pub location: String,

    #[serde(rename = "@ZoneName", default)]
    pub zone_name: String,

    #[serde(rename = "@HTSatChanMapSet", default)]
    pub ht_sat_chan_map_set: Option<String>,

    #[serde(rename = "@Invisible", default)]
    pub invisible: Option<String>,
}

/// A player the household has lost track of.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VanishedDevice {
    #[serde(rename = "@UUID")]
    pub uuid: String,

    #[serde(rename = "@ZoneName", default)]
    pub zone_name: String,

    #[serde(rename = "@Reason", default)]
    pub reason: String,
}

#[derive(Deserialize)]
struct StateDocument {
    #[serde(rename = "ZoneGroups", default)]
    zone_groups: GroupsDocument,

    #[serde(rename = "VanishedDevices", default)]
    vanished_devices: VanishedDocument,
}

#[derive(Default, Deserialize)]
struct GroupsDocument {
    #[serde(rename = "ZoneGroup", default)]
    groups: Vec<ZoneGroup>,
}

#[derive(Default, Deserialize)]
struct VanishedDocument {
    #[serde(rename = "Device", default)]
    devices: Vec<VanishedDevice>,
}

impl ZoneGroupState {
    /// Decode the inner topology document.
    ///
    /// Accepts both the `<ZoneGroupState>` root sent by current firmware and
    /// the bare `<ZoneGroups>` root sent by older players.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let decode_err = |e: quick_xml::de::DeError| {
            DiscoveryError::Decode(format!("Failed to parse zone group state: {}", e))
        };

        match root_element_name(xml)?.as_str() {
            "ZoneGroupState" => {
                let doc: StateDocument = quick_xml::de::from_str(xml).map_err(decode_err)?;
                Ok(Self {
                    groups: doc.zone_groups.groups,
                    vanished_devices: doc.vanished_devices.devices,
                })
            }
            "ZoneGroups" => {
                let doc: GroupsDocument = quick_xml::de::from_str(xml).map_err(decode_err)?;
                Ok(Self {
                    groups: doc.groups,
                    vanished_devices: Vec::new(),
                })
            }
            other => Err(DiscoveryError::Decode(format!(
                "unexpected zone group state root <{}>",
                other
            ))),
        }
    }

    /// True if some group's coordinator, prefixed with "uuid:", equals `udn`.
    ///
    /// Groups are checked in order and the first match wins; a topology
    /// where two groups claim the same coordinator is not an error.
    pub fn is_coordinator(&self, udn: &str) -> bool {
        let Some(short_id) = udn.strip_prefix("uuid:") else {
            return false;
        };
        self.groups.iter().any(|group| group.coordinator == short_id)
    }

    /// The group containing `uuid` as a member. Accepts ids with or without "uuid:".
    pub fn group_for_member(&self, uuid: &str) -> Option<&ZoneGroup> {
        let short_id = uuid.strip_prefix("uuid:").unwrap_or(uuid);
        self.groups
            .iter()
            .find(|group| group.members.iter().any(|m| m.uuid == short_id))
    }
}

impl ZoneGroup {
    /// Coordinator in UDN form ("uuid:RINCON_...").
    pub fn coordinator_udn(&self) -> String {
        format!("uuid:{}", self.coordinator)
    }

    pub fn coordinator_member(&self) -> Option<&ZoneGroupMember> {
        self.members.iter().find(|m| m.uuid == self.coordinator)
    }
}

/// First decoding pass: the escaped topology document out of the action response.
pub fn zone_group_state_field(response: &Element) -> Result<String> {
    response_field(response, "ZoneGroupState").ok_or_else(|| {
        DiscoveryError::Decode(format!("{} has no ZoneGroupState argument", response.name))
    })
}

/// Issue `GetZoneGroupState` against `control_url` and decode the result.
///
/// Blocking; call from a blocking context.
pub fn fetch_zone_group_state(soap: &SoapClient, control_url: &str) -> Result<ZoneGroupState> {
    let response = soap.call(control_url, ZONE_GROUP_TOPOLOGY_SERVICE, GET_ZONE_GROUP_STATE, &[])?;
    let inner = zone_group_state_field(&response)?;
    ZoneGroupState::from_xml(&inner)
}

fn root_element_name(xml: &str) -> Result<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => {
                return Err(DiscoveryError::Decode("empty zone group state".to_string()));
            }
            Ok(_) => continue,
            Err(e) => {
                return Err(DiscoveryError::Decode(format!(
                    "Failed to read zone group state: {}",
                    e
                )));
            }
        }
    }
}
