//! Turning an SSDP `LOCATION` into a coordinator candidate.
//!
//! The discovery loop only knows the [`DeviceResolver`] trait. The default
//! [`HttpResolver`] talks to real players; tests swap in their own.

use async_trait::async_trait;
use soap_client::SoapClient;
use std::time::Duration;
use url::Url;

use crate::config::DiscoveryConfig;
use crate::device::{fetch_description, DiscoveredDevice};
use crate::error::{DiscoveryError, Result};
use crate::topology::{
    fetch_zone_group_state, ZONE_GROUP_TOPOLOGY_CONTROL_PATH, ZONE_GROUP_TOPOLOGY_SERVICE,
};

/// Network collaborators of the discovery loop.
#[async_trait]
pub trait DeviceResolver: Send + Sync {
    /// Fetch and decode the device description at `location`.
    async fn describe(&self, location: &Url) -> Result<DiscoveredDevice>;

    /// Decide whether `device` coordinates its zone group.
    async fn is_coordinator(&self, device: &DiscoveredDevice) -> Result<bool>;
}

/// Resolver backed by HTTP: `reqwest` for descriptions, SOAP for topology.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    http: reqwest::Client,
    soap: SoapClient,
}

impl HttpResolver {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        Self::with_timeout(config.http_timeout)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DiscoveryError::Transport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            soap: SoapClient::with_timeouts(timeout, timeout),
        })
    }
}

#[async_trait]
impl DeviceResolver for HttpResolver {
    async fn describe(&self, location: &Url) -> Result<DiscoveredDevice> {
        let description = fetch_description(&self.http, location).await?;
        if !description.is_sonos_device() {
            return Err(DiscoveryError::InvalidDevice(format!(
                "{} ({}) is not a Sonos player",
                description.udn, description.manufacturer
            )));
        }
        description.into_discovered(location.clone())
    }

    async fn is_coordinator(&self, device: &DiscoveredDevice) -> Result<bool> {
        let control_url = zone_group_control_url(device)?;
        let soap = self.soap.clone();

        // SoapClient blocks; keep it off the reactor
        let state = tokio::task::spawn_blocking(move || {
            fetch_zone_group_state(&soap, control_url.as_str())
        })
        .await
        .map_err(|e| DiscoveryError::Transport(format!("zone group state task failed: {}", e)))??;

        Ok(state.is_coordinator(&device.udn))
    }
}

fn zone_group_control_url(device: &DiscoveredDevice) -> Result<Url> {
    if let Some(url) = device.control_url(ZONE_GROUP_TOPOLOGY_SERVICE) {
        return Ok(url);
    }
    device
        .base_url
        .join(ZONE_GROUP_TOPOLOGY_CONTROL_PATH)
        .map_err(|e| DiscoveryError::Decode(format!("bad control URL for {}: {}", device.udn, e)))
}
