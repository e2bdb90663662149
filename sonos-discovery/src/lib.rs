//! Sonos coordinator discovery
//!
//! This crate finds Sonos group coordinators on the local network. It
//! multicasts one SSDP M-SEARCH for `ZonePlayer` devices, fetches the UPnP
//! description behind every reply, and asks each player's
//! `ZoneGroupTopology` service whether it coordinates its group. Only
//! coordinators are published.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> sonos_discovery::Result<()> {
//! // Wait up to five seconds for the Kitchen coordinator
//! let kitchen = sonos_discovery::find_room("Kitchen", Duration::from_secs(5)).await?;
//! println!("{} at {}", kitchen.room_name, kitchen.base_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Streaming Discovery
//!
//! For more control, open a session and consume its channel:
//!
//! ```no_run
//! use sonos_discovery::{DiscoveryConfig, DiscoverySession};
//!
//! # #[tokio::main]
//! # async fn main() -> sonos_discovery::Result<()> {
//! let mut session = DiscoverySession::open_with_config(DiscoveryConfig::household_scan()).await?;
//! let mut coordinators = session.search().await?;
//!
//! while let Some(device) = coordinators.recv().await {
//!     println!("Found: {} ({})", device.room_name, device.udn);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
pub mod device;
mod error;
mod resolver;
mod room;
mod session;
mod ssdp;
pub mod topology;

pub use config::{DiscoveryConfig, SSDP_MULTICAST_ADDR, ZONE_PLAYER_SEARCH_TARGET};
pub use device::{DiscoveredDevice, ServiceDescription};
pub use error::{DiscoveryError, Result};
pub use resolver::{DeviceResolver, HttpResolver};
pub use room::{
    collect_coordinators, discover_coordinators, find_room, find_room_in, find_room_with_config,
    wait_for_room,
};
pub use session::{DiscoverySession, ReaderHandles};
pub use ssdp::SsdpResponse;
pub use topology::ZoneGroupState;

/// Open a discovery session with the default configuration.
///
/// Shorthand for [`DiscoverySession::open`].
pub async fn open_discovery() -> Result<DiscoverySession> {
    DiscoverySession::open().await
}
