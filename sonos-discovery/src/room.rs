//! Room lookup on top of a discovery session.
//!
//! `find_room` is the usual entry point: search once, then wait for a
//! coordinator whose room name matches byte for byte. Room names are not
//! normalised, so `"Kitchen"` never matches `"kitchen"` or `"Kitchen "`.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::config::DiscoveryConfig;
use crate::device::DiscoveredDevice;
use crate::error::{DiscoveryError, Result};
use crate::session::DiscoverySession;

/// Find the coordinator of `room_name` with the default configuration.
///
/// # Errors
///
/// `Socket` if the session cannot start, `Timeout` if no coordinator with
/// that exact room name shows up within `timeout`.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> sonos_discovery::Result<()> {
/// let kitchen = sonos_discovery::find_room("Kitchen", Duration::from_secs(5)).await?;
/// println!("Kitchen is coordinated by {} at {}", kitchen.udn, kitchen.base_url);
/// # Ok(())
/// # }
/// ```
pub async fn find_room(room_name: &str, timeout: Duration) -> Result<DiscoveredDevice> {
    find_room_with_config(DiscoveryConfig::default(), room_name, timeout).await
}

pub async fn find_room_with_config(
    config: DiscoveryConfig,
    room_name: &str,
    timeout: Duration,
) -> Result<DiscoveredDevice> {
    let session = DiscoverySession::open_with_config(config).await?;
    find_room_in(session, room_name, timeout).await
}

/// Search on an already opened session and wait for `room_name`.
///
/// The session is closed before returning, whatever the outcome.
pub async fn find_room_in(
    mut session: DiscoverySession,
    room_name: &str,
    timeout: Duration,
) -> Result<DiscoveredDevice> {
    let mut devices = session.search().await?;
    let found = wait_for_room(&mut devices, room_name, timeout).await;
    session.close();

    if let Ok(device) = &found {
        info!("Found room {:?} at {}", room_name, device.base_url);
    }
    found
}

/// Race `devices` against `timeout`, returning the first device named `room_name`.
///
/// Devices with other names are consumed and discarded. A channel that
/// closes before the deadline can no longer match, so it yields `Timeout`
/// right away instead of waiting out the clock. That includes a reader
/// that stopped on a socket receive error; the error itself is logged at
/// `warn` by the reader and does not surface here.
pub async fn wait_for_room(
    devices: &mut UnboundedReceiver<DiscoveredDevice>,
    room_name: &str,
    timeout: Duration,
) -> Result<DiscoveredDevice> {
    let matching = async {
        while let Some(device) = devices.recv().await {
            if device.room_name == room_name {
                return Some(device);
            }
            trace!("Ignoring {} in room {:?}", device.udn, device.room_name);
        }
        None
    };

    match tokio::time::timeout(timeout, matching).await {
        Ok(Some(device)) => Ok(device),
        Ok(None) => {
            debug!("Discovery channel closed before {:?} was found", room_name);
            Err(room_timeout(room_name, timeout))
        }
        Err(_) => Err(room_timeout(room_name, timeout)),
    }
}

/// Collect every coordinator that answers within `timeout`, one per UDN.
pub async fn discover_coordinators(timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
    let session = DiscoverySession::open_with_config(DiscoveryConfig::household_scan()).await?;
    collect_coordinators(session, timeout).await
}

/// Search on `session` and gather what it publishes until `timeout` elapses.
///
/// Duplicates are kept or dropped according to the session's
/// `dedupe_by_udn` setting. The session is closed before returning.
pub async fn collect_coordinators(
    mut session: DiscoverySession,
    timeout: Duration,
) -> Result<Vec<DiscoveredDevice>> {
    let mut devices = session.search().await?;
    let deadline = Instant::now() + timeout;
    let mut found = Vec::new();

    while let Ok(Some(device)) = tokio::time::timeout_at(deadline, devices.recv()).await {
        found.push(device);
    }
    session.close();

    info!("Discovered {} coordinator(s)", found.len());
    Ok(found)
}

fn room_timeout(room_name: &str, timeout: Duration) -> DiscoveryError {
    DiscoveryError::Timeout {
        room: room_name.to_string(),
        timeout,
    }
}
