//! The SSDP discovery session.
//!
//! A session owns one UDP socket bound to an ephemeral port. [`DiscoverySession::search`]
//! multicasts a single M-SEARCH from that socket and spawns a reader task
//! that turns every reply into a coordinator candidate:
//!
//! 1. decode the datagram as an HTTP response
//! 2. read and parse its `LOCATION`
//! 3. fetch the device description
//! 4. ask the household topology whether the device is a coordinator
//! 5. publish coordinators on an unbounded channel
//!
//! Any step failing drops that one datagram and the loop moves on. The
//! reader stops when the session is closed or dropped, when the socket
//! reports a non-transient error, or when the receiver is dropped.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::DiscoveryConfig;
use crate::device::DiscoveredDevice;
use crate::error::{DiscoveryError, Result};
use crate::resolver::{DeviceResolver, HttpResolver};
use crate::ssdp::{build_msearch, SsdpResponse};

/// Largest SSDP reply we expect; longer datagrams are truncated and fail to decode.
const MAX_DATAGRAM: usize = 2048;

/// An open discovery session.
///
/// Dropping the session (or calling [`close`](Self::close)) releases the
/// socket and stops every reader task it spawned.
///
/// # Examples
///
/// ```no_run
/// use sonos_discovery::DiscoverySession;
///
/// # #[tokio::main]
/// # async fn main() -> sonos_discovery::Result<()> {
/// let mut session = DiscoverySession::open().await?;
/// let mut devices = session.search().await?;
///
/// while let Some(device) = devices.recv().await {
///     println!("{} coordinates {}", device.udn, device.room_name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DiscoverySession {
    socket: Arc<UdpSocket>,
    config: DiscoveryConfig,
    resolver: Arc<dyn DeviceResolver>,
    shutdown: watch::Sender<bool>,
    readers: Vec<JoinHandle<()>>,
}

impl DiscoverySession {
    /// Open a session with the default configuration.
    pub async fn open() -> Result<Self> {
        Self::open_with_config(DiscoveryConfig::default()).await
    }

    pub async fn open_with_config(config: DiscoveryConfig) -> Result<Self> {
        let resolver = HttpResolver::new(&config)?;
        Self::open_with_resolver(config, Arc::new(resolver)).await
    }

    /// Open a session whose candidates are resolved by `resolver`.
    pub async fn open_with_resolver(
        config: DiscoveryConfig,
        resolver: Arc<dyn DeviceResolver>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| DiscoveryError::socket("bind", e))?;

        if let Err(e) = socket.set_multicast_ttl_v4(config.multicast_ttl) {
            warn!("Failed to set multicast TTL: {}", e);
        }
        if let Err(e) = socket.set_multicast_loop_v4(true) {
            warn!("Failed to set multicast loop: {}", e);
        }

        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            socket: Arc::new(socket),
            config,
            resolver,
            shutdown,
            readers: Vec::new(),
        })
    }

    /// Address the session's socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| DiscoveryError::socket("local_addr", e))
    }

    /// Send one M-SEARCH and start reading replies.
    ///
    /// Nothing is re-sent. Calling this again sends another search and
    /// starts a second reader on the same socket; each datagram then goes
    /// to whichever reader receives it first.
    pub async fn search(&mut self) -> Result<mpsc::UnboundedReceiver<DiscoveredDevice>> {
        let request = build_msearch(&self.config);
        self.socket
            .send_to(request.as_bytes(), self.config.multicast_addr)
            .await
            .map_err(|e| DiscoveryError::socket("send M-SEARCH", e))?;
        info!(
            "Sent M-SEARCH for {} to {}",
            self.config.search_target, self.config.multicast_addr
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let reader = Reader {
            socket: Arc::clone(&self.socket),
            resolver: Arc::clone(&self.resolver),
            shutdown: self.shutdown.subscribe(),
            published: self.config.dedupe_by_udn.then(HashSet::new),
            tx,
        };
        self.readers.push(tokio::spawn(reader.run()));

        Ok(rx)
    }

    /// Stop the readers and release the socket.
    ///
    /// The returned handles let a caller wait until every reader has exited.
    pub fn close(mut self) -> ReaderHandles {
        ReaderHandles {
            handles: std::mem::take(&mut self.readers),
        }
    }
}

impl Drop for DiscoverySession {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Join handles of the reader tasks of a closed session.
#[derive(Debug)]
pub struct ReaderHandles {
    handles: Vec<JoinHandle<()>>,
}

impl ReaderHandles {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every reader task to finish.
    pub async fn wait(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Discovery reader task failed: {}", e);
            }
        }
    }
}

struct Reader {
    socket: Arc<UdpSocket>,
    resolver: Arc<dyn DeviceResolver>,
    shutdown: watch::Receiver<bool>,
    published: Option<HashSet<String>>,
    tx: mpsc::UnboundedSender<DiscoveredDevice>,
}

impl Reader {
    async fn run(self) {
        let Reader {
            socket,
            resolver,
            mut shutdown,
            mut published,
            tx,
        } = self;
        let mut buf = [0u8; MAX_DATAGRAM];

        loop {
            if *shutdown.borrow() {
                break;
            }

            let (len, from) = tokio::select! {
                _ = shutdown.changed() => break,
                received = socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(e) if is_transient(e.kind()) => {
                        trace!("Transient receive error: {}", e);
                        continue;
                    }
                    Err(e) => {
                        warn!("Discovery socket failed, stopping reader: {}", e);
                        break;
                    }
                },
            };
            trace!("Received {} byte datagram from {}", len, from);

            let outcome = tokio::select! {
                _ = shutdown.changed() => break,
                outcome = process(&buf[..len], resolver.as_ref(), &mut published) => outcome,
            };

            match outcome {
                Ok(Some(device)) => {
                    debug!("Publishing coordinator {} ({})", device.udn, device.room_name);
                    if tx.send(device).is_err() {
                        debug!("Discovery receiver dropped, stopping reader");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("Skipping SSDP reply from {}: {}", from, e),
            }
        }
    }
}

/// Run one datagram through the pipeline. `Ok(None)` means a valid
/// device that is not published (not a coordinator, or a repeat).
async fn process(
    datagram: &[u8],
    resolver: &dyn DeviceResolver,
    published: &mut Option<HashSet<String>>,
) -> Result<Option<DiscoveredDevice>> {
    let response = SsdpResponse::parse(datagram)?;
    let location = response.location()?;
    let device = resolver.describe(&location).await?;

    if let Some(seen) = published.as_ref() {
        if seen.contains(&device.udn) {
            trace!("Already published {}", device.udn);
            return Ok(None);
        }
    }

    if !resolver.is_coordinator(&device).await? {
        debug!("{} ({}) is not a group coordinator", device.udn, device.room_name);
        return Ok(None);
    }

    if let Some(seen) = published.as_mut() {
        seen.insert(device.udn.clone());
    }
    Ok(Some(device))
}

/// Receive errors worth retrying. ICMP port-unreachable from an earlier
/// send can surface as `ConnectionReset`/`ConnectionRefused` on some platforms.
fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionRefused
    )
}
