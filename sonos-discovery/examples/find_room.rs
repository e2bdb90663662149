//! Look up the coordinator of one room
//!
//! Usage: RUST_LOG=sonos_discovery=debug cargo run -p sonos-rooms-discovery --example find_room -- Kitchen [seconds]

use sonos_discovery::{find_room, DiscoveryError};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sonos_discovery=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(room) = args.next() else {
        eprintln!("usage: find_room <room name> [seconds]");
        return ExitCode::FAILURE;
    };
    let timeout = Duration::from_secs(args.next().and_then(|s| s.parse().ok()).unwrap_or(5));

    match find_room(&room, timeout).await {
        Ok(device) => {
            println!("{} is coordinated by {}", device.room_name, device.udn);
            println!("  model:    {}", device.model_name);
            println!("  base url: {}", device.base_url);
            ExitCode::SUCCESS
        }
        Err(DiscoveryError::Timeout { room, timeout }) => {
            eprintln!("No coordinator for {:?} answered within {:?}", room, timeout);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Discovery failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
