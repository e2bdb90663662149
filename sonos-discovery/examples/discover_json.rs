//! List group coordinators as JSON for scripting
//!
//! Usage: cargo run -p sonos-rooms-discovery --example discover_json [seconds]

use serde::Serialize;
use sonos_discovery::discover_coordinators;
use std::time::Duration;

#[derive(Serialize)]
struct CoordinatorInfo {
    udn: String,
    room_name: String,
    model_name: String,
    location: String,
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let timeout = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    let devices = discover_coordinators(Duration::from_secs(timeout)).await?;

    let coordinators: Vec<CoordinatorInfo> = devices
        .into_iter()
        .map(|d| CoordinatorInfo {
            udn: d.udn,
            room_name: d.room_name,
            model_name: d.model_name,
            location: d.location.to_string(),
            base_url: d.base_url.to_string(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&coordinators)?);
    Ok(())
}
