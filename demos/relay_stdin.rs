//! Relay frames read from stdin to an OBS control server.
//!
//! Each stdin line is treated as a received frame payload.
//!
//! Usage:
//!   OBS_URL=ws://localhost:4455 OBS_PASSWORD=secret cargo run --example relay_stdin
//!
//! Set `RUST_LOG=obs_frame_relay=debug` for protocol traces.

// ============================================================================
// Imports
// ============================================================================

use obs_frame_relay::{Bridge, BridgeCommand, FrameEvent, HandshakeMode, RelayConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut builder = RelayConfig::builder();
    if let Ok(url) = std::env::var("OBS_URL") {
        builder = builder.forward_url(url);
    }
    if let Ok(password) = std::env::var("OBS_PASSWORD") {
        builder = builder
            .password(password)
            .handshake(HandshakeMode::AwaitHello);
    }
    let bridge = Bridge::new(builder.build()?);

    bridge.on_notification(|notification| {
        println!("{}", serde_json::to_string(&notification)?);
        Ok(())
    });

    let reply = bridge.handle_command(BridgeCommand::ConnectObs).await;
    println!("connectObs -> {}", serde_json::to_string(&reply)?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        bridge.handle_frame(FrameEvent::received(line));
    }

    bridge.handle_command(BridgeCommand::DisconnectObs).await;
    println!("{}", serde_json::to_string_pretty(&bridge.status())?);

    Ok(())
}
