//! midimap binary. Bridges every MIDI port until interrupted.
//!
//! Usage: `midimap [config.toml]`

use std::env;
use std::sync::atomic::Ordering;

use midimap::{Midimap, MidimapConfig, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = match env::args().nth(1) {
        Some(path) => MidimapConfig::load(path)?,
        None => MidimapConfig::default(),
    };

    let mut midimap = Midimap::builder().config(config).discover().build()?;
    let shutdown = midimap.shutdown_handle();

    let bridge = tokio::task::spawn_blocking(move || midimap.run());

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
    }
    shutdown.store(true, Ordering::SeqCst);
    bridge.await?;
    Ok(())
}
