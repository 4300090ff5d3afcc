//! The bridge process: discovery, then a fixed-interval poll loop.

mod builder;

pub use builder::MidimapBuilder;

use crate::config::MidimapConfig;
use crate::registry::{DeviceRegistry, DiscoveryReport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause between poll passes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Work done by one [`Midimap::poll_once`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// MIDI messages translated into network updates.
    pub midi_in: usize,
    /// MIDI messages written to output ports.
    pub midi_out: usize,
}

pub struct Midimap {
    config: MidimapConfig,
    registry: DeviceRegistry,
    shutdown: Arc<AtomicBool>,
}

impl Midimap {
    pub fn builder() -> MidimapBuilder {
        MidimapBuilder::default()
    }

    pub fn config(&self) -> &MidimapConfig {
        &self.config
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Bridge any MIDI ports not bridged yet.
    pub fn discover(&mut self) -> DiscoveryReport {
        let report = self.registry.discover();
        tracing::info!(
            "Discovery: {} new inputs, {} new outputs, {} failed",
            report.inputs.len(),
            report.outputs.len(),
            report.failed.len()
        );
        report
    }

    /// One pass over every bridge: all inputs first, then all outputs, each
    /// in discovery order.
    pub fn poll_once(&mut self) -> PollStats {
        let mut stats = PollStats::default();
        for bridge in self.registry.inputs_mut() {
            stats.midi_in += bridge.process_pending();
        }
        for bridge in self.registry.outputs_mut() {
            stats.midi_out += bridge.poll();
        }
        stats
    }

    /// Flag that stops [`run`](Self::run). Safe to set from any thread or a
    /// signal handler.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Poll every [`POLL_INTERVAL`] until the shutdown flag is set, then
    /// close every port.
    pub fn run(&mut self) {
        tracing::info!(
            "Bridging {} MIDI inputs and {} MIDI outputs",
            self.registry.inputs().len(),
            self.registry.outputs().len()
        );
        while !self.shutdown.load(Ordering::SeqCst) {
            self.poll_once();
            thread::sleep(POLL_INTERVAL);
        }
        tracing::info!("Shutting down");
        self.registry.teardown();
    }
}

impl std::fmt::Debug for Midimap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Midimap")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}
