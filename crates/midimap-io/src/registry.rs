//! Device discovery and bridge ownership.

use crate::bridge::{InputBridge, OutputBridge};
use crate::io::{MidiBackend, PortInfo};
use crossbeam_channel::bounded;
use midimap_core::{EncoderOptions, SignalNetwork};
use std::sync::Arc;

/// Outcome of one [`DeviceRegistry::discover`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Port names that gained an input bridge.
    pub inputs: Vec<String>,
    /// Port names that gained an output bridge.
    pub outputs: Vec<String>,
    /// Port names that could not be opened.
    pub failed: Vec<String>,
}

impl DiscoveryReport {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty() && self.failed.is_empty()
    }
}

/// Owns every bridge. Ports are identified by exact name per direction, so a
/// port already bridged is never bridged twice.
pub struct DeviceRegistry {
    backend: Box<dyn MidiBackend>,
    network: Arc<dyn SignalNetwork>,
    queue_capacity: usize,
    encoder: EncoderOptions,
    inputs: Vec<InputBridge>,
    outputs: Vec<OutputBridge>,
}

impl DeviceRegistry {
    pub fn new(
        backend: Box<dyn MidiBackend>,
        network: Arc<dyn SignalNetwork>,
        queue_capacity: usize,
        encoder: EncoderOptions,
    ) -> Self {
        Self {
            backend,
            network,
            queue_capacity,
            encoder,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Bridge every port not bridged yet. Can be called again to pick up
    /// newly attached devices; ports that disappeared keep their bridges.
    pub fn discover(&mut self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        match self.backend.input_ports() {
            Ok(ports) => {
                for port in ports {
                    if self.inputs.iter().any(|b| b.port_name() == port.name) {
                        continue;
                    }
                    self.add_input(port, &mut report);
                }
            }
            Err(e) => tracing::warn!("Failed to enumerate MIDI inputs: {}", e),
        }

        match self.backend.output_ports() {
            Ok(ports) => {
                for port in ports {
                    if self.outputs.iter().any(|b| b.port_name() == port.name) {
                        continue;
                    }
                    self.add_output(port, &mut report);
                }
            }
            Err(e) => tracing::warn!("Failed to enumerate MIDI outputs: {}", e),
        }

        report
    }

    fn add_input(&mut self, port: PortInfo, report: &mut DiscoveryReport) {
        let (sender, receiver) = bounded(self.queue_capacity);
        match self.backend.open_input(&port, sender) {
            Ok(connection) => {
                let bridge = InputBridge::new(&port.name, &*self.network, receiver, connection);
                tracing::info!(
                    "Found MIDI input '{}', publishing as {}",
                    port.name,
                    bridge.device_name()
                );
                self.inputs.push(bridge);
                report.inputs.push(port.name);
            }
            Err(e) => {
                tracing::warn!("Failed to open MIDI input '{}': {}", port.name, e);
                report.failed.push(port.name);
            }
        }
    }

    fn add_output(&mut self, port: PortInfo, report: &mut DiscoveryReport) {
        match self.backend.open_output(&port) {
            Ok(sink) => {
                let bridge =
                    OutputBridge::new(&port.name, &*self.network, Some(sink), self.encoder);
                tracing::info!(
                    "Found MIDI output '{}', listening as {}",
                    port.name,
                    bridge.device_name()
                );
                self.outputs.push(bridge);
                report.outputs.push(port.name);
            }
            Err(e) => {
                tracing::warn!("Failed to open MIDI output '{}': {}", port.name, e);
                report.failed.push(port.name);
            }
        }
    }

    pub fn inputs(&self) -> &[InputBridge] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputBridge] {
        &self.outputs
    }

    pub fn inputs_mut(&mut self) -> &mut [InputBridge] {
        &mut self.inputs
    }

    pub fn outputs_mut(&mut self) -> &mut [OutputBridge] {
        &mut self.outputs
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }

    /// Close every port and leave the network.
    pub fn teardown(&mut self) {
        if self.is_empty() {
            return;
        }
        tracing::info!(
            "Closing {} MIDI inputs and {} MIDI outputs",
            self.inputs.len(),
            self.outputs.len()
        );
        self.inputs.clear();
        self.outputs.clear();
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}
