//! One bridge per MIDI port.
//!
//! An [`InputBridge`] turns a MIDI input port into a network device whose
//! signals are outputs; an [`OutputBridge`] turns network input signals into
//! bytes on a MIDI output port.

use crate::io::{InputConnection, MidiSink, RawMidiMessage};
use crossbeam_channel::Receiver;
use midimap_core::{
    apply_event, apply_update, EncoderOptions, MidiEvent, SignalDirection, SignalEndpoint,
    SignalNetwork, SignalSet, SignalUpdate, UpdateBatch,
};
use tracing::debug;

/// Device base name for a port: ASCII alphanumerics only.
///
/// `"USB Keystation 61 MIDI 1"` becomes `"USBKeystation61MIDI1"`. A name with
/// nothing left becomes `"midi"`.
pub fn sanitize_name(port_name: &str) -> String {
    let name: String = port_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if name.is_empty() {
        "midi".to_string()
    } else {
        name
    }
}

pub struct InputBridge {
    port_name: String,
    endpoint: Box<dyn SignalEndpoint>,
    signals: SignalSet,
    receiver: Receiver<RawMidiMessage>,
    // Held for its Drop
    _connection: Box<dyn InputConnection>,
}

impl InputBridge {
    pub fn new(
        port_name: impl Into<String>,
        network: &dyn SignalNetwork,
        receiver: Receiver<RawMidiMessage>,
        connection: Box<dyn InputConnection>,
    ) -> Self {
        let port_name = port_name.into();
        let signals = SignalSet::new(SignalDirection::Output);
        let endpoint = network.create_endpoint(
            &sanitize_name(&port_name),
            SignalDirection::Output,
            &signals.specs(),
        );
        Self {
            port_name,
            endpoint,
            signals,
            receiver,
            _connection: connection,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn device_name(&self) -> &str {
        self.endpoint.name()
    }

    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    /// Handle every message queued since the last call. Returns how many were
    /// translated; the rest were dropped.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.receiver.try_recv() {
            if self.handle_message(&message) {
                applied += 1;
            }
        }
        applied
    }

    /// Decode, correlate and publish one message.
    pub fn handle_message(&mut self, message: &RawMidiMessage) -> bool {
        let event = match MidiEvent::decode(&message.bytes) {
            Ok(event) => event,
            Err(e) => {
                debug!("{}: {:02X?} ignored: {}", self.port_name, message.bytes.as_slice(), e);
                return false;
            }
        };

        let mut batch = UpdateBatch::new(message.timestamp);
        if let Err(e) = apply_event(&mut self.signals, &event, &mut batch) {
            debug!("{}: {:?} dropped: {}", self.port_name, event, e);
            return false;
        }
        if !batch.is_empty() {
            self.endpoint.send(&batch);
        }
        true
    }
}

impl std::fmt::Debug for InputBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputBridge")
            .field("port_name", &self.port_name)
            .field("device_name", &self.endpoint.name())
            .finish()
    }
}

pub struct OutputBridge {
    port_name: String,
    endpoint: Box<dyn SignalEndpoint>,
    signals: SignalSet,
    sink: Option<Box<dyn MidiSink>>,
    options: EncoderOptions,
}

impl OutputBridge {
    /// `sink` is `None` for a bridge without a physical port; updates to it
    /// are discarded.
    pub fn new(
        port_name: impl Into<String>,
        network: &dyn SignalNetwork,
        sink: Option<Box<dyn MidiSink>>,
        options: EncoderOptions,
    ) -> Self {
        let port_name = port_name.into();
        let signals = SignalSet::new(SignalDirection::Input);
        let endpoint = network.create_endpoint(
            &sanitize_name(&port_name),
            SignalDirection::Input,
            &signals.specs(),
        );
        Self {
            port_name,
            endpoint,
            signals,
            sink,
            options,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn device_name(&self) -> &str {
        self.endpoint.name()
    }

    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Drain the endpoint and write the resulting MIDI. Returns the number of
    /// messages sent.
    pub fn poll(&mut self) -> usize {
        self.endpoint
            .poll()
            .iter()
            .filter(|update| self.handle_update(update))
            .count()
    }

    /// Apply one update and send the MIDI it implies. Returns whether
    /// anything was sent.
    pub fn handle_update(&mut self, update: &SignalUpdate) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };

        let message = match apply_update(&mut self.signals, update, self.options) {
            Ok(Some(message)) => message,
            Ok(None) => return false,
            Err(e) => {
                debug!("{}: update {} dropped: {}", self.port_name, update.path, e);
                return false;
            }
        };

        match sink.send(message.as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                debug!("{}: send failed: {}", self.port_name, e);
                false
            }
        }
    }
}

impl std::fmt::Debug for OutputBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputBridge")
            .field("port_name", &self.port_name)
            .field("device_name", &self.endpoint.name())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MidiBackend, VirtualBackend};
    use crossbeam_channel::bounded;
    use midimap_core::{InstanceId, LocalNetwork, Route};

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("USB Keystation 61 MIDI 1"), "USBKeystation61MIDI1");
        assert_eq!(sanitize_name("nanoKONTROL2:_CTRL 20:0"), "nanoKONTROL2CTRL200");
        assert_eq!(sanitize_name(" -_ "), "midi");
        assert_eq!(sanitize_name("Über"), "ber");
    }

    fn input_bridge(network: &LocalNetwork, backend: &VirtualBackend, name: &str) -> InputBridge {
        backend.add_input(name);
        let port = backend
            .input_ports()
            .unwrap()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap();
        let (tx, rx) = bounded(64);
        let connection = backend.open_input(&port, tx).unwrap();
        InputBridge::new(name, network, rx, connection)
    }

    #[test]
    fn test_input_bridge_publishes_note() {
        let network = LocalNetwork::new();
        let monitor = network.monitor();
        let backend = VirtualBackend::new();
        let mut bridge = input_bridge(&network, &backend, "Keys 1");
        assert_eq!(bridge.device_name(), "Keys1.1");

        backend.send("Keys 1", &[0x90, 64, 100]);
        backend.send("Keys 1", &[0xF8, 0, 0]);
        backend.send("Keys 1", &[0x90, 64]);
        assert_eq!(bridge.process_pending(), 1);

        let id = InstanceId::from_note(64);
        let published: Vec<_> = monitor.try_iter().collect();
        assert_eq!(
            published,
            vec![
                (
                    "/Keys1.1/channel.1/note/pitch".to_string(),
                    SignalUpdate::set_instance("/channel.1/note/pitch", id, &[64])
                ),
                (
                    "/Keys1.1/channel.1/note/velocity".to_string(),
                    SignalUpdate::set_instance("/channel.1/note/velocity", id, &[100])
                ),
            ]
        );
    }

    #[test]
    fn test_input_bridge_skips_empty_batches() {
        let network = LocalNetwork::new();
        let monitor = network.monitor();
        let backend = VirtualBackend::new();
        let mut bridge = input_bridge(&network, &backend, "Keys");

        // Note-off for a note that never sounded
        backend.send("Keys", &[0x80, 64, 0]);
        assert_eq!(bridge.process_pending(), 1);
        assert!(monitor.try_recv().is_err());
    }

    #[test]
    fn test_output_bridge_encodes() {
        let network = LocalNetwork::new();
        let backend = VirtualBackend::new();
        backend.add_output("Synth");
        let port = backend.output_ports().unwrap().remove(0);
        let sink = backend.open_output(&port).unwrap();
        let mut bridge = OutputBridge::new("Synth", &network, Some(sink), EncoderOptions::default());
        assert_eq!(bridge.device_name(), "Synth.1");

        let id = InstanceId::from_note(64);
        network
            .inject(
                "/Synth.1/channel.1/note/pitch",
                SignalUpdate::set_instance("", id, &[64]),
            )
            .unwrap();
        network
            .inject(
                "/Synth.1/channel.1/note/velocity",
                SignalUpdate::set_instance("", id, &[100]),
            )
            .unwrap();
        network
            .inject("/Synth.1/channel.4/control_change", SignalUpdate::set("", &[7, 90]))
            .unwrap();

        assert_eq!(bridge.poll(), 2);
        assert_eq!(
            backend.take_sent("Synth"),
            vec![vec![0x90, 64, 100], vec![0xB3, 7, 90]]
        );
    }

    #[test]
    fn test_output_bridge_without_sink_is_noop() {
        let network = LocalNetwork::with_routes([Route::new("/Keys.1", "/Synth.1")]);
        let mut bridge = OutputBridge::new("Synth", &network, None, EncoderOptions::default());
        assert!(!bridge.has_sink());

        network
            .inject("/Synth.1/channel.1/pitch_wheel", SignalUpdate::set("", &[8192]))
            .unwrap();
        assert_eq!(bridge.poll(), 0);
        assert!(bridge
            .signals()
            .value(midimap_core::SignalKey::from_path("/channel.1/pitch_wheel").unwrap())
            .is_none());
    }
}
