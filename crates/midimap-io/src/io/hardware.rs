//! Hardware ports via midir.

use super::{find_port, forward, InputConnection, MidiBackend, MidiSink, PortInfo, RawMidiMessage};
use crate::error::{Error, Result};
use crossbeam_channel::Sender;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::debug;

/// Opens ports through the platform MIDI API (ALSA, CoreMIDI, WinMM).
#[derive(Debug, Clone)]
pub struct MidirBackend {
    client_name: String,
}

impl MidirBackend {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }
}

impl MidiBackend for MidirBackend {
    fn input_ports(&self) -> Result<Vec<PortInfo>> {
        let input = MidiInput::new(&self.client_name)?;
        Ok(input
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| PortInfo {
                index,
                name: input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index)),
            })
            .collect())
    }

    fn output_ports(&self) -> Result<Vec<PortInfo>> {
        let output = MidiOutput::new(&self.client_name)?;
        Ok(output
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| PortInfo {
                index,
                name: output
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index)),
            })
            .collect())
    }

    fn open_input(
        &self,
        info: &PortInfo,
        sender: Sender<RawMidiMessage>,
    ) -> Result<Box<dyn InputConnection>> {
        let mut input = MidiInput::new(&self.client_name)?;
        // Sysex, clock and active sensing never reach the bridge.
        input.ignore(Ignore::All);

        let ports = input.ports();
        let port = find_port(&ports, |p| input.port_name(p).ok(), info).ok_or_else(|| {
            Error::MidiDevice(format!("MIDI input device '{}' not found", info.name))
        })?;

        let port_name = info.name.clone();
        let connection = input.connect(
            &port,
            &format!("{}-in", self.client_name),
            move |_stamp, bytes, _| forward(&sender, &port_name, bytes),
            (),
        )?;
        debug!("Opened MIDI input {}: {}", info.index, info.name);
        Ok(Box::new(connection))
    }

    fn open_output(&self, info: &PortInfo) -> Result<Box<dyn MidiSink>> {
        let output = MidiOutput::new(&self.client_name)?;

        let ports = output.ports();
        let port = find_port(&ports, |p| output.port_name(p).ok(), info).ok_or_else(|| {
            Error::MidiDevice(format!("MIDI output device '{}' not found", info.name))
        })?;

        let connection = output.connect(&port, &format!("{}-out", self.client_name))?;
        debug!("Opened MIDI output {}: {}", info.index, info.name);
        Ok(Box::new(connection))
    }
}

impl InputConnection for MidiInputConnection<()> {}

impl MidiSink for MidiOutputConnection {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        MidiOutputConnection::send(self, bytes)?;
        Ok(())
    }
}
