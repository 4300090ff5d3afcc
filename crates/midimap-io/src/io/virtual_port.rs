//! In-memory MIDI ports.
//!
//! Ports are plain names. Bytes handed to [`VirtualBackend::send`] reach every
//! open connection on that input; bytes written to an output are recorded
//! until [`VirtualBackend::take_sent`] collects them.

use super::{forward, InputConnection, MidiBackend, MidiSink, PortInfo, RawMidiMessage};
use crate::error::{Error, Result};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

struct VirtualInput {
    name: String,
    connections: Vec<(u64, Sender<RawMidiMessage>)>,
}

struct VirtualOutput {
    name: String,
    open: usize,
    sent: Vec<Vec<u8>>,
}

#[derive(Default)]
struct VirtualInner {
    inputs: Vec<VirtualInput>,
    outputs: Vec<VirtualOutput>,
    failing: HashSet<String>,
    next_connection: u64,
}

/// Clone is cheap (Arc internally); clones share the same ports.
#[derive(Clone, Default)]
pub struct VirtualBackend {
    inner: Arc<Mutex<VirtualInner>>,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&self, name: impl Into<String>) {
        self.inner.lock().inputs.push(VirtualInput {
            name: name.into(),
            connections: Vec::new(),
        });
    }

    pub fn add_output(&self, name: impl Into<String>) {
        self.inner.lock().outputs.push(VirtualOutput {
            name: name.into(),
            open: 0,
            sent: Vec::new(),
        });
    }

    /// Unplug a port. Open connections stay alive but receive nothing more.
    pub fn remove_port(&self, name: &str) {
        let mut inner = self.inner.lock();
        inner.inputs.retain(|port| port.name != name);
        inner.outputs.retain(|port| port.name != name);
    }

    /// Make every later attempt to open `name` fail.
    pub fn fail_on_open(&self, name: impl Into<String>) {
        self.inner.lock().failing.insert(name.into());
    }

    /// Deliver bytes on input port `name`. Returns the number of open
    /// connections reached.
    pub fn send(&self, name: &str, bytes: &[u8]) -> usize {
        let inner = self.inner.lock();
        let mut reached = 0;
        for port in inner.inputs.iter().filter(|port| port.name == name) {
            for (_, sender) in &port.connections {
                forward(sender, name, bytes);
                reached += 1;
            }
        }
        reached
    }

    /// Drain everything written to output port `name` so far.
    pub fn take_sent(&self, name: &str) -> Vec<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner
            .outputs
            .iter_mut()
            .filter(|port| port.name == name)
            .flat_map(|port| std::mem::take(&mut port.sent))
            .collect()
    }

    /// Open connections on input port `name`.
    pub fn open_inputs(&self, name: &str) -> usize {
        self.inner
            .lock()
            .inputs
            .iter()
            .filter(|port| port.name == name)
            .map(|port| port.connections.len())
            .sum()
    }

    /// Open connections on output port `name`.
    pub fn open_outputs(&self, name: &str) -> usize {
        self.inner
            .lock()
            .outputs
            .iter()
            .filter(|port| port.name == name)
            .map(|port| port.open)
            .sum()
    }
}

impl std::fmt::Debug for VirtualBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("VirtualBackend")
            .field("num_inputs", &inner.inputs.len())
            .field("num_outputs", &inner.outputs.len())
            .finish()
    }
}

impl MidiBackend for VirtualBackend {
    fn input_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(self
            .inner
            .lock()
            .inputs
            .iter()
            .enumerate()
            .map(|(index, port)| PortInfo {
                index,
                name: port.name.clone(),
            })
            .collect())
    }

    fn output_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(self
            .inner
            .lock()
            .outputs
            .iter()
            .enumerate()
            .map(|(index, port)| PortInfo {
                index,
                name: port.name.clone(),
            })
            .collect())
    }

    fn open_input(
        &self,
        info: &PortInfo,
        sender: Sender<RawMidiMessage>,
    ) -> Result<Box<dyn InputConnection>> {
        let mut inner = self.inner.lock();
        if inner.failing.contains(&info.name) {
            return Err(Error::MidiPort(format!("cannot open '{}'", info.name)));
        }
        let id = inner.next_connection;
        inner.next_connection += 1;

        let port = inner
            .inputs
            .iter_mut()
            .find(|port| port.name == info.name)
            .ok_or_else(|| {
                Error::MidiDevice(format!("MIDI input device '{}' not found", info.name))
            })?;
        port.connections.push((id, sender));

        Ok(Box::new(VirtualInputConnection {
            inner: Arc::clone(&self.inner),
            name: info.name.clone(),
            id,
        }))
    }

    fn open_output(&self, info: &PortInfo) -> Result<Box<dyn MidiSink>> {
        let mut inner = self.inner.lock();
        if inner.failing.contains(&info.name) {
            return Err(Error::MidiPort(format!("cannot open '{}'", info.name)));
        }
        let port = inner
            .outputs
            .iter_mut()
            .find(|port| port.name == info.name)
            .ok_or_else(|| {
                Error::MidiDevice(format!("MIDI output device '{}' not found", info.name))
            })?;
        port.open += 1;

        Ok(Box::new(VirtualSink {
            inner: Arc::clone(&self.inner),
            name: info.name.clone(),
        }))
    }
}

struct VirtualInputConnection {
    inner: Arc<Mutex<VirtualInner>>,
    name: String,
    id: u64,
}

impl InputConnection for VirtualInputConnection {}

impl Drop for VirtualInputConnection {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        for port in inner.inputs.iter_mut().filter(|port| port.name == self.name) {
            port.connections.retain(|(id, _)| *id != self.id);
        }
    }
}

struct VirtualSink {
    inner: Arc<Mutex<VirtualInner>>,
    name: String,
}

impl MidiSink for VirtualSink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        let port = inner
            .outputs
            .iter_mut()
            .find(|port| port.name == self.name)
            .ok_or_else(|| Error::MidiPort(format!("'{}' disconnected", self.name)))?;
        port.sent.push(bytes.to_vec());
        Ok(())
    }
}

impl Drop for VirtualSink {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if let Some(port) = inner.outputs.iter_mut().find(|port| port.name == self.name) {
            port.open = port.open.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_input_delivery_and_close() {
        let backend = VirtualBackend::new();
        backend.add_input("Keys");
        assert_eq!(backend.send("Keys", &[0x90, 60, 100]), 0);

        let port = backend.input_ports().unwrap().remove(0);
        let (tx, rx) = bounded(8);
        let connection = backend.open_input(&port, tx).unwrap();
        assert_eq!(backend.open_inputs("Keys"), 1);

        assert_eq!(backend.send("Keys", &[0x90, 60, 100]), 1);
        assert_eq!(rx.try_recv().unwrap().bytes.as_slice(), &[0x90, 60, 100]);

        drop(connection);
        assert_eq!(backend.open_inputs("Keys"), 0);
        assert_eq!(backend.send("Keys", &[0x90, 60, 100]), 0);
    }

    #[test]
    fn test_output_records_bytes() {
        let backend = VirtualBackend::new();
        backend.add_output("Synth");
        let port = backend.output_ports().unwrap().remove(0);

        let mut sink = backend.open_output(&port).unwrap();
        sink.send(&[0xB0, 7, 100]).unwrap();
        assert_eq!(backend.take_sent("Synth"), vec![vec![0xB0, 7, 100]]);
        assert!(backend.take_sent("Synth").is_empty());

        drop(sink);
        assert_eq!(backend.open_outputs("Synth"), 0);
    }

    #[test]
    fn test_fail_on_open() {
        let backend = VirtualBackend::new();
        backend.add_output("Broken");
        backend.fail_on_open("Broken");
        let port = backend.output_ports().unwrap().remove(0);
        assert!(matches!(backend.open_output(&port), Err(Error::MidiPort(_))));
    }
}
