//! MIDI port access.
//!
//! [`MidiBackend`] covers enumeration and connection. The registry talks only
//! to this trait, so it runs the same against hardware ([`MidirBackend`],
//! `midi-io` feature) and against the in-memory [`VirtualBackend`].

#[cfg(feature = "midi-io")]
mod hardware;
mod virtual_port;

#[cfg(feature = "midi-io")]
pub use hardware::MidirBackend;
pub use virtual_port::VirtualBackend;

use crate::error::Result;
use crossbeam_channel::{Sender, TrySendError};
use smallvec::SmallVec;
use std::time::Instant;
use tracing::debug;

/// A port as seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Position in the backend's port list at enumeration time.
    pub index: usize,
    pub name: String,
}

/// Bytes received from an input port, stamped on arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMidiMessage {
    pub timestamp: Instant,
    pub bytes: SmallVec<[u8; 3]>,
}

impl RawMidiMessage {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            timestamp: Instant::now(),
            bytes: SmallVec::from_slice(bytes),
        }
    }
}

/// Keeps an input port open. Dropping it closes the port.
pub trait InputConnection: Send {}

/// An open output port.
pub trait MidiSink: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

pub trait MidiBackend: Send {
    fn input_ports(&self) -> Result<Vec<PortInfo>>;

    fn output_ports(&self) -> Result<Vec<PortInfo>>;

    /// Open `port` and forward everything it receives into `sender`.
    fn open_input(
        &self,
        port: &PortInfo,
        sender: Sender<RawMidiMessage>,
    ) -> Result<Box<dyn InputConnection>>;

    fn open_output(&self, port: &PortInfo) -> Result<Box<dyn MidiSink>>;
}

/// Input callback body shared by the backends: never blocks, drops on a full
/// queue.
pub(crate) fn forward(sender: &Sender<RawMidiMessage>, port: &str, bytes: &[u8]) {
    match sender.try_send(RawMidiMessage::new(bytes)) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            debug!("MIDI input '{}': queue full, message dropped", port);
        }
        // Bridge already torn down
        Err(TrySendError::Disconnected(_)) => {}
    }
}

/// Pick the port described by `info` out of a fresh enumeration. The index
/// is tried first; if the port list shifted since, fall back to the name.
pub(crate) fn find_port<P: Clone>(
    ports: &[P],
    name_of: impl Fn(&P) -> Option<String>,
    info: &PortInfo,
) -> Option<P> {
    ports
        .get(info.index)
        .filter(|port| name_of(port).as_deref() == Some(info.name.as_str()))
        .or_else(|| {
            ports
                .iter()
                .find(|port| name_of(port).as_deref() == Some(info.name.as_str()))
        })
        .cloned()
}
