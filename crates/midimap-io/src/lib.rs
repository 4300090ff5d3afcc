//! MIDI hardware side of midimap.
//!
//! Discovers MIDI ports, gives each one a bridge onto the signal network, and
//! drives every bridge from a single poll loop.
//!
//! Feature gates: `midi-io` (platform MIDI via midir, on by default).

pub mod error;
pub use error::{Error, Result};

pub mod io;
#[cfg(feature = "midi-io")]
pub use io::MidirBackend;
pub use io::{InputConnection, MidiBackend, MidiSink, PortInfo, RawMidiMessage, VirtualBackend};

mod bridge;
pub use bridge::{sanitize_name, InputBridge, OutputBridge};

mod registry;
pub use registry::{DeviceRegistry, DiscoveryReport};

pub mod config;
pub use config::MidimapConfig;

mod system;
pub use system::{Midimap, MidimapBuilder, PollStats, POLL_INTERVAL};
