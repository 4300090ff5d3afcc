//! # midimap
//!
//! Exposes every MIDI port on the machine as a device on a signal mapping
//! network, and drives MIDI outputs from signals mapped onto them.
//!
//! ## Architecture
//!
//! - **midimap-core** - signal topology, MIDI decoding, note/instance
//!   correlation, encoding, and the network boundary
//! - **midimap-io** - port backends (midir, in-memory), bridges, device
//!   registry, and the poll loop
//!
//! ## Quick Start
//!
//! ```ignore
//! use midimap::prelude::*;
//!
//! let config = MidimapConfig::load("midimap.toml")?;
//! let mut midimap = Midimap::builder().config(config).discover().build()?;
//!
//! let shutdown = midimap.shutdown_handle();
//! // hand `shutdown` to whatever should stop the bridge
//! midimap.run();
//! ```
//!
//! Every MIDI channel appears as seven signals under `/channel.N/` (N = 1..16):
//! `note/pitch`, `note/velocity`, `note/aftertouch`, `control_change`,
//! `program_change`, `channel_pressure` and `pitch_wheel`. The three note
//! signals are instanced by note number.
//!
//! ## Feature Flags
//!
//! - `default` - `midi-io`
//! - `midi-io` - platform MIDI ports via midir

pub mod error;
pub use error::{Error, Result};

pub use midimap_core::{
    channel_signals, Channel, InstanceId, LocalNetwork, Route, SignalDirection, SignalEndpoint,
    SignalKey, SignalKind, SignalNetwork, SignalSpec, SignalUpdate, UpdateBatch,
};
#[cfg(feature = "midi-io")]
pub use midimap_io::MidirBackend;
pub use midimap_io::{
    MidiBackend, Midimap, MidimapBuilder, MidimapConfig, PollStats, VirtualBackend,
    POLL_INTERVAL,
};

pub mod prelude {
    pub use crate::{
        LocalNetwork, Midimap, MidimapConfig, Route, SignalDirection, SignalUpdate,
        VirtualBackend,
    };
    #[cfg(feature = "midi-io")]
    pub use crate::MidirBackend;
}
