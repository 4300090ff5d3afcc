//! Translation engine between MIDI byte streams and instance-aware network signals.
//!
//! - **Topology**: the seven signals every MIDI channel exposes, and their names
//! - **Decoding**: raw 3-byte channel-voice messages into [`MidiEvent`]s
//! - **Correlation**: note events onto pitch/velocity/aftertouch instances keyed by note number
//! - **Encoding**: network updates back into MIDI bytes
//! - **Network boundary**: [`SignalEndpoint`] / [`SignalNetwork`], plus the in-process [`LocalNetwork`]
//!
//! Hardware I/O lives in `midimap-io`.
//!
//! # Example
//!
//! ```ignore
//! use midimap_core::{apply_event, MidiEvent, SignalDirection, SignalSet, UpdateBatch};
//!
//! let mut signals = SignalSet::new(SignalDirection::Output);
//! let mut batch = UpdateBatch::new(std::time::Instant::now());
//! let event = MidiEvent::decode(&[0x90, 64, 100])?;
//! apply_event(&mut signals, &event, &mut batch)?;
//! assert_eq!(batch.len(), 2); // pitch + velocity, instance 64
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod topology;
pub use topology::{
    channel_signals, Channel, SignalDirection, SignalKey, SignalKind, SignalSpec, CHANNEL_COUNT,
    INSTANCE_CAPACITY,
};

pub(crate) mod event;
pub use event::{MessageKind, MidiEvent, MESSAGE_LEN};

pub(crate) mod network;
pub use network::{
    InstanceId, SignalEndpoint, SignalNetwork, SignalUpdate, SignalValue, UpdateBatch,
};

pub(crate) mod signal;
pub use signal::{InstanceTable, SignalSet};

pub mod correlator;
pub use correlator::apply_event;

pub mod encoder;
pub use encoder::{apply_update, EncoderOptions, MidiOutputMessage, DEFAULT_NOTE};

pub(crate) mod local;
pub use local::{LocalEndpoint, LocalNetwork, Route};
