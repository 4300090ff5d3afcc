//! Boundary with the signal-mapping network.
//!
//! The network itself (transport, discovery, clock sync) lives outside this
//! crate. A bridge only needs somewhere to publish timetagged batches and
//! somewhere to poll for updates addressed to it.

use crate::topology::{SignalDirection, SignalSpec};
use smallvec::SmallVec;
use std::fmt;
use std::time::Instant;

/// Values carried by one update; two for control-change, one otherwise.
pub type SignalValue = SmallVec<[i32; 2]>;

/// Identity of one instance of an instanced signal.
///
/// Input bridges use the MIDI note number so pitch, velocity and aftertouch of
/// the same note share an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

impl InstanceId {
    /// Used when an instanced signal is updated without an instance id.
    pub const ANONYMOUS: InstanceId = InstanceId(0);

    pub fn from_note(note: u8) -> Self {
        Self(note as u32)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One signal update; `value == None` releases the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalUpdate {
    /// Signal path relative to the device, e.g. `/channel.1/note/pitch`.
    pub path: String,
    pub instance: Option<InstanceId>,
    pub value: Option<SignalValue>,
}

impl SignalUpdate {
    pub fn set(path: impl Into<String>, values: &[i32]) -> Self {
        Self {
            path: path.into(),
            instance: None,
            value: Some(SmallVec::from_slice(values)),
        }
    }

    pub fn set_instance(path: impl Into<String>, instance: InstanceId, values: &[i32]) -> Self {
        Self {
            path: path.into(),
            instance: Some(instance),
            value: Some(SmallVec::from_slice(values)),
        }
    }

    pub fn release(path: impl Into<String>, instance: InstanceId) -> Self {
        Self {
            path: path.into(),
            instance: Some(instance),
            value: None,
        }
    }

    #[inline]
    pub fn is_release(&self) -> bool {
        self.value.is_none()
    }
}

/// Updates that share a timetag and are delivered together, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBatch {
    pub timestamp: Instant,
    pub updates: SmallVec<[SignalUpdate; 3]>,
}

impl UpdateBatch {
    pub fn new(timestamp: Instant) -> Self {
        Self {
            timestamp,
            updates: SmallVec::new(),
        }
    }

    pub fn push(&mut self, update: SignalUpdate) {
        self.updates.push(update);
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

/// Network-facing side of one bridge.
pub trait SignalEndpoint: Send {
    /// Name under which the network knows this device.
    fn name(&self) -> &str;

    /// Publish one batch on the endpoint's output signals.
    fn send(&mut self, batch: &UpdateBatch);

    /// Drain updates that arrived for the endpoint's input signals.
    fn poll(&mut self) -> Vec<SignalUpdate>;
}

/// Factory for endpoints, one per bridge.
pub trait SignalNetwork: Send + Sync {
    /// Register a device exposing `signals`. The returned endpoint's name is
    /// `base_name` made unique within the network.
    fn create_endpoint(
        &self,
        base_name: &str,
        direction: SignalDirection,
        signals: &[SignalSpec],
    ) -> Box<dyn SignalEndpoint>;
}
