//! Signal topology: the named signals a bridge exposes per MIDI channel.
//!
//! Every channel carries the same seven signals, addressed as
//! `/channel.N/<suffix>` with `N` 1-based in the name and 0-based everywhere
//! else. Polyphonic key pressure has no signal of its own; per-note pressure
//! travels on `note/aftertouch`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Concurrent note identities per instanced signal.
pub const INSTANCE_CAPACITY: usize = 10;

/// Number of MIDI channels.
pub const CHANNEL_COUNT: usize = 16;

const CHANNEL_PREFIX: &str = "/channel.";

/// MIDI channel, 0-based (0..=15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Channel(u8);

impl Channel {
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < CHANNEL_COUNT).then_some(Self(index))
    }

    /// Low nibble of a status byte. Always in range.
    #[inline]
    pub fn from_status(status: u8) -> Self {
        Self(status & 0x0F)
    }

    /// 0-based index, used in status bytes and for table lookup.
    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }

    /// 1-based number, used in signal names.
    #[inline]
    pub fn number(self) -> u8 {
        self.0 + 1
    }

    pub fn all() -> impl Iterator<Item = Channel> {
        (0..CHANNEL_COUNT as u8).map(Channel)
    }

    /// Recover the channel embedded in a signal name such as
    /// `/channel.3/note/pitch` (channel index 2).
    ///
    /// Returns `None` when the prefix is missing, the number is malformed, or
    /// it falls outside 1..=16.
    pub fn from_signal_name(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(CHANNEL_PREFIX)?;
        let digits = rest.split('/').next()?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number: u8 = digits.parse().ok()?;
        if !(1..=CHANNEL_COUNT as u8).contains(&number) {
            return None;
        }
        Some(Self(number - 1))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Direction of a signal as seen from the mapping network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalDirection {
    /// Driven by the network, consumed by a MIDI output port.
    Input,
    /// Driven by a MIDI input port, published to the network.
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Pitch,
    Velocity,
    Aftertouch,
    PitchWheel,
    ControlChange,
    ProgramChange,
    ChannelPressure,
}

impl SignalKind {
    pub const ALL: [SignalKind; 7] = [
        SignalKind::Pitch,
        SignalKind::Velocity,
        SignalKind::Aftertouch,
        SignalKind::PitchWheel,
        SignalKind::ControlChange,
        SignalKind::ProgramChange,
        SignalKind::ChannelPressure,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            SignalKind::Pitch => "note/pitch",
            SignalKind::Velocity => "note/velocity",
            SignalKind::Aftertouch => "note/aftertouch",
            SignalKind::PitchWheel => "pitch_wheel",
            SignalKind::ControlChange => "control_change",
            SignalKind::ProgramChange => "program_change",
            SignalKind::ChannelPressure => "channel_pressure",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.suffix() == suffix)
    }

    /// Values carried per update.
    pub fn arity(self) -> usize {
        match self {
            SignalKind::ControlChange => 2,
            _ => 1,
        }
    }

    pub fn min(self) -> i32 {
        0
    }

    pub fn max(self) -> i32 {
        match self {
            SignalKind::PitchWheel => 16383,
            _ => 127,
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            SignalKind::Pitch => Some("midinote"),
            SignalKind::ControlChange => Some("midi"),
            _ => None,
        }
    }

    /// Pitch, velocity and aftertouch carry one instance per sounding note.
    pub fn is_instanced(self) -> bool {
        matches!(
            self,
            SignalKind::Pitch | SignalKind::Velocity | SignalKind::Aftertouch
        )
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// A signal's identity within one bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub channel: Channel,
    pub kind: SignalKind,
}

impl SignalKey {
    pub fn new(channel: Channel, kind: SignalKind) -> Self {
        Self { channel, kind }
    }

    pub fn path(&self) -> String {
        format!("{CHANNEL_PREFIX}{}/{}", self.channel.number(), self.kind.suffix())
    }

    /// Parse a signal path back into its key.
    pub fn from_path(path: &str) -> Result<Self> {
        let channel =
            Channel::from_signal_name(path).ok_or_else(|| Error::NoChannel(path.to_string()))?;
        let kind = path
            .strip_prefix(CHANNEL_PREFIX)
            .and_then(|rest| rest.split_once('/'))
            .and_then(|(_, suffix)| SignalKind::from_suffix(suffix))
            .ok_or_else(|| Error::UnknownSignal(path.to_string()))?;
        Ok(Self { channel, kind })
    }

    /// Position in a channel-major table of all signals.
    #[inline]
    pub(crate) fn index(&self) -> usize {
        self.channel.index() as usize * SignalKind::ALL.len() + self.kind.index()
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Declaration of one signal, as registered with the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSpec {
    pub key: SignalKey,
    pub direction: SignalDirection,
    pub path: String,
    pub arity: usize,
    pub min: i32,
    pub max: i32,
    pub unit: Option<&'static str>,
    /// Instance capacity for instanced signals.
    pub instances: Option<usize>,
}

impl SignalSpec {
    pub fn new(key: SignalKey, direction: SignalDirection) -> Self {
        let kind = key.kind;
        Self {
            key,
            direction,
            path: key.path(),
            arity: kind.arity(),
            min: kind.min(),
            max: kind.max(),
            unit: kind.unit(),
            instances: kind.is_instanced().then_some(INSTANCE_CAPACITY),
        }
    }
}

/// The full 16-channel signal set for one direction, channel-major.
pub fn channel_signals(direction: SignalDirection) -> Vec<SignalSpec> {
    Channel::all()
        .flat_map(|channel| {
            SignalKind::ALL
                .into_iter()
                .map(move |kind| SignalSpec::new(SignalKey::new(channel, kind), direction))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_from_signal_name() {
        assert_eq!(
            Channel::from_signal_name("/channel.1/note/pitch"),
            Channel::new(0)
        );
        assert_eq!(
            Channel::from_signal_name("/channel.16/pitch_wheel"),
            Channel::new(15)
        );
        assert_eq!(Channel::from_signal_name("/channel.10"), Channel::new(9));
    }

    #[test]
    fn test_channel_from_signal_name_rejects_out_of_range() {
        assert_eq!(Channel::from_signal_name("/channel.0/note/pitch"), None);
        assert_eq!(Channel::from_signal_name("/channel.17/note/pitch"), None);
        assert_eq!(Channel::from_signal_name("/channel.300/note/pitch"), None);
    }

    #[test]
    fn test_channel_from_signal_name_rejects_malformed() {
        assert_eq!(Channel::from_signal_name("/channel./note/pitch"), None);
        assert_eq!(Channel::from_signal_name("/channel.x/note/pitch"), None);
        assert_eq!(Channel::from_signal_name("/channel.-1/note/pitch"), None);
        assert_eq!(Channel::from_signal_name("/chan.1/note/pitch"), None);
        assert_eq!(Channel::from_signal_name(""), None);
    }

    #[test]
    fn test_channel_bounds() {
        assert!(Channel::new(15).is_some());
        assert!(Channel::new(16).is_none());
        assert_eq!(Channel::from_status(0x9F).index(), 15);
        assert_eq!(Channel::all().count(), CHANNEL_COUNT);
    }

    #[test]
    fn test_signal_paths() {
        let ch = Channel::new(2).unwrap();
        assert_eq!(
            SignalKey::new(ch, SignalKind::Pitch).path(),
            "/channel.3/note/pitch"
        );
        assert_eq!(
            SignalKey::new(ch, SignalKind::ControlChange).path(),
            "/channel.3/control_change"
        );
    }

    #[test]
    fn test_path_parse_matches_every_key() {
        for spec in channel_signals(SignalDirection::Output) {
            assert_eq!(SignalKey::from_path(&spec.path).unwrap(), spec.key);
        }
    }

    #[test]
    fn test_path_parse_errors() {
        assert!(matches!(
            SignalKey::from_path("/channel.0/note/pitch"),
            Err(Error::NoChannel(_))
        ));
        assert!(matches!(
            SignalKey::from_path("/channel.1/note/pressure"),
            Err(Error::UnknownSignal(_))
        ));
        assert!(matches!(
            SignalKey::from_path("/channel.1"),
            Err(Error::UnknownSignal(_))
        ));
    }

    #[test]
    fn test_channel_signal_set() {
        let specs = channel_signals(SignalDirection::Input);
        assert_eq!(specs.len(), CHANNEL_COUNT * SignalKind::ALL.len());

        for (i, spec) in specs.iter().enumerate() {
            assert_eq!(spec.key.index(), i);
            assert_eq!(spec.direction, SignalDirection::Input);
        }

        let wheel = specs
            .iter()
            .find(|s| s.path == "/channel.1/pitch_wheel")
            .unwrap();
        assert_eq!((wheel.min, wheel.max), (0, 16383));
        assert_eq!(wheel.instances, None);

        let cc = specs
            .iter()
            .find(|s| s.path == "/channel.1/control_change")
            .unwrap();
        assert_eq!(cc.arity, 2);
        assert_eq!(cc.unit, Some("midi"));

        let pitch = specs
            .iter()
            .find(|s| s.path == "/channel.1/note/pitch")
            .unwrap();
        assert_eq!(pitch.instances, Some(INSTANCE_CAPACITY));
        assert_eq!(pitch.unit, Some("midinote"));
    }
}
