//! Decoding of raw MIDI channel-voice messages.
//!
//! Classification is by status nibble only. Value-dependent policy (note-on
//! with velocity 0 meaning release) belongs to the correlator.

use crate::error::{Error, Result};
use crate::topology::Channel;
use serde::{Deserialize, Serialize};

/// Length of every message the decoder accepts.
pub const MESSAGE_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    NoteOff,
    NoteOn,
    Aftertouch,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchWheel,
}

impl MessageKind {
    /// High nibble of the status byte.
    pub const fn status(self) -> u8 {
        match self {
            MessageKind::NoteOff => 0x80,
            MessageKind::NoteOn => 0x90,
            MessageKind::Aftertouch => 0xA0,
            MessageKind::ControlChange => 0xB0,
            MessageKind::ProgramChange => 0xC0,
            MessageKind::ChannelPressure => 0xD0,
            MessageKind::PitchWheel => 0xE0,
        }
    }

    /// `None` for data bytes and system messages.
    pub fn from_status(status: u8) -> Option<Self> {
        match status & 0xF0 {
            0x80 => Some(MessageKind::NoteOff),
            0x90 => Some(MessageKind::NoteOn),
            0xA0 => Some(MessageKind::Aftertouch),
            0xB0 => Some(MessageKind::ControlChange),
            0xC0 => Some(MessageKind::ProgramChange),
            0xD0 => Some(MessageKind::ChannelPressure),
            0xE0 => Some(MessageKind::PitchWheel),
            _ => None,
        }
    }

    /// Data bytes carried on the wire.
    pub fn data_len(self) -> usize {
        match self {
            MessageKind::ProgramChange | MessageKind::ChannelPressure => 1,
            _ => 2,
        }
    }
}

/// A decoded channel-voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiEvent {
    pub kind: MessageKind,
    pub channel: Channel,
    pub data: [u8; 2],
}

impl MidiEvent {
    pub fn new(kind: MessageKind, channel: Channel, data0: u8, data1: u8) -> Self {
        Self {
            kind,
            channel,
            data: [data0, data1],
        }
    }

    /// Decode exactly three raw bytes.
    ///
    /// Any other length is rejected, including two-byte program-change and
    /// channel-pressure messages. Running status is not supported.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let &[status, data0, data1] = bytes else {
            return Err(Error::InvalidLength(bytes.len()));
        };
        let kind = MessageKind::from_status(status).ok_or(Error::UnsupportedStatus(status))?;
        if let Some(&bad) = [data0, data1].iter().find(|b| **b > 0x7F) {
            return Err(Error::InvalidDataByte(bad));
        }
        Ok(Self::new(kind, Channel::from_status(status), data0, data1))
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.kind.status() | self.channel.index()
    }

    /// Note number for note-off, note-on and aftertouch.
    pub fn note(&self) -> Option<u8> {
        match self.kind {
            MessageKind::NoteOff | MessageKind::NoteOn | MessageKind::Aftertouch => {
                Some(self.data[0])
            }
            _ => None,
        }
    }

    /// Velocity for note-on/off, pressure for aftertouch.
    pub fn velocity(&self) -> Option<u8> {
        self.note().map(|_| self.data[1])
    }

    /// 14-bit pitch-wheel value, LSB first on the wire.
    pub fn pitch_wheel_value(&self) -> Option<i32> {
        (self.kind == MessageKind::PitchWheel)
            .then(|| self.data[0] as i32 | ((self.data[1] as i32) << 7))
    }
}
