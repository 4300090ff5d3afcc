//! Encoding of network signal updates back into MIDI.
//!
//! Pitch is carried passively: it only surfaces through the note-on and
//! aftertouch messages that velocity and aftertouch updates produce.

use crate::error::{Error, Result};
use crate::event::MessageKind;
use crate::network::{InstanceId, SignalUpdate};
use crate::signal::SignalSet;
use crate::topology::{Channel, SignalKey, SignalKind};
use smallvec::SmallVec;
use tracing::debug;

/// Note number used when a velocity or aftertouch instance has no pitch.
pub const DEFAULT_NOTE: u8 = 60;

/// One outgoing MIDI message, 2 or 3 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiOutputMessage {
    pub bytes: SmallVec<[u8; 3]>,
}

impl MidiOutputMessage {
    fn new(kind: MessageKind, channel: Channel, data: &[u8]) -> Self {
        let mut bytes = SmallVec::new();
        bytes.push(kind.status() | channel.index());
        bytes.extend(data.iter().map(|b| b & 0x7F));
        Self { bytes }
    }

    pub fn note_on(channel: Channel, note: u8, velocity: u8) -> Self {
        Self::new(MessageKind::NoteOn, channel, &[note, velocity])
    }

    pub fn aftertouch(channel: Channel, note: u8, pressure: u8) -> Self {
        Self::new(MessageKind::Aftertouch, channel, &[note, pressure])
    }

    pub fn control_change(channel: Channel, control: u8, value: u8) -> Self {
        Self::new(MessageKind::ControlChange, channel, &[control, value])
    }

    pub fn program_change(channel: Channel, program: u8) -> Self {
        Self::new(MessageKind::ProgramChange, channel, &[program])
    }

    pub fn channel_pressure(channel: Channel, pressure: u8) -> Self {
        Self::new(MessageKind::ChannelPressure, channel, &[pressure])
    }

    /// `value`: unsigned 14-bit (0 to 16383), sent LSB first.
    pub fn pitch_wheel(channel: Channel, value: u16) -> Self {
        let value = value.min(16383);
        let lsb = (value & 0x7F) as u8;
        let msb = ((value >> 7) & 0x7F) as u8;
        Self::new(MessageKind::PitchWheel, channel, &[lsb, msb])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Send note-on with velocity 0 when a sounding velocity instance is
    /// released. Off by default: releases are silent.
    pub note_off_on_release: bool,
}

/// Apply one network update to an output bridge's signals and encode the
/// MIDI message it implies, if any.
///
/// The store is updated first, so a velocity update following a pitch update
/// for the same instance picks up that pitch. Releasing a non-instanced
/// signal, or any instance that is not live, produces nothing.
pub fn apply_update(
    signals: &mut SignalSet,
    update: &SignalUpdate,
    options: EncoderOptions,
) -> Result<Option<MidiOutputMessage>> {
    let key = SignalKey::from_path(&update.path)?;
    let channel = key.channel;
    let id = update.instance.unwrap_or(InstanceId::ANONYMOUS);

    let Some(values) = &update.value else {
        return Ok(release(signals, key, id, options));
    };

    let message = match key.kind {
        SignalKind::Pitch | SignalKind::Velocity | SignalKind::Aftertouch => {
            let value = single_value(&update.path, values)?;
            return update_note(signals, key, id, value);
        }
        SignalKind::PitchWheel => {
            let stored = signals.update(key, values)?;
            MidiOutputMessage::pitch_wheel(channel, stored[0] as u16)
        }
        SignalKind::ControlChange => {
            let stored = signals.update(key, values)?;
            MidiOutputMessage::control_change(channel, stored[0] as u8, stored[1] as u8)
        }
        SignalKind::ProgramChange => {
            let stored = signals.update(key, values)?;
            MidiOutputMessage::program_change(channel, stored[0] as u8)
        }
        SignalKind::ChannelPressure => {
            let stored = signals.update(key, values)?;
            MidiOutputMessage::channel_pressure(channel, stored[0] as u8)
        }
    };
    Ok(Some(message))
}

fn update_note(
    signals: &mut SignalSet,
    key: SignalKey,
    id: InstanceId,
    value: i32,
) -> Result<Option<MidiOutputMessage>> {
    let channel = key.channel;
    match key.kind {
        SignalKind::Pitch => {
            signals.update_instance(key, id, value)?;
            Ok(None)
        }
        SignalKind::Velocity => {
            let velocity = signals.update_instance(key, id, value)?;
            let note = resolve_note(signals, channel, id);
            Ok(Some(MidiOutputMessage::note_on(channel, note, velocity as u8)))
        }
        SignalKind::Aftertouch => {
            if !is_sounding(signals, channel, id) {
                debug!(
                    "{} instance {}: aftertouch without a sounding note, dropped",
                    key, id
                );
                return Ok(None);
            }
            let pressure = signals.update_instance(key, id, value)?;
            let note = resolve_note(signals, channel, id);
            Ok(Some(MidiOutputMessage::aftertouch(channel, note, pressure as u8)))
        }
        _ => Err(Error::NotInstanced(key.path())),
    }
}

fn release(
    signals: &mut SignalSet,
    key: SignalKey,
    id: InstanceId,
    options: EncoderOptions,
) -> Option<MidiOutputMessage> {
    let channel = key.channel;
    let ends_note = matches!(key.kind, SignalKind::Pitch | SignalKind::Velocity);
    if !(options.note_off_on_release && ends_note && is_sounding(signals, channel, id)) {
        signals.release_instance(key, id);
        return None;
    }

    // Whichever of pitch and velocity goes first ends the note, so the
    // note-off still carries the right pitch.
    let note = resolve_note(signals, channel, id);
    for kind in [SignalKind::Pitch, SignalKind::Velocity, SignalKind::Aftertouch] {
        signals.release_instance(SignalKey::new(channel, kind), id);
    }
    Some(MidiOutputMessage::note_on(channel, note, 0))
}

/// Pitch of the instance, or [`DEFAULT_NOTE`] if it has none (or pitch 0).
fn resolve_note(signals: &SignalSet, channel: Channel, id: InstanceId) -> u8 {
    match signals.instance_value(SignalKey::new(channel, SignalKind::Pitch), id) {
        Some(pitch) if pitch > 0 => pitch as u8,
        _ => DEFAULT_NOTE,
    }
}

fn is_sounding(signals: &SignalSet, channel: Channel, id: InstanceId) -> bool {
    matches!(
        signals.instance_value(SignalKey::new(channel, SignalKind::Velocity), id),
        Some(v) if v > 0
    )
}

fn single_value(path: &str, values: &[i32]) -> Result<i32> {
    match values {
        [value] => Ok(*value),
        _ => Err(Error::Arity {
            path: path.to_string(),
            expected: 1,
            actual: values.len(),
        }),
    }
}
