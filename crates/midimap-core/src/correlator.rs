//! Instance correlation for MIDI input.
//!
//! Note events drive the pitch, velocity and aftertouch signals of a channel.
//! All three are keyed by the MIDI note number, so the instance a note-on
//! creates is the same instance later aftertouch updates and the note-off
//! release address. The other message kinds are plain single-value updates.

use crate::error::Result;
use crate::event::{MessageKind, MidiEvent};
use crate::network::{InstanceId, SignalUpdate, UpdateBatch};
use crate::signal::SignalSet;
use crate::topology::{Channel, SignalKey, SignalKind};
use tracing::debug;

const NOTE_KINDS: [SignalKind; 3] = [
    SignalKind::Pitch,
    SignalKind::Velocity,
    SignalKind::Aftertouch,
];

/// Apply one decoded event to `signals`, appending the resulting network
/// updates to `batch`.
///
/// A dropped event (aftertouch without a sounding note, a note beyond the
/// instance capacity) leaves both `signals` and `batch` untouched.
pub fn apply_event(
    signals: &mut SignalSet,
    event: &MidiEvent,
    batch: &mut UpdateBatch,
) -> Result<()> {
    let channel = event.channel;
    let [data0, data1] = event.data;

    match event.kind {
        MessageKind::NoteOff => {
            release_note(signals, channel, data0, batch);
            Ok(())
        }
        MessageKind::NoteOn if data1 == 0 => {
            release_note(signals, channel, data0, batch);
            Ok(())
        }
        MessageKind::NoteOn => note_on(signals, channel, data0, data1, batch),
        MessageKind::Aftertouch => aftertouch(signals, channel, data0, data1, batch),
        MessageKind::ControlChange => {
            let values = [data0 as i32, data1 as i32];
            set_single(signals, channel, SignalKind::ControlChange, &values, batch)
        }
        MessageKind::ProgramChange => {
            set_single(signals, channel, SignalKind::ProgramChange, &[data0 as i32], batch)
        }
        MessageKind::ChannelPressure => {
            set_single(signals, channel, SignalKind::ChannelPressure, &[data0 as i32], batch)
        }
        MessageKind::PitchWheel => {
            // 14-bit, LSB first
            let value = data0 as i32 | ((data1 as i32) << 7);
            set_single(signals, channel, SignalKind::PitchWheel, &[value], batch)
        }
    }
}

fn note_on(
    signals: &mut SignalSet,
    channel: Channel,
    note: u8,
    velocity: u8,
    batch: &mut UpdateBatch,
) -> Result<()> {
    let id = InstanceId::from_note(note);
    let pitch = SignalKey::new(channel, SignalKind::Pitch);
    let vel = SignalKey::new(channel, SignalKind::Velocity);

    let retrigger = signals.instance_value(pitch, id).is_some();
    let pitch_value = signals.update_instance(pitch, id, note as i32)?;
    let velocity_value = match signals.update_instance(vel, id, velocity as i32) {
        Ok(value) => value,
        Err(e) => {
            // Never leave a pitch instance without its velocity.
            if !retrigger {
                signals.release_instance(pitch, id);
            }
            return Err(e);
        }
    };

    batch.push(SignalUpdate::set_instance(pitch.path(), id, &[pitch_value]));
    batch.push(SignalUpdate::set_instance(vel.path(), id, &[velocity_value]));
    Ok(())
}

fn aftertouch(
    signals: &mut SignalSet,
    channel: Channel,
    note: u8,
    pressure: u8,
    batch: &mut UpdateBatch,
) -> Result<()> {
    let id = InstanceId::from_note(note);
    let vel = SignalKey::new(channel, SignalKind::Velocity);

    // Only a sounding note takes pressure.
    if !matches!(signals.instance_value(vel, id), Some(v) if v > 0) {
        debug!(
            "Channel {} note {}: aftertouch without a sounding note, dropped",
            channel, note
        );
        return Ok(());
    }

    let key = SignalKey::new(channel, SignalKind::Aftertouch);
    let value = signals.update_instance(key, id, pressure as i32)?;
    batch.push(SignalUpdate::set_instance(key.path(), id, &[value]));
    Ok(())
}

/// Release `note` on all three note signals. Instances that are not live are
/// skipped, so repeated note-offs produce nothing.
fn release_note(signals: &mut SignalSet, channel: Channel, note: u8, batch: &mut UpdateBatch) {
    let id = InstanceId::from_note(note);
    for kind in NOTE_KINDS {
        let key = SignalKey::new(channel, kind);
        if signals.release_instance(key, id) {
            batch.push(SignalUpdate::release(key.path(), id));
        }
    }
}

fn set_single(
    signals: &mut SignalSet,
    channel: Channel,
    kind: SignalKind,
    values: &[i32],
    batch: &mut UpdateBatch,
) -> Result<()> {
    let key = SignalKey::new(channel, kind);
    let stored = signals.update(key, values)?;
    batch.push(SignalUpdate::set(key.path(), &stored));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::topology::{SignalDirection, INSTANCE_CAPACITY};
    use std::time::Instant;

    fn apply(signals: &mut SignalSet, bytes: [u8; 3]) -> UpdateBatch {
        let mut batch = UpdateBatch::new(Instant::now());
        let event = MidiEvent::decode(&bytes).unwrap();
        apply_event(signals, &event, &mut batch).unwrap();
        batch
    }

    fn key(channel: u8, kind: SignalKind) -> SignalKey {
        SignalKey::new(Channel::new(channel).unwrap(), kind)
    }

    #[test]
    fn test_note_on_creates_pitch_and_velocity() {
        let mut signals = SignalSet::new(SignalDirection::Output);
        let batch = apply(&mut signals, [0x92, 64, 100]);

        let id = InstanceId::from_note(64);
        assert_eq!(signals.instance_value(key(2, SignalKind::Pitch), id), Some(64));
        assert_eq!(signals.instance_value(key(2, SignalKind::Velocity), id), Some(100));
        assert_eq!(signals.instance_value(key(2, SignalKind::Aftertouch), id), None);

        assert_eq!(
            batch.updates.as_slice(),
            &[
                SignalUpdate::set_instance("/channel.3/note/pitch", id, &[64]),
                SignalUpdate::set_instance("/channel.3/note/velocity", id, &[100]),
            ]
        );
    }

    #[test]
    fn test_note_off_releases_every_note_signal() {
        for channel in 0..16u8 {
            for note in [0u8, 60, 127] {
                let mut signals = SignalSet::new(SignalDirection::Output);
                apply(&mut signals, [0x90 | channel, note, 90]);
                apply(&mut signals, [0xA0 | channel, note, 30]);
                let batch = apply(&mut signals, [0x80 | channel, note, 64]);

                let id = InstanceId::from_note(note);
                for kind in NOTE_KINDS {
                    assert_eq!(signals.instance_value(key(channel, kind), id), None);
                }
                assert_eq!(batch.len(), 3);
                assert!(batch.updates.iter().all(|u| u.is_release()));
            }
        }
    }

    #[test]
    fn test_note_on_velocity_zero_is_release() {
        let mut signals = SignalSet::new(SignalDirection::Output);
        apply(&mut signals, [0x90, 60, 100]);
        let batch = apply(&mut signals, [0x90, 60, 0]);

        let id = InstanceId::from_note(60);
        assert_eq!(signals.instance_value(key(0, SignalKind::Velocity), id), None);
        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.updates[0],
            SignalUpdate::release("/channel.1/note/pitch", id)
        );
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut signals = SignalSet::new(SignalDirection::Output);
        assert!(apply(&mut signals, [0x80, 60, 0]).is_empty());

        apply(&mut signals, [0x90, 60, 100]);
        assert_eq!(apply(&mut signals, [0x80, 60, 0]).len(), 2);
        assert!(apply(&mut signals, [0x80, 60, 0]).is_empty());
    }

    #[test]
    fn test_aftertouch_follows_sounding_note() {
        let mut signals = SignalSet::new(SignalDirection::Output);
        apply(&mut signals, [0x90, 64, 100]);
        let batch = apply(&mut signals, [0xA0, 64, 50]);

        let id = InstanceId::from_note(64);
        assert_eq!(
            batch.updates.as_slice(),
            &[SignalUpdate::set_instance("/channel.1/note/aftertouch", id, &[50])]
        );
        assert_eq!(signals.instance_value(key(0, SignalKind::Aftertouch), id), Some(50));
    }

    #[test]
    fn test_aftertouch_without_note_is_dropped() {
        let mut signals = SignalSet::new(SignalDirection::Output);
        assert!(apply(&mut signals, [0xA0, 64, 50]).is_empty());

        // A note on another channel does not count.
        apply(&mut signals, [0x91, 64, 100]);
        assert!(apply(&mut signals, [0xA0, 64, 50]).is_empty());

        // Nor does a released note.
        apply(&mut signals, [0x90, 64, 100]);
        apply(&mut signals, [0x80, 64, 0]);
        assert!(apply(&mut signals, [0xA0, 64, 50]).is_empty());
        assert_eq!(
            signals.instance_value(key(0, SignalKind::Aftertouch), InstanceId::from_note(64)),
            None
        );
    }

    #[test]
    fn test_instance_capacity_drops_extra_notes() {
        let mut signals = SignalSet::new(SignalDirection::Output);
        for note in 0..INSTANCE_CAPACITY as u8 {
            apply(&mut signals, [0x90, 40 + note, 100]);
        }

        let event = MidiEvent::decode(&[0x90, 100, 100]).unwrap();
        let mut batch = UpdateBatch::new(Instant::now());
        let result = apply_event(&mut signals, &event, &mut batch);
        assert!(matches!(result, Err(Error::InstancesExhausted { .. })));
        assert!(batch.is_empty());
        assert_eq!(
            signals.instance_value(key(0, SignalKind::Pitch), InstanceId::from_note(100)),
            None
        );

        // Retriggering a live note still works.
        assert_eq!(apply(&mut signals, [0x90, 40, 80]).len(), 2);
    }

    #[test]
    fn test_pitch_wheel_reconstruction() {
        let mut signals = SignalSet::new(SignalDirection::Output);
        let batch = apply(&mut signals, [0xE0, 0x7F, 0x3F]);
        assert_eq!(
            batch.updates.as_slice(),
            &[SignalUpdate::set("/channel.1/pitch_wheel", &[8191])]
        );
        assert_eq!(
            signals.value(key(0, SignalKind::PitchWheel)).unwrap().as_slice(),
            &[8191]
        );
    }

    #[test]
    fn test_single_value_kinds() {
        let mut signals = SignalSet::new(SignalDirection::Output);

        let cc = apply(&mut signals, [0xB5, 7, 100]);
        assert_eq!(cc.updates[0], SignalUpdate::set("/channel.6/control_change", &[7, 100]));

        let program = apply(&mut signals, [0xC5, 12, 0]);
        assert_eq!(program.updates[0], SignalUpdate::set("/channel.6/program_change", &[12]));

        let pressure = apply(&mut signals, [0xD5, 33, 0]);
        assert_eq!(
            pressure.updates[0],
            SignalUpdate::set("/channel.6/channel_pressure", &[33])
        );
    }
}
