//! End-to-end tests through the umbrella crate.
//!
//! Run with:
//! ```bash
//! cargo test -p midimap --test bridge_integration
//! ```

use midimap::prelude::*;
use midimap::{channel_signals, Error, InstanceId, SignalKind};

fn studio(config: MidimapConfig) -> (Midimap, VirtualBackend) {
    let backend = VirtualBackend::new();
    backend.add_input("Keystation 61");
    backend.add_input("Drum Pads");
    backend.add_output("Synth");

    let midimap = Midimap::builder()
        .config(config)
        .backend(backend.clone())
        .discover()
        .build()
        .expect("Failed to build midimap");
    (midimap, backend)
}

#[test]
fn test_every_channel_exposes_seven_signals() {
    let signals = channel_signals(SignalDirection::Output);
    assert_eq!(signals.len(), 16 * 7);
    assert_eq!(signals[0].path, "/channel.1/note/pitch");
    assert_eq!(signals.last().unwrap().path, "/channel.16/channel_pressure");

    let instanced: Vec<_> = signals
        .iter()
        .filter(|s| s.instances.is_some())
        .map(|s| s.key.kind)
        .take(3)
        .collect();
    assert_eq!(
        instanced,
        vec![SignalKind::Pitch, SignalKind::Velocity, SignalKind::Aftertouch]
    );
}

#[test]
fn test_channel_remap_route() {
    // Drums arrive on channel 10 and are played on channel 1 of the synth.
    let config = MidimapConfig {
        routes: vec![Route::new("/DrumPads.1/channel.10", "/Synth.1/channel.1")],
        ..Default::default()
    };
    let (mut midimap, backend) = studio(config);

    backend.send("Drum Pads", &[0x99, 38, 110]);
    backend.send("Keystation 61", &[0x90, 60, 100]); // not routed
    let stats = midimap.poll_once();

    assert_eq!(stats.midi_in, 2);
    assert_eq!(backend.take_sent("Synth"), vec![vec![0x90, 38, 110]]);
}

#[test]
fn test_two_keyboards_share_one_synth() {
    let config = MidimapConfig {
        routes: vec![
            Route::new("/Keystation61.1", "/Synth.1"),
            Route::new("/DrumPads.1", "/Synth.1"),
        ],
        ..Default::default()
    };
    let (mut midimap, backend) = studio(config);

    backend.send("Keystation 61", &[0xB0, 1, 64]);
    backend.send("Drum Pads", &[0xB0, 1, 32]);
    midimap.poll_once();

    // Inputs are processed in discovery order
    assert_eq!(
        backend.take_sent("Synth"),
        vec![vec![0xB0, 1, 64], vec![0xB0, 1, 32]]
    );
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("midimap-test-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "note_off_on_release = true\n\n[[routes]]\nfrom = \"/Keystation61.1\"\nto = \"/Synth.1\"\n",
    )
    .unwrap();
    let config = MidimapConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let (mut midimap, backend) = studio(config);
    backend.send("Keystation 61", &[0x90, 72, 64]);
    backend.send("Keystation 61", &[0x80, 72, 64]);
    midimap.poll_once();

    assert_eq!(
        backend.take_sent("Synth"),
        vec![vec![0x90, 72, 64], vec![0x90, 72, 0]]
    );
}

#[test]
fn test_network_monitor_sees_note_instances() {
    let network = LocalNetwork::new();
    let monitor = network.monitor();
    let backend = VirtualBackend::new();
    backend.add_input("Keys");

    let mut midimap = Midimap::builder()
        .backend(backend.clone())
        .network(network)
        .discover()
        .build()
        .unwrap();

    backend.send("Keys", &[0x90, 60, 100]);
    backend.send("Keys", &[0x90, 64, 100]);
    midimap.poll_once();

    let instances: Vec<_> = monitor
        .try_iter()
        .filter(|(path, _)| path.ends_with("/note/velocity"))
        .map(|(_, update)| update.instance)
        .collect();
    assert_eq!(
        instances,
        vec![Some(InstanceId::from_note(60)), Some(InstanceId::from_note(64))]
    );
}

#[test]
fn test_errors_convert_into_umbrella_error() {
    let err: Error = midimap::MidimapConfig::from_toml_str("queue_capacity = 0")
        .unwrap_err()
        .into();
    assert!(matches!(err, Error::Midi(_)));
    assert!(err.to_string().starts_with("MIDI: "));
}
