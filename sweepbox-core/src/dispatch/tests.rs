use std::io;
use std::sync::Arc;

use sweepbox_audio::arbiter::Arbiter;
use sweepbox_audio::{Mixer, PlaybackPath};
use sweepbox_types::{
    CommandError, Direction, DirectionCmd, FxParam, FxRequest, LedCfgField, LedMode, LedTarget,
    Reply, Request, SoundRequest,
};

use crate::led::{LedDriver, LogSink};
use crate::paths::BoxPaths;
use crate::state::SharedState;
use crate::tuner::{Tuner, TunerBus};
use sweepbox_audio::arbiter::ControlState;

use super::Dispatcher;

struct DeadBus;

impl TunerBus for DeadBus {
    fn write(&mut self, _bytes: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "no bus"))
    }
    fn read_status(&mut self) -> io::Result<[u8; 5]> {
        Err(io::Error::new(io::ErrorKind::Other, "no bus"))
    }
}

fn test_dispatcher() -> (tempfile::TempDir, Arc<SharedState>, Dispatcher) {
    let dir = tempfile::tempdir().unwrap();
    let paths = BoxPaths::at(dir.path().join("config"), dir.path().join("sounds"));
    paths.ensure_dirs().unwrap();
    let state = Arc::new(SharedState::load(paths.clone()));

    // Idle arbiter: the handle works without its loop running.
    let arbiter = Arbiter::with_builders(
        state.clone(),
        Box::new(|_| vec!["true".into()]),
        Box::new(|_| vec!["true".into()]),
    );
    let handle = arbiter.handle();
    let playback = Arc::new(PlaybackPath::new(handle.clone(), paths.search_dirs()));
    let leds = LedDriver::new(state.clone(), Box::new(LogSink)).handle();
    let tuner = Arc::new(Tuner::new(Box::new(DeadBus)));

    let dispatcher = Dispatcher::new(state.clone(), playback, handle, Mixer::new(3), leds, tuner);
    (dir, state, dispatcher)
}

fn line(reply: Reply) -> String {
    match reply {
        Reply::Line(s) => s,
        Reply::Ack => String::new(),
    }
}

#[test]
fn start_stop_flip_the_running_flag() {
    let (_dir, state, dispatcher) = test_dispatcher();

    dispatcher.handle(Request::Start).unwrap();
    assert!(state.sweep().running);

    dispatcher.handle(Request::Stop).unwrap();
    assert!(!state.sweep().running);
}

#[test]
fn speed_snaps_to_the_table() {
    let (_dir, state, dispatcher) = test_dispatcher();
    let reply = dispatcher.handle(Request::Speed(160)).unwrap();
    assert_eq!(line(reply), "SPEED 150");
    assert_eq!(state.sweep().speed_index, 2);

    let reply = dispatcher.handle(Request::Faster).unwrap();
    assert_eq!(line(reply), "SPEED 100");
    // Clamped at the fast end.
    dispatcher.handle(Request::Faster).unwrap();
    let reply = dispatcher.handle(Request::Faster).unwrap();
    assert_eq!(line(reply), "SPEED 50");
}

#[test]
fn direction_toggle_reverses() {
    let (_dir, state, dispatcher) = test_dispatcher();
    dispatcher
        .handle(Request::Direction(DirectionCmd::Down))
        .unwrap();
    assert_eq!(state.sweep().direction, Direction::Down);
    dispatcher
        .handle(Request::Direction(DirectionCmd::Toggle))
        .unwrap();
    assert_eq!(state.sweep().direction, Direction::Up);
}

#[test]
fn fx_set_validates_then_flags_restart() {
    let (_dir, state, dispatcher) = test_dispatcher();

    let err = dispatcher
        .handle(Request::Fx(FxRequest::Set(FxParam::BpLow, 99)))
        .unwrap_err();
    assert!(matches!(err, CommandError::OutOfRange { .. }));
    assert!(!state.take_restart_flag(), "rejected edit must not flag");

    dispatcher
        .handle(Request::Fx(FxRequest::Set(FxParam::BpLow, 450)))
        .unwrap();
    assert_eq!(state.fx().bp_low, 450);
    assert_eq!(state.fx().preset, "CUSTOM");
    assert!(state.take_restart_flag());
}

#[test]
fn fx_preset_set_applies_and_flags() {
    let (_dir, state, dispatcher) = test_dispatcher();
    let reply = dispatcher
        .handle(Request::Fx(FxRequest::PresetSet("deep_voice".into())))
        .unwrap();
    assert_eq!(line(reply), "FX PRESET DEEP_VOICE");
    assert_eq!(state.fx().bp_low, 400);
    assert!(state.take_restart_flag());

    let err = dispatcher
        .handle(Request::Fx(FxRequest::PresetSet("NOPE".into())))
        .unwrap_err();
    assert!(matches!(err, CommandError::NotFound(_)));
}

#[test]
fn device_change_flags_a_rebuild() {
    let (_dir, state, dispatcher) = test_dispatcher();
    let reply = dispatcher
        .handle(Request::DeviceSet("bt-sink-1".into()))
        .unwrap();
    assert_eq!(line(reply), "DEVICE bt-sink-1");
    assert_eq!(state.route().current_device, "bt-sink-1");
    assert!(state.take_restart_flag());
}

#[test]
fn led_modes_and_all_off() {
    let (_dir, state, dispatcher) = test_dispatcher();
    dispatcher
        .handle(Request::Led {
            target: LedTarget::Box,
            mode: LedMode::Breath,
        })
        .unwrap();
    assert_eq!(state.sweep().box_led_mode, LedMode::Breath);

    let err = dispatcher
        .handle(Request::Led {
            target: LedTarget::All,
            mode: LedMode::Strobe,
        })
        .unwrap_err();
    assert!(matches!(err, CommandError::Invalid(_)));

    dispatcher
        .handle(Request::Led {
            target: LedTarget::All,
            mode: LedMode::Off,
        })
        .unwrap();
    assert_eq!(state.sweep().sweep_led_mode, LedMode::Off);
    assert_eq!(state.sweep().box_led_mode, LedMode::Off);
}

#[test]
fn led_window_validation_rejects_crossed_bounds() {
    let (_dir, state, dispatcher) = test_dispatcher();
    dispatcher
        .handle(Request::BoxCfg(LedCfgField::Min, 200))
        .unwrap();
    let err = dispatcher
        .handle(Request::BoxCfg(LedCfgField::Max, 100))
        .unwrap_err();
    assert!(matches!(err, CommandError::Invalid(_)));
    assert_eq!(state.led().box_max_brightness, 255);
}

#[test]
fn sound_set_requires_an_existing_clip() {
    let (dir, state, dispatcher) = test_dispatcher();

    let err = dispatcher
        .handle(Request::Sound(SoundRequest::Set("ghost.wav".into())))
        .unwrap_err();
    assert!(matches!(err, CommandError::NotFound(_)));

    let sounds = dir.path().join("sounds");
    std::fs::write(sounds.join("ghost.wav"), b"").unwrap();
    dispatcher
        .handle(Request::Sound(SoundRequest::Set("ghost.wav".into())))
        .unwrap();
    assert_eq!(state.sweep().startup_sound, "ghost.wav");

    dispatcher.handle(Request::Sound(SoundRequest::Clear)).unwrap();
    assert!(state.sweep().startup_sound.is_empty());
}

#[test]
fn tune_validates_band_and_reports_dead_bus() {
    let (_dir, _state, dispatcher) = test_dispatcher();
    let err = dispatcher.handle(Request::Tune(120.0)).unwrap_err();
    assert!(matches!(err, CommandError::Invalid(_)));

    // In range but the bus is dead: surfaced as a failure, not a panic.
    let err = dispatcher.handle(Request::Tune(100.0)).unwrap_err();
    assert!(matches!(err, CommandError::Invalid(_)));
}

#[test]
fn status_reports_the_live_records() {
    let (_dir, state, dispatcher) = test_dispatcher();
    state.sweep().running = true;
    let payload = line(dispatcher.handle(Request::Status).unwrap());
    let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(parsed["running"], true);
    assert_eq!(parsed["speed_ms"], 150);
    assert_eq!(parsed["device"], "plughw:3,0");
}
