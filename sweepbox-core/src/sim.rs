//! Simulation triggers for the companion prop modes.
//!
//! Each mode is a worker loop that, while armed and simulating, fires a
//! trigger on its interval: an RGB flourish plus a one-shot clip. Clips go
//! through the playback path like every other one-shot, so a trigger firing
//! mid-sweep pre-empts and restores the continuous pipeline the same way a
//! remote play request does.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};

use sweepbox_audio::PlaybackPath;
use sweepbox_types::RemPodTrigger;

use crate::led::LedHandle;
use crate::state::SharedState;

const IDLE_POLL: Duration = Duration::from_secs(1);
/// How long the motion indicator stays lit after a music-box trigger.
const MUSICBOX_GLOW: Duration = Duration::from_secs(3);

/// Fire one rem-pod alert: LED flourish, then the alert clip.
pub fn trigger_rempod(
    state: &SharedState,
    playback: &PlaybackPath,
    leds: &LedHandle,
    kind: RemPodTrigger,
) {
    let (armed, sound) = {
        let guard = state.rempod();
        (guard.armed, guard.alert_sound.clone())
    };
    if !armed {
        return;
    }

    info!(target: "rempod", "trigger: {:?}", kind);
    match kind {
        RemPodTrigger::TempHot => flash_series(leds, (1.0, 0.0, 0.0), 3),
        RemPodTrigger::TempCold => flash_series(leds, (0.0, 0.0, 1.0), 3),
        RemPodTrigger::Field => {
            for colour in [
                (1.0, 0.0, 0.0),
                (0.0, 1.0, 0.0),
                (0.0, 0.0, 1.0),
                (1.0, 1.0, 0.0),
            ] {
                leds.flash_rgb(colour.0, colour.1, colour.2, Duration::from_millis(100));
                thread::sleep(Duration::from_millis(100));
            }
        }
    }
    leds.rgb_off();

    if !sound.is_empty() {
        if let Err(e) = playback.play(&sound, None) {
            warn!(target: "rempod", "alert sound failed: {}", e);
        }
    }
}

/// Fire one music-box trigger: glow green and play the clip.
pub fn trigger_musicbox(state: &SharedState, playback: &PlaybackPath, leds: &LedHandle) {
    let (ready, sound) = {
        let guard = state.musicbox();
        (guard.active && guard.calibrated, guard.trigger_sound.clone())
    };
    if !ready {
        return;
    }

    info!(target: "musicbox", "motion trigger");
    leds.flash_rgb(0.0, 1.0, 0.0, MUSICBOX_GLOW);
    if !sound.is_empty() {
        if let Err(e) = playback.play(&sound, None) {
            warn!(target: "musicbox", "trigger sound failed: {}", e);
        }
    }
    leds.rgb_off();
}

/// Startup calibration: flash cyan, then mark the box calibrated.
pub fn calibrate_musicbox(state: &SharedState, leds: &LedHandle) {
    debug!(target: "musicbox", "calibrating");
    flash_series(leds, (0.0, 1.0, 1.0), 3);
    state.musicbox().calibrated = true;
    debug!(target: "musicbox", "calibration complete");
}

fn flash_series(leds: &LedHandle, (r, g, b): (f32, f32, f32), count: u32) {
    for _ in 0..count {
        leds.flash_rgb(r, g, b, Duration::from_millis(150));
        thread::sleep(Duration::from_millis(250));
    }
}

fn lcg_unit(seed: &mut u64) -> f32 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    ((*seed >> 40) & 0xFFFFFF) as f32 / 0xFFFFFF as f32
}

/// Rem-pod auto-trigger loop.
pub fn run_rempod(
    state: Arc<SharedState>,
    playback: Arc<PlaybackPath>,
    leds: LedHandle,
    shutdown: Receiver<()>,
) {
    info!(target: "rempod", "simulation loop started");
    let mut seed: u64 = 0x9e3779b97f4a7c15;
    loop {
        let (simulating, armed, interval, temp_alerts) = {
            let guard = state.rempod();
            (
                guard.simulating,
                guard.armed,
                guard.interval_secs,
                guard.temp_alerts,
            )
        };

        if !(simulating && armed) {
            if !sleep_or_shutdown(&shutdown, IDLE_POLL) {
                break;
            }
            continue;
        }

        let kind = if temp_alerts {
            match (lcg_unit(&mut seed) * 3.0) as u32 {
                0 => RemPodTrigger::TempHot,
                1 => RemPodTrigger::TempCold,
                _ => RemPodTrigger::Field,
            }
        } else {
            RemPodTrigger::Field
        };
        trigger_rempod(&state, &playback, &leds, kind);

        if !sleep_or_shutdown(&shutdown, Duration::from_secs_f32(interval.max(0.5))) {
            break;
        }
    }
}

/// Music-box auto-trigger loop; the interval is jittered so the "motion"
/// doesn't land on a metronome.
pub fn run_musicbox(
    state: Arc<SharedState>,
    playback: Arc<PlaybackPath>,
    leds: LedHandle,
    shutdown: Receiver<()>,
) {
    info!(target: "musicbox", "simulation loop started");
    let mut seed: u64 = 0x2545f4914f6cdd1d;
    loop {
        let (simulating, active, interval) = {
            let guard = state.musicbox();
            (guard.simulating, guard.active, guard.interval_secs)
        };

        if !(simulating && active) {
            if !sleep_or_shutdown(&shutdown, IDLE_POLL) {
                break;
            }
            continue;
        }

        let jitter = 0.5 + lcg_unit(&mut seed);
        let delay = Duration::from_secs_f32((interval * jitter).max(0.5));
        if !sleep_or_shutdown(&shutdown, delay) {
            break;
        }
        trigger_musicbox(&state, &playback, &leds);
    }
}

fn sleep_or_shutdown(shutdown: &Receiver<()>, duration: Duration) -> bool {
    match shutdown.recv_timeout(duration) {
        Err(RecvTimeoutError::Timeout) => true,
        Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
    }
}
