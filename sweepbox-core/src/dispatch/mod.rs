//! Command dispatch: one typed request in, one synchronous result out.
//!
//! Every request maps 1:1 onto a state mutation or query. Validation happens
//! before any mutation; persisted mutations roll back on save failure. The
//! continuous pipelines are never driven from here: FX, device, and resume
//! changes only raise the restart flag the arbiter consumes on its tick.

use std::sync::Arc;
use std::thread;

use log::debug;
use serde_json::json;

use sweepbox_audio::{ArbiterHandle, ControlState, Mixer, PipelineKind, PlaybackPath};
use sweepbox_types::{
    closest_speed_index, CommandError, Direction, DirectionCmd, FxRequest, LedTarget,
    MixerRequest, MusicBoxRequest, RemPodRequest, RemPodTrigger, Reply, Request, SoundRequest,
    FX_PRESETS,
};

use crate::led::LedHandle;
use crate::library::SoundLibrary;
use crate::sim;
use crate::state::SharedState;
use crate::tuner::Tuner;

/// Frequencies a direct tune accepts, in MHz.
const TUNE_RANGE: (f64, f64) = (76.0, 108.0);
const MUSICBOX_RANGE_M: (f32, f32) = (1.0, 5.0);

pub struct Dispatcher {
    state: Arc<SharedState>,
    playback: Arc<PlaybackPath>,
    arbiter: ArbiterHandle,
    mixer: Mixer,
    leds: LedHandle,
    library: SoundLibrary,
    tuner: Arc<Tuner>,
}

impl Dispatcher {
    pub fn new(
        state: Arc<SharedState>,
        playback: Arc<PlaybackPath>,
        arbiter: ArbiterHandle,
        mixer: Mixer,
        leds: LedHandle,
        tuner: Arc<Tuner>,
    ) -> Self {
        let library = SoundLibrary::new(state.paths().clone());
        Self {
            state,
            playback,
            arbiter,
            mixer,
            leds,
            library,
            tuner,
        }
    }

    pub fn handle(&self, request: Request) -> Result<Reply, CommandError> {
        debug!(target: "dispatch", "{:?}", request);
        match request {
            Request::Status => self.status(),
            Request::Ping => self.ping(),
            Request::Start => {
                self.state.update_sweep(|s| {
                    s.running = true;
                    Ok(())
                })?;
                Ok(Reply::line("START"))
            }
            Request::Stop => {
                self.state.update_sweep(|s| {
                    s.running = false;
                    Ok(())
                })?;
                Ok(Reply::line("STOP"))
            }
            Request::Speed(ms) => {
                let actual = self.state.update_sweep(|s| {
                    s.speed_index = closest_speed_index(ms);
                    Ok(s.speed_ms())
                })?;
                Ok(Reply::Line(format!("SPEED {actual}")))
            }
            Request::Faster => {
                let ms = self.state.update_sweep(|s| {
                    s.speed_index = s.speed_index.saturating_sub(1);
                    Ok(s.speed_ms())
                })?;
                Ok(Reply::Line(format!("SPEED {ms}")))
            }
            Request::Slower => {
                let ms = self.state.update_sweep(|s| {
                    s.speed_index = (s.speed_index + 1).min(sweepbox_types::SWEEP_SPEEDS_MS.len() - 1);
                    Ok(s.speed_ms())
                })?;
                Ok(Reply::Line(format!("SPEED {ms}")))
            }
            Request::Direction(cmd) => {
                let direction = self.state.update_sweep(|s| {
                    s.direction = match cmd {
                        DirectionCmd::Up => Direction::Up,
                        DirectionCmd::Down => Direction::Down,
                        DirectionCmd::Toggle => s.direction.reversed(),
                    };
                    Ok(s.direction)
                })?;
                Ok(Reply::Line(format!(
                    "DIR {}",
                    direction.to_string().to_uppercase()
                )))
            }
            Request::Led { target, mode } => {
                self.state.update_sweep(|s| {
                    match target {
                        LedTarget::Sweep => s.sweep_led_mode = mode,
                        LedTarget::Box => s.box_led_mode = mode,
                        LedTarget::All => {
                            if mode != sweepbox_types::LedMode::Off {
                                return Err(CommandError::Invalid(
                                    "LED ALL supports only off".into(),
                                ));
                            }
                            s.sweep_led_mode = mode;
                            s.box_led_mode = mode;
                        }
                    }
                    Ok(())
                })?;
                let target_name = match target {
                    LedTarget::Sweep => "SWEEP",
                    LedTarget::Box => "BOX",
                    LedTarget::All => "ALL",
                };
                Ok(Reply::Line(format!("LED {target_name} {}", mode.name())))
            }
            Request::SweepCfg(field, value) => {
                self.state.update_led(|led| led.set_sweep(field, value))?;
                Ok(Reply::Ack)
            }
            Request::BoxCfg(field, value) => {
                self.state.update_led(|led| led.set_box(field, value))?;
                Ok(Reply::Ack)
            }
            Request::Fx(fx) => self.handle_fx(fx),
            Request::Sound(sound) => self.handle_sound(sound),
            Request::Tune(freq) => {
                if !(TUNE_RANGE.0..=TUNE_RANGE.1).contains(&freq) {
                    return Err(CommandError::Invalid(format!(
                        "frequency range {}-{} MHz",
                        TUNE_RANGE.0, TUNE_RANGE.1
                    )));
                }
                if self.tuner.tune(freq) {
                    Ok(Reply::Line(format!("FM TUNE {freq}")))
                } else {
                    Err(CommandError::Invalid("tuner not available".into()))
                }
            }
            Request::DeviceStatus => {
                let route = self.state.route().clone();
                Ok(Reply::Line(format!(
                    "DEVICE {}",
                    serde_json::to_string(&route).unwrap_or_default()
                )))
            }
            Request::DeviceSet(device) => {
                if device.is_empty() {
                    return Err(CommandError::Invalid("DEVICE SET needs a device".into()));
                }
                self.state.update_route(|route| {
                    route.current_device = device.clone();
                    Ok(())
                })?;
                // Running pipelines are bound to the old device; rebuild.
                self.state.flag_restart();
                Ok(Reply::Line(format!("DEVICE {device}")))
            }
            Request::Mixer(req) => self.handle_mixer(req),
            Request::Mute(muted) => {
                self.mixer
                    .set_speaker_mute(muted)
                    .map_err(|_| CommandError::Invalid("mute set failed".into()))?;
                Ok(Reply::Line(format!("MUTE {}", on_off(muted))))
            }
            Request::RemPod(req) => self.handle_rempod(req),
            Request::MusicBox(req) => self.handle_musicbox(req),
        }
    }

    fn status(&self) -> Result<Reply, CommandError> {
        let sweep = self.state.sweep().clone();
        let fx_enabled = self.state.fx().enabled;
        let device = self.state.route().current_device.clone();
        let led = self.state.led().clone();
        // Mixer state is best-effort; a missing mixer must not break STATUS.
        let muted = self.mixer.status().ok().map(|m| !m.speaker_on);
        let pipeline = match self.arbiter.current_kind() {
            Some(PipelineKind::Effects) => Some("effects"),
            Some(PipelineKind::Passthrough) => Some("passthrough"),
            None => None,
        };

        let payload = json!({
            "pipeline": pipeline,
            "speed_ms": sweep.speed_ms(),
            "direction": sweep.direction,
            "running": sweep.running,
            "sweep_led_mode": sweep.sweep_led_mode,
            "box_led_mode": sweep.box_led_mode,
            "startup_sound": sweep.startup_sound,
            "fx_enabled": fx_enabled,
            "device": device,
            "sweep_led": { "min": led.sweep_min_brightness, "max": led.sweep_max_brightness, "speed": led.sweep_speed },
            "box_led": { "min": led.box_min_brightness, "max": led.box_max_brightness, "speed": led.box_speed },
            "muted": muted,
        });
        Ok(Reply::Line(payload.to_string()))
    }

    fn ping(&self) -> Result<Reply, CommandError> {
        let sweep = self.state.sweep().clone();
        let payload = json!({
            "ok": true,
            "speed_ms": sweep.speed_ms(),
            "direction": sweep.direction,
            "running": sweep.running,
        });
        Ok(Reply::Line(payload.to_string()))
    }

    fn handle_fx(&self, request: FxRequest) -> Result<Reply, CommandError> {
        match request {
            FxRequest::Status | FxRequest::PresetStatus => {
                let fx = self.state.fx().clone();
                Ok(Reply::Line(
                    serde_json::to_string(&fx).unwrap_or_default(),
                ))
            }
            FxRequest::Enable => {
                self.state.update_fx(|fx| {
                    fx.enabled = true;
                    Ok(())
                })?;
                self.state.flag_restart();
                Ok(Reply::line("FX ENABLED"))
            }
            FxRequest::Disable => {
                self.state.update_fx(|fx| {
                    fx.enabled = false;
                    Ok(())
                })?;
                self.state.flag_restart();
                Ok(Reply::line("FX DISABLED"))
            }
            FxRequest::Set(param, value) => {
                self.state.update_fx(|fx| fx.set(param, value))?;
                self.state.flag_restart();
                Ok(Reply::Line(format!("FX SET {} {}", param.name(), value)))
            }
            FxRequest::PresetList => {
                let list: Vec<_> = FX_PRESETS
                    .iter()
                    .map(|p| {
                        json!({
                            "name": p.name,
                            "category": p.category,
                            "description": p.description,
                        })
                    })
                    .collect();
                Ok(Reply::Line(json!(list).to_string()))
            }
            FxRequest::PresetInfo(name) => {
                let preset = sweepbox_types::find_preset(&name)
                    .ok_or_else(|| CommandError::NotFound(format!("preset {name}")))?;
                Ok(Reply::Line(
                    serde_json::to_string(preset).unwrap_or_default(),
                ))
            }
            FxRequest::PresetSet(name) => {
                let applied = self.state.update_fx(|fx| {
                    if fx.apply_preset(&name) {
                        Ok(fx.preset.clone())
                    } else {
                        Err(CommandError::NotFound(format!("preset {name}")))
                    }
                })?;
                self.state.flag_restart();
                Ok(Reply::Line(format!("FX PRESET {applied}")))
            }
        }
    }

    fn handle_sound(&self, request: SoundRequest) -> Result<Reply, CommandError> {
        match request {
            SoundRequest::Status => {
                let name = self.state.sweep().startup_sound.clone();
                let payload = json!({
                    "startup_sound": name,
                    "startup_exists": !name.is_empty() && self.library.exists(&name),
                });
                Ok(Reply::Line(payload.to_string()))
            }
            SoundRequest::List(folder) => {
                Ok(Reply::Line(json!(self.library.list(folder)).to_string()))
            }
            SoundRequest::Play(name) => {
                let name = match name {
                    Some(n) => n,
                    None => self.state.sweep().startup_sound.clone(),
                };
                if name.is_empty() {
                    return Err(CommandError::Invalid("no sound configured".into()));
                }
                if !self.library.exists(&name) {
                    return Err(CommandError::NotFound(name));
                }
                self.playback
                    .play(&name, None)
                    .map_err(CommandError::Invalid)?;
                Ok(Reply::line("SOUND PLAY"))
            }
            SoundRequest::Set(name) => {
                if !self.library.exists(&name) {
                    return Err(CommandError::NotFound(name));
                }
                self.state.update_sweep(|s| {
                    s.startup_sound = name.clone();
                    Ok(())
                })?;
                Ok(Reply::Line(format!("SOUND SET {name}")))
            }
            SoundRequest::Clear => {
                self.state.update_sweep(|s| {
                    s.startup_sound.clear();
                    Ok(())
                })?;
                Ok(Reply::line("SOUND CLEAR"))
            }
        }
    }

    fn handle_mixer(&self, request: MixerRequest) -> Result<Reply, CommandError> {
        let apply_failed = |_| CommandError::Invalid("mixer set failed".into());
        match request {
            MixerRequest::Status => {
                let status = self
                    .mixer
                    .status()
                    .map_err(|_| CommandError::Invalid("mixer status failed".into()))?;
                Ok(Reply::Line(
                    serde_json::to_string(&status).unwrap_or_default(),
                ))
            }
            MixerRequest::SpeakerVolume(level) => {
                check_range("volume", level, 0, sweepbox_audio::mixer::SPEAKER_VOLUME_MAX)?;
                self.mixer.set_speaker_volume(level).map_err(apply_failed)?;
                Ok(Reply::line("MIXER SET SPEAKER_VOL"))
            }
            MixerRequest::CaptureLevel(level) => {
                check_range("volume", level, 0, sweepbox_audio::mixer::CAPTURE_LEVEL_MAX)?;
                self.mixer.set_capture_level(level).map_err(apply_failed)?;
                Ok(Reply::line("MIXER SET MIC_VOL"))
            }
            MixerRequest::AutoGain(enabled) => {
                self.mixer.set_auto_gain(enabled).map_err(apply_failed)?;
                Ok(Reply::line("MIXER SET AUTO_GAIN"))
            }
        }
    }

    fn handle_rempod(&self, request: RemPodRequest) -> Result<Reply, CommandError> {
        match request {
            RemPodRequest::Status => {
                let rempod = self.state.rempod().clone();
                Ok(Reply::Line(
                    serde_json::to_string(&rempod).unwrap_or_default(),
                ))
            }
            RemPodRequest::Arm => {
                self.state.rempod().armed = true;
                Ok(Reply::line("REMPOD ARMED"))
            }
            RemPodRequest::Disarm => {
                self.state.rempod().armed = false;
                self.leds.rgb_off();
                Ok(Reply::line("REMPOD DISARMED"))
            }
            RemPodRequest::Sensitivity(level) => {
                let (min, max) = sweepbox_types::sim::SENSITIVITY_RANGE;
                check_range("sensitivity", level, min, max)?;
                self.state.rempod().sensitivity = level;
                Ok(Reply::Line(format!("REMPOD SENSITIVITY {level}")))
            }
            RemPodRequest::Sound(name) => {
                self.state.rempod().alert_sound = name.clone();
                Ok(Reply::Line(format!("REMPOD SOUND {name}")))
            }
            RemPodRequest::TempAlerts(on) => {
                self.state.rempod().temp_alerts = on;
                Ok(Reply::Line(format!("REMPOD TEMP {}", on_off(on))))
            }
            RemPodRequest::Simulate { on, interval_secs } => {
                {
                    let mut rempod = self.state.rempod();
                    rempod.simulating = on;
                    if let Some(secs) = interval_secs {
                        rempod.interval_secs = secs;
                    }
                }
                Ok(Reply::Line(format!(
                    "REMPOD SIMULATE {}",
                    if on { "STARTED" } else { "STOPPED" }
                )))
            }
            RemPodRequest::Trigger => {
                // Flourish and clip run off-thread; the reply must not wait
                // for a sound to finish.
                let state = Arc::clone(&self.state);
                let playback = Arc::clone(&self.playback);
                let leds = self.leds.clone();
                thread::spawn(move || {
                    sim::trigger_rempod(&state, &playback, &leds, RemPodTrigger::Field);
                });
                Ok(Reply::line("REMPOD TRIGGER"))
            }
        }
    }

    fn handle_musicbox(&self, request: MusicBoxRequest) -> Result<Reply, CommandError> {
        match request {
            MusicBoxRequest::Status => {
                let musicbox = self.state.musicbox().clone();
                Ok(Reply::Line(
                    serde_json::to_string(&musicbox).unwrap_or_default(),
                ))
            }
            MusicBoxRequest::Start => {
                {
                    let mut musicbox = self.state.musicbox();
                    musicbox.active = true;
                    musicbox.calibrated = false;
                }
                let state = Arc::clone(&self.state);
                let leds = self.leds.clone();
                thread::spawn(move || sim::calibrate_musicbox(&state, &leds));
                Ok(Reply::line("MUSICBOX STARTED"))
            }
            MusicBoxRequest::Stop => {
                {
                    let mut musicbox = self.state.musicbox();
                    musicbox.active = false;
                    musicbox.calibrated = false;
                }
                self.leds.rgb_off();
                Ok(Reply::line("MUSICBOX STOPPED"))
            }
            MusicBoxRequest::Sound(name) => {
                self.state.musicbox().trigger_sound = name.clone();
                Ok(Reply::Line(format!("MUSICBOX SOUND {name}")))
            }
            MusicBoxRequest::Range(meters) => {
                if !(MUSICBOX_RANGE_M.0..=MUSICBOX_RANGE_M.1).contains(&meters) {
                    return Err(CommandError::Invalid(format!(
                        "RANGE {}-{} meters",
                        MUSICBOX_RANGE_M.0, MUSICBOX_RANGE_M.1
                    )));
                }
                self.state.musicbox().detection_range_m = meters;
                Ok(Reply::Line(format!("MUSICBOX RANGE {meters}")))
            }
            MusicBoxRequest::Simulate { on, interval_secs } => {
                {
                    let mut musicbox = self.state.musicbox();
                    musicbox.simulating = on;
                    if let Some(secs) = interval_secs {
                        musicbox.interval_secs = secs;
                    }
                }
                Ok(Reply::Line(format!(
                    "MUSICBOX SIMULATE {}",
                    if on { "STARTED" } else { "STOPPED" }
                )))
            }
            MusicBoxRequest::Trigger => {
                let state = Arc::clone(&self.state);
                let playback = Arc::clone(&self.playback);
                let leds = self.leds.clone();
                thread::spawn(move || sim::trigger_musicbox(&state, &playback, &leds));
                Ok(Reply::line("MUSICBOX TRIGGER"))
            }
        }
    }
}

fn check_range(what: &'static str, value: i32, min: i32, max: i32) -> Result<(), CommandError> {
    if value < min || value > max {
        return Err(CommandError::OutOfRange { what, min, max });
    }
    Ok(())
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

#[cfg(test)]
mod tests;
