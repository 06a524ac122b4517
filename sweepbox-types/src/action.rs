//! The typed command surface: requests, replies, and dispatch errors.
//!
//! The wire grammar (text lines) lives in `sweepbox-net`; this module is the
//! vocabulary both sides share. Each request maps 1:1 onto a state mutation
//! or query and resolves synchronously.

use std::fmt;

use crate::fx::FxParam;
use crate::led::{LedCfgField, LedMode, LedTarget};

/// Direction change requested by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionCmd {
    Up,
    Down,
    Toggle,
}

/// Sound library folders addressable from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundFolder {
    Announcements,
    Startup,
    RemPod,
    MusicBox,
}

impl SoundFolder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "announcements" => Some(SoundFolder::Announcements),
            "startup" => Some(SoundFolder::Startup),
            "rempod" => Some(SoundFolder::RemPod),
            "musicbox" => Some(SoundFolder::MusicBox),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FxRequest {
    Status,
    Enable,
    Disable,
    Set(FxParam, i32),
    PresetList,
    PresetInfo(String),
    PresetStatus,
    PresetSet(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SoundRequest {
    Status,
    List(Option<SoundFolder>),
    Play(Option<String>),
    Set(String),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixerRequest {
    Status,
    SpeakerVolume(i32),
    CaptureLevel(i32),
    AutoGain(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemPodRequest {
    Status,
    Arm,
    Disarm,
    Sensitivity(i32),
    Sound(String),
    TempAlerts(bool),
    Simulate { on: bool, interval_secs: Option<f32> },
    Trigger,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MusicBoxRequest {
    Status,
    Start,
    Stop,
    Sound(String),
    Range(f32),
    Simulate { on: bool, interval_secs: Option<f32> },
    Trigger,
}

/// A parsed remote command.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Status,
    Ping,
    Start,
    Stop,
    Speed(u64),
    Faster,
    Slower,
    Direction(DirectionCmd),
    Led { target: LedTarget, mode: LedMode },
    SweepCfg(LedCfgField, i32),
    BoxCfg(LedCfgField, i32),
    Fx(FxRequest),
    Sound(SoundRequest),
    /// Direct one-off tune, outside the sweep loop.
    Tune(f64),
    DeviceStatus,
    DeviceSet(String),
    Mixer(MixerRequest),
    Mute(bool),
    RemPod(RemPodRequest),
    MusicBox(MusicBoxRequest),
}

/// A successful command outcome. `Line` carries a single-line payload
/// (often JSON) appended after the OK marker on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ack,
    Line(String),
}

impl Reply {
    pub fn line(s: impl Into<String>) -> Self {
        Reply::Line(s.into())
    }
}

/// Why a command was refused. Only validation and persistence failures are
/// ever surfaced here; pipeline and process health stay internal.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Malformed or unknown request.
    Invalid(String),
    /// A value fell outside its allowed range.
    OutOfRange {
        what: &'static str,
        min: i32,
        max: i32,
    },
    /// A referenced file or name does not exist.
    NotFound(String),
    /// Persisting the mutation failed; the in-memory value was rolled back.
    Persist(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Invalid(msg) => write!(f, "{}", msg),
            CommandError::OutOfRange { what, min, max } => {
                write!(f, "{} range {}-{}", what, min, max)
            }
            CommandError::NotFound(what) => write!(f, "{} not found", what),
            CommandError::Persist(msg) => write!(f, "could not save config: {}", msg),
        }
    }
}

impl std::error::Error for CommandError {}
