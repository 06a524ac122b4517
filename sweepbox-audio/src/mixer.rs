//! ALSA mixer control for the receiver sound card, via `amixer`.
//!
//! The card exposes fixed control ids: 5 = speaker switch, 6 = speaker
//! volume (0-37), 8 = capture volume (0-35), 9 = auto gain. Everything here
//! is a thin shell-out; failures surface as io errors and never affect the
//! pipeline state machine.

use std::io;
use std::process::Command;

use log::debug;
use regex::Regex;
use serde::Serialize;

pub const SPEAKER_VOLUME_MAX: i32 = 37;
pub const CAPTURE_LEVEL_MAX: i32 = 35;

const SPEAKER_SWITCH: u32 = 5;
const SPEAKER_VOLUME: u32 = 6;
const CAPTURE_VOLUME: u32 = 8;
const AUTO_GAIN: u32 = 9;

/// Parsed mixer state, reported on status queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MixerStatus {
    pub speaker_volume: i32,
    pub speaker_on: bool,
    pub capture_volume: i32,
    pub auto_gain: bool,
}

/// Mixer controls for one ALSA card.
pub struct Mixer {
    card: u32,
}

impl Mixer {
    pub fn new(card: u32) -> Self {
        Self { card }
    }

    pub fn status(&self) -> io::Result<MixerStatus> {
        let output = Command::new("amixer")
            .args(["-c", &self.card.to_string(), "contents"])
            .output()?;
        if !output.status.success() {
            return Err(io::Error::new(io::ErrorKind::Other, "amixer contents failed"));
        }
        Ok(parse_contents(&String::from_utf8_lossy(&output.stdout)))
    }

    pub fn set_speaker_volume(&self, level: i32) -> io::Result<()> {
        let level = level.clamp(0, SPEAKER_VOLUME_MAX);
        self.cset(SPEAKER_VOLUME, &level.to_string())?;
        // Volume changes also re-assert the switch so an earlier mute
        // doesn't leave the speaker silently off.
        self.cset(SPEAKER_SWITCH, "on")
    }

    pub fn set_capture_level(&self, level: i32) -> io::Result<()> {
        let level = level.clamp(0, CAPTURE_LEVEL_MAX);
        self.cset(CAPTURE_VOLUME, &level.to_string())
    }

    pub fn set_auto_gain(&self, enabled: bool) -> io::Result<()> {
        self.cset(AUTO_GAIN, if enabled { "on" } else { "off" })
    }

    pub fn set_speaker_mute(&self, muted: bool) -> io::Result<()> {
        self.cset(SPEAKER_SWITCH, if muted { "off" } else { "on" })
    }

    fn cset(&self, numid: u32, value: &str) -> io::Result<()> {
        debug!(target: "mixer", "card {} numid={} <- {}", self.card, numid, value);
        let status = Command::new("amixer")
            .args([
                "-c",
                &self.card.to_string(),
                "cset",
                &format!("numid={numid}"),
                value,
            ])
            .output()?
            .status;
        if !status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("amixer cset numid={numid} failed"),
            ));
        }
        Ok(())
    }
}

/// Scrape `amixer -c N contents` output: each control is a `numid=` header
/// line followed by a `: values=` line.
fn parse_contents(text: &str) -> MixerStatus {
    let header = Regex::new(r"numid=(\d+)").expect("static regex");
    let values = Regex::new(r": values=([^\n]+)").expect("static regex");

    let mut status = MixerStatus::default();
    let mut current: Option<u32> = None;

    for line in text.lines() {
        if let Some(caps) = header.captures(line) {
            current = caps[1].parse().ok();
            continue;
        }
        let Some(numid) = current else { continue };
        let Some(caps) = values.captures(line) else {
            continue;
        };
        let raw = caps[1].trim();
        match numid {
            SPEAKER_SWITCH => status.speaker_on = raw.starts_with("on"),
            SPEAKER_VOLUME => {
                status.speaker_volume = raw.split(',').next().and_then(|v| v.parse().ok()).unwrap_or(0)
            }
            CAPTURE_VOLUME => {
                status.capture_volume = raw.split(',').next().and_then(|v| v.parse().ok()).unwrap_or(0)
            }
            AUTO_GAIN => status.auto_gain = raw.starts_with("on"),
            _ => {}
        }
    }
    status
}
