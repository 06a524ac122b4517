//! The text command grammar.
//!
//! Requests are whitespace-separated words, verb first, case-insensitive on
//! keywords. Responses are a single line: `OK`, `OK <payload>`, or
//! `ERR <reason>`. Everything beyond parse/render lives in the dispatcher.

use sweepbox_types::{
    CommandError, DirectionCmd, FxParam, FxRequest, LedCfgField, LedMode, LedTarget, MixerRequest,
    MusicBoxRequest, RemPodRequest, Reply, Request, SoundFolder, SoundRequest,
};

/// Parse one request line.
pub fn parse_request(line: &str) -> Result<Request, CommandError> {
    let mut words = line.split_whitespace();
    let verb = words
        .next()
        .ok_or_else(|| CommandError::Invalid("empty command".into()))?
        .to_ascii_uppercase();
    let args: Vec<&str> = words.collect();

    match verb.as_str() {
        "STATUS" => Ok(Request::Status),
        "PING" => Ok(Request::Ping),
        "START" => Ok(Request::Start),
        "STOP" => Ok(Request::Stop),
        "FASTER" => Ok(Request::Faster),
        "SLOWER" => Ok(Request::Slower),
        "SPEED" => {
            let ms = int_arg(&args, 0, "SPEED needs ms")?;
            Ok(Request::Speed(ms))
        }
        "DIR" => match upper(&args, 0).as_deref() {
            Some("UP") => Ok(Request::Direction(DirectionCmd::Up)),
            Some("DOWN") => Ok(Request::Direction(DirectionCmd::Down)),
            Some("TOGGLE") => Ok(Request::Direction(DirectionCmd::Toggle)),
            _ => Err(CommandError::Invalid("DIR needs UP/DOWN/TOGGLE".into())),
        },
        "LED" => parse_led(&args),
        "SWEEP_CFG" => {
            let (field, value) = parse_cfg(&args, "SWEEP_CFG")?;
            Ok(Request::SweepCfg(field, value))
        }
        "BOX_CFG" => {
            let (field, value) = parse_cfg(&args, "BOX_CFG")?;
            Ok(Request::BoxCfg(field, value))
        }
        "FX" => parse_fx(&args),
        "SOUND" => parse_sound(&args),
        "FM" => match upper(&args, 0).as_deref() {
            Some("TUNE") => {
                let freq: f64 = args
                    .get(1)
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| CommandError::Invalid("FM TUNE needs frequency".into()))?;
                Ok(Request::Tune(freq))
            }
            _ => Err(CommandError::Invalid("FM unknown subcommand".into())),
        },
        "DEVICE" => match upper(&args, 0).as_deref() {
            Some("STATUS") => Ok(Request::DeviceStatus),
            Some("SET") => {
                let device = rest(&args, 1)
                    .ok_or_else(|| CommandError::Invalid("DEVICE SET needs a device".into()))?;
                Ok(Request::DeviceSet(device))
            }
            _ => Err(CommandError::Invalid("DEVICE needs STATUS/SET".into())),
        },
        "MIXER" => parse_mixer(&args),
        "MUTE" => match upper(&args, 0).as_deref() {
            Some("ON") => Ok(Request::Mute(true)),
            Some("OFF") => Ok(Request::Mute(false)),
            _ => Err(CommandError::Invalid("MUTE needs ON/OFF".into())),
        },
        "REMPOD" => parse_rempod(&args),
        "MUSICBOX" => parse_musicbox(&args),
        _ => Err(CommandError::Invalid("unknown command".into())),
    }
}

/// Render a dispatch outcome as its single response line.
pub fn render_response(result: &Result<Reply, CommandError>) -> String {
    match result {
        Ok(Reply::Ack) => "OK".to_string(),
        Ok(Reply::Line(payload)) => format!("OK {payload}"),
        Err(e) => format!("ERR {e}"),
    }
}

fn upper(args: &[&str], index: usize) -> Option<String> {
    args.get(index).map(|s| s.to_ascii_uppercase())
}

fn rest(args: &[&str], from: usize) -> Option<String> {
    if args.len() <= from {
        return None;
    }
    Some(args[from..].join(" "))
}

fn int_arg<T: std::str::FromStr>(
    args: &[&str],
    index: usize,
    message: &str,
) -> Result<T, CommandError> {
    args.get(index)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CommandError::Invalid(message.into()))
}

fn parse_led(args: &[&str]) -> Result<Request, CommandError> {
    let target = match upper(args, 0).as_deref() {
        Some("SWEEP") => LedTarget::Sweep,
        Some("BOX") => LedTarget::Box,
        Some("ALL") => LedTarget::All,
        _ => return Err(CommandError::Invalid("LED needs target and mode".into())),
    };
    let mode = args
        .get(1)
        .and_then(|s| LedMode::parse(s))
        .ok_or_else(|| CommandError::Invalid("LED mode".into()))?;
    Ok(Request::Led { target, mode })
}

fn parse_cfg(args: &[&str], what: &str) -> Result<(LedCfgField, i32), CommandError> {
    let field = args
        .get(0)
        .and_then(|s| LedCfgField::parse(s))
        .ok_or_else(|| CommandError::Invalid(format!("{what} needs field and value")))?;
    let value = int_arg(args, 1, "invalid value")?;
    Ok((field, value))
}

fn parse_fx(args: &[&str]) -> Result<Request, CommandError> {
    match upper(args, 0).as_deref() {
        Some("STATUS") => Ok(Request::Fx(FxRequest::Status)),
        Some("ENABLE") => Ok(Request::Fx(FxRequest::Enable)),
        Some("DISABLE") => Ok(Request::Fx(FxRequest::Disable)),
        Some("SET") => {
            let param = args
                .get(1)
                .and_then(|s| FxParam::parse(s))
                .ok_or_else(|| CommandError::Invalid("FX SET unknown param".into()))?;
            let value = int_arg(args, 2, "FX SET bad value")?;
            Ok(Request::Fx(FxRequest::Set(param, value)))
        }
        Some("PRESET") => match upper(args, 1).as_deref() {
            Some("LIST") => Ok(Request::Fx(FxRequest::PresetList)),
            Some("STATUS") => Ok(Request::Fx(FxRequest::PresetStatus)),
            Some("INFO") => {
                let name = args
                    .get(2)
                    .ok_or_else(|| CommandError::Invalid("FX PRESET INFO needs a name".into()))?;
                Ok(Request::Fx(FxRequest::PresetInfo(name.to_string())))
            }
            Some("SET") => {
                let name = args
                    .get(2)
                    .ok_or_else(|| CommandError::Invalid("FX PRESET SET needs a name".into()))?;
                Ok(Request::Fx(FxRequest::PresetSet(name.to_string())))
            }
            _ => Err(CommandError::Invalid("FX PRESET unknown subcommand".into())),
        },
        _ => Err(CommandError::Invalid("FX unknown subcommand".into())),
    }
}

fn parse_sound(args: &[&str]) -> Result<Request, CommandError> {
    match upper(args, 0).as_deref() {
        Some("STATUS") => Ok(Request::Sound(SoundRequest::Status)),
        Some("CLEAR") => Ok(Request::Sound(SoundRequest::Clear)),
        Some("LIST") => {
            let folder = match args.get(1) {
                None => None,
                Some(word) => Some(
                    SoundFolder::parse(word)
                        .ok_or_else(|| CommandError::Invalid("unknown sound folder".into()))?,
                ),
            };
            Ok(Request::Sound(SoundRequest::List(folder)))
        }
        // Clip names may contain spaces; everything after the keyword is
        // the name.
        Some("PLAY") => Ok(Request::Sound(SoundRequest::Play(rest(args, 1)))),
        Some("SET") => {
            let name = rest(args, 1)
                .ok_or_else(|| CommandError::Invalid("SOUND SET needs filename".into()))?;
            Ok(Request::Sound(SoundRequest::Set(name)))
        }
        _ => Err(CommandError::Invalid("SOUND unknown subcommand".into())),
    }
}

fn parse_mixer(args: &[&str]) -> Result<Request, CommandError> {
    match upper(args, 0).as_deref() {
        Some("STATUS") => Ok(Request::Mixer(MixerRequest::Status)),
        Some("SET") => match upper(args, 1).as_deref() {
            Some("SPEAKER_VOL") => {
                let level = int_arg(args, 2, "invalid volume")?;
                Ok(Request::Mixer(MixerRequest::SpeakerVolume(level)))
            }
            Some("MIC_VOL") => {
                let level = int_arg(args, 2, "invalid volume")?;
                Ok(Request::Mixer(MixerRequest::CaptureLevel(level)))
            }
            Some("AUTO_GAIN") => match upper(args, 2).as_deref() {
                Some("ON") => Ok(Request::Mixer(MixerRequest::AutoGain(true))),
                Some("OFF") => Ok(Request::Mixer(MixerRequest::AutoGain(false))),
                _ => Err(CommandError::Invalid("AUTO_GAIN needs ON/OFF".into())),
            },
            _ => Err(CommandError::Invalid("MIXER unknown field".into())),
        },
        _ => Err(CommandError::Invalid("MIXER unknown subcommand".into())),
    }
}

fn parse_rempod(args: &[&str]) -> Result<Request, CommandError> {
    match upper(args, 0).as_deref() {
        Some("STATUS") => Ok(Request::RemPod(RemPodRequest::Status)),
        Some("ARM") => Ok(Request::RemPod(RemPodRequest::Arm)),
        Some("DISARM") => Ok(Request::RemPod(RemPodRequest::Disarm)),
        Some("TRIGGER") => Ok(Request::RemPod(RemPodRequest::Trigger)),
        Some("SENSITIVITY") => {
            let level = int_arg(args, 1, "SENSITIVITY needs 1-5")?;
            Ok(Request::RemPod(RemPodRequest::Sensitivity(level)))
        }
        Some("SOUND") => {
            let name = rest(args, 1)
                .ok_or_else(|| CommandError::Invalid("REMPOD SOUND needs filename".into()))?;
            Ok(Request::RemPod(RemPodRequest::Sound(name)))
        }
        Some("TEMP") => match upper(args, 1).as_deref() {
            Some("ON") => Ok(Request::RemPod(RemPodRequest::TempAlerts(true))),
            Some("OFF") => Ok(Request::RemPod(RemPodRequest::TempAlerts(false))),
            _ => Err(CommandError::Invalid("REMPOD TEMP needs ON/OFF".into())),
        },
        Some("SIMULATE") => {
            let (on, interval_secs) = parse_simulate(args)?;
            Ok(Request::RemPod(RemPodRequest::Simulate { on, interval_secs }))
        }
        _ => Err(CommandError::Invalid("REMPOD unknown subcommand".into())),
    }
}

fn parse_musicbox(args: &[&str]) -> Result<Request, CommandError> {
    match upper(args, 0).as_deref() {
        Some("STATUS") => Ok(Request::MusicBox(MusicBoxRequest::Status)),
        Some("START") => Ok(Request::MusicBox(MusicBoxRequest::Start)),
        Some("STOP") => Ok(Request::MusicBox(MusicBoxRequest::Stop)),
        Some("TRIGGER") | Some("PLAY") => Ok(Request::MusicBox(MusicBoxRequest::Trigger)),
        Some("SOUND") => {
            let name = rest(args, 1)
                .ok_or_else(|| CommandError::Invalid("MUSICBOX SOUND needs filename".into()))?;
            Ok(Request::MusicBox(MusicBoxRequest::Sound(name)))
        }
        Some("RANGE") => {
            let meters: f32 = args
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| CommandError::Invalid("MUSICBOX RANGE needs meters".into()))?;
            Ok(Request::MusicBox(MusicBoxRequest::Range(meters)))
        }
        Some("SIMULATE") => {
            let (on, interval_secs) = parse_simulate(args)?;
            Ok(Request::MusicBox(MusicBoxRequest::Simulate { on, interval_secs }))
        }
        _ => Err(CommandError::Invalid("MUSICBOX unknown subcommand".into())),
    }
}

fn parse_simulate(args: &[&str]) -> Result<(bool, Option<f32>), CommandError> {
    match upper(args, 1).as_deref() {
        Some("START") => {
            let interval = args.get(2).and_then(|s| s.parse().ok());
            Ok((true, interval))
        }
        Some("STOP") => Ok((false, None)),
        _ => Err(CommandError::Invalid("SIMULATE needs START/STOP".into())),
    }
}
