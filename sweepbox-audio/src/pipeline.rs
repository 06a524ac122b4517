//! Pipeline command builders.
//!
//! Pure functions from a parameter snapshot and device identifiers to the
//! argv of a shell pipeline. Both continuous chains record from the receiver
//! capture device, shape the signal with an external `sox` stage, and play
//! to the current output device; they differ only in the middle stage.

use sweepbox_types::EffectsParams;

const CAPTURE_FORMAT: &str = "-f S16_LE -r 48000 -c 2";

/// Build the effects chain: capture, base cleanup, user band-pass, optional
/// contrast stage, reverb, make-up gain, mono-to-stereo remix, playback.
pub fn effects_command(fx: &EffectsParams, capture: &str, output: &str) -> Vec<String> {
    let mut stages = vec![
        "highpass 250".to_string(),
        "lowpass 4800".to_string(),
        "compand 0.08,0.2 -28,-18 6".to_string(),
        format!("gain {}", fx.pre_gain_db),
        format!("sinc {}-{}", fx.bp_low, fx.bp_high),
    ];
    if fx.contrast > 0 {
        stages.push(format!("contrast {}", fx.contrast));
    }
    stages.push(format!(
        "reverb {} {} {} {}",
        fx.reverb_room, fx.reverb_damping, fx.reverb_wet, fx.reverb_dry
    ));
    stages.push(format!("gain {}", fx.post_gain_db));
    stages.push("remix 1,2 1,2".to_string());

    shell_pipeline(capture, &stages.join(" "), output)
}

/// Build the raw passthrough chain: fixed cleanup only, no user stages.
pub fn passthrough_command(capture: &str, output: &str) -> Vec<String> {
    shell_pipeline(
        capture,
        "highpass 250 lowpass 4800 compand 0.08,0.2 -28,-18 6 gain -3 remix 1,2 1,2",
        output,
    )
}

fn shell_pipeline(capture: &str, sox_effects: &str, output: &str) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!(
            "arecord -D {capture} {CAPTURE_FORMAT} | \
             sox -t wav - -t wav - {sox_effects} | \
             aplay -D {output}"
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepbox_types::FxParam;

    #[test]
    fn effects_command_embeds_band_and_device() {
        let mut fx = EffectsParams::default();
        fx.set(FxParam::BpLow, 450).unwrap();
        fx.set(FxParam::BpHigh, 2400).unwrap();

        let argv = effects_command(&fx, "plughw:3,0", "bt-sink-1");
        assert_eq!(argv[0], "sh");
        assert_eq!(argv[1], "-c");
        let script = &argv[2];
        assert!(script.contains("sinc 450-2400"));
        assert!(script.contains("arecord -D plughw:3,0"));
        assert!(script.contains("aplay -D bt-sink-1"));
        assert!(script.contains("reverb 30 45 85 65"));
    }

    #[test]
    fn contrast_stage_is_omitted_at_zero() {
        let mut fx = EffectsParams::default();
        fx.set(FxParam::Contrast, 0).unwrap();
        let script = effects_command(&fx, "hw:0", "hw:1").remove(2);
        assert!(!script.contains("contrast"));

        fx.set(FxParam::Contrast, 12).unwrap();
        let script = effects_command(&fx, "hw:0", "hw:1").remove(2);
        assert!(script.contains("contrast 12"));
    }

    #[test]
    fn passthrough_has_no_user_stages() {
        let script = passthrough_command("plughw:3,0", "speaker").remove(2);
        assert!(script.contains("gain -3"));
        assert!(!script.contains("sinc"));
        assert!(!script.contains("reverb"));
        assert!(script.contains("aplay -D speaker"));
    }
}
