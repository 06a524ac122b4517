//! LED targets, animation modes, and the persisted brightness/speed window.

use serde::{Deserialize, Serialize};

use crate::action::CommandError;

pub const BRIGHTNESS_RANGE: (i32, i32) = (0, 255);
pub const ANIM_SPEED_RANGE: (i32, i32) = (1, 10);

/// Addressable LED groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedTarget {
    /// The sweep indicator LED (digital).
    Sweep,
    /// The ambient box LED (PWM).
    Box,
    /// Both at once; only meaningful for switching everything off.
    All,
}

/// Animation modes an LED target can be set to.
///
/// `Sweep` is special: it leaves the LED idle so the sweep loop can pulse it
/// explicitly on each frequency step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedMode {
    On,
    Off,
    Breath,
    BreathFast,
    Heartbeat,
    Strobe,
    Flicker,
    RandomBurst,
    Sweep,
}

impl LedMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Some(LedMode::On),
            "off" => Some(LedMode::Off),
            "breath" => Some(LedMode::Breath),
            "breath_fast" => Some(LedMode::BreathFast),
            "heartbeat" => Some(LedMode::Heartbeat),
            "strobe" => Some(LedMode::Strobe),
            "flicker" => Some(LedMode::Flicker),
            "random_burst" => Some(LedMode::RandomBurst),
            "sweep" => Some(LedMode::Sweep),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LedMode::On => "on",
            LedMode::Off => "off",
            LedMode::Breath => "breath",
            LedMode::BreathFast => "breath_fast",
            LedMode::Heartbeat => "heartbeat",
            LedMode::Strobe => "strobe",
            LedMode::Flicker => "flicker",
            LedMode::RandomBurst => "random_burst",
            LedMode::Sweep => "sweep",
        }
    }
}

/// Brightness window and animation speed for each LED group, persisted to
/// its own file. Brightness is 0-255, speed 1-10 (higher is faster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedConfig {
    pub sweep_min_brightness: i32,
    pub sweep_max_brightness: i32,
    pub sweep_speed: i32,
    pub box_min_brightness: i32,
    pub box_max_brightness: i32,
    pub box_speed: i32,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            sweep_min_brightness: 0,
            sweep_max_brightness: 255,
            sweep_speed: 3,
            box_min_brightness: 0,
            box_max_brightness: 255,
            box_speed: 3,
        }
    }
}

/// Adjustable fields of [`LedConfig`], addressed per target group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCfgField {
    Min,
    Max,
    Speed,
}

impl LedCfgField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MIN" => Some(LedCfgField::Min),
            "MAX" => Some(LedCfgField::Max),
            "SPEED" => Some(LedCfgField::Speed),
            _ => None,
        }
    }
}

impl LedConfig {
    /// Validate and apply one field for the sweep LED group.
    pub fn set_sweep(&mut self, field: LedCfgField, value: i32) -> Result<(), CommandError> {
        let (min, max, speed) = (
            &mut self.sweep_min_brightness,
            &mut self.sweep_max_brightness,
            &mut self.sweep_speed,
        );
        set_window(field, value, min, max, speed)
    }

    /// Validate and apply one field for the box LED group.
    pub fn set_box(&mut self, field: LedCfgField, value: i32) -> Result<(), CommandError> {
        let (min, max, speed) = (
            &mut self.box_min_brightness,
            &mut self.box_max_brightness,
            &mut self.box_speed,
        );
        set_window(field, value, min, max, speed)
    }
}

fn set_window(
    field: LedCfgField,
    value: i32,
    min: &mut i32,
    max: &mut i32,
    speed: &mut i32,
) -> Result<(), CommandError> {
    match field {
        LedCfgField::Min => {
            range(value, BRIGHTNESS_RANGE, "brightness")?;
            if value > *max {
                return Err(CommandError::Invalid("min > max".into()));
            }
            *min = value;
        }
        LedCfgField::Max => {
            range(value, BRIGHTNESS_RANGE, "brightness")?;
            if value < *min {
                return Err(CommandError::Invalid("min > max".into()));
            }
            *max = value;
        }
        LedCfgField::Speed => {
            range(value, ANIM_SPEED_RANGE, "speed")?;
            *speed = value;
        }
    }
    Ok(())
}

fn range(value: i32, (lo, hi): (i32, i32), what: &'static str) -> Result<(), CommandError> {
    if value < lo || value > hi {
        return Err(CommandError::OutOfRange {
            what,
            min: lo,
            max: hi,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_roundtrip() {
        for mode in [
            LedMode::On,
            LedMode::Off,
            LedMode::Breath,
            LedMode::BreathFast,
            LedMode::Heartbeat,
            LedMode::Strobe,
            LedMode::Flicker,
            LedMode::RandomBurst,
            LedMode::Sweep,
        ] {
            assert_eq!(LedMode::parse(mode.name()), Some(mode));
        }
        assert_eq!(LedMode::parse("disco"), None);
    }

    #[test]
    fn window_rejects_crossed_bounds() {
        let mut cfg = LedConfig::default();
        cfg.set_box(LedCfgField::Min, 100).unwrap();
        assert!(cfg.set_box(LedCfgField::Max, 50).is_err());
        assert_eq!(cfg.box_max_brightness, 255);
        assert!(cfg.set_box(LedCfgField::Speed, 11).is_err());
        cfg.set_box(LedCfgField::Speed, 10).unwrap();
        assert_eq!(cfg.box_speed, 10);
    }
}
