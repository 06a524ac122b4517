//! Effects-chain parameters and the built-in preset table.
//!
//! The numeric fields feed the external filter/reverb pipeline; every setter
//! validates its range before mutating so a rejected command leaves the
//! record untouched. The band edges keep a minimum 200 Hz gap by nudging the
//! opposite edge rather than rejecting the request.

use serde::{Deserialize, Serialize};

use crate::action::CommandError;

pub const BP_LOW_RANGE: (i32, i32) = (100, 2000);
pub const BP_HIGH_RANGE: (i32, i32) = (300, 5000);
pub const BP_MIN_GAP: i32 = 200;
pub const CONTRAST_RANGE: (i32, i32) = (0, 40);
pub const PRE_GAIN_RANGE: (i32, i32) = (-24, 0);
pub const POST_GAIN_RANGE: (i32, i32) = (0, 18);
pub const REVERB_RANGE: (i32, i32) = (0, 100);

/// Name given to the active preset once any field is edited by hand.
pub const CUSTOM_PRESET: &str = "CUSTOM";

/// A tunable effects parameter, addressed by command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxParam {
    BpLow,
    BpHigh,
    ReverbRoom,
    ReverbDamp,
    ReverbWet,
    ReverbDry,
    Contrast,
    PreGain,
    PostGain,
}

impl FxParam {
    pub fn name(self) -> &'static str {
        match self {
            FxParam::BpLow => "BP_LOW",
            FxParam::BpHigh => "BP_HIGH",
            FxParam::ReverbRoom => "REVERB",
            FxParam::ReverbDamp => "REVERB_DAMP",
            FxParam::ReverbWet => "REVERB_WET",
            FxParam::ReverbDry => "REVERB_DRY",
            FxParam::Contrast => "CONTRAST",
            FxParam::PreGain => "PRE_GAIN",
            FxParam::PostGain => "POST_GAIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BP_LOW" => Some(FxParam::BpLow),
            "BP_HIGH" => Some(FxParam::BpHigh),
            "REVERB" => Some(FxParam::ReverbRoom),
            "REVERB_DAMP" => Some(FxParam::ReverbDamp),
            "REVERB_WET" => Some(FxParam::ReverbWet),
            "REVERB_DRY" => Some(FxParam::ReverbDry),
            "CONTRAST" => Some(FxParam::Contrast),
            "PRE_GAIN" => Some(FxParam::PreGain),
            "POST_GAIN" => Some(FxParam::PostGain),
            _ => None,
        }
    }
}

/// Effects pipeline parameters. `enabled` is volatile and always loads false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectsParams {
    pub enabled: bool,
    pub preset: String,
    pub bp_low: i32,
    pub bp_high: i32,
    pub reverb_room: i32,
    pub reverb_damping: i32,
    pub reverb_wet: i32,
    pub reverb_dry: i32,
    pub contrast: i32,
    pub pre_gain_db: i32,
    pub post_gain_db: i32,
}

impl Default for EffectsParams {
    fn default() -> Self {
        // Matches the RAW_PORTAL preset, the default chain for the
        // built-in tuner.
        Self {
            enabled: false,
            preset: "RAW_PORTAL".into(),
            bp_low: 500,
            bp_high: 2600,
            reverb_room: 30,
            reverb_damping: 45,
            reverb_wet: 85,
            reverb_dry: 65,
            contrast: 18,
            pre_gain_db: -6,
            post_gain_db: 8,
        }
    }
}

impl EffectsParams {
    /// Validate and apply one parameter. Marks the record as hand-edited.
    pub fn set(&mut self, param: FxParam, value: i32) -> Result<(), CommandError> {
        match param {
            FxParam::BpLow => {
                check_range(param, value, BP_LOW_RANGE)?;
                if value + BP_MIN_GAP > self.bp_high {
                    self.bp_high = (value + BP_MIN_GAP).min(BP_HIGH_RANGE.1);
                }
                self.bp_low = value;
            }
            FxParam::BpHigh => {
                check_range(param, value, BP_HIGH_RANGE)?;
                if value - BP_MIN_GAP < self.bp_low {
                    self.bp_low = (value - BP_MIN_GAP).max(BP_LOW_RANGE.0);
                }
                self.bp_high = value;
            }
            FxParam::ReverbRoom => {
                check_range(param, value, REVERB_RANGE)?;
                self.reverb_room = value;
            }
            FxParam::ReverbDamp => {
                check_range(param, value, REVERB_RANGE)?;
                self.reverb_damping = value;
            }
            FxParam::ReverbWet => {
                check_range(param, value, REVERB_RANGE)?;
                self.reverb_wet = value;
            }
            FxParam::ReverbDry => {
                check_range(param, value, REVERB_RANGE)?;
                self.reverb_dry = value;
            }
            FxParam::Contrast => {
                check_range(param, value, CONTRAST_RANGE)?;
                self.contrast = value;
            }
            FxParam::PreGain => {
                check_range(param, value, PRE_GAIN_RANGE)?;
                self.pre_gain_db = value;
            }
            FxParam::PostGain => {
                check_range(param, value, POST_GAIN_RANGE)?;
                self.post_gain_db = value;
            }
        }
        self.preset = CUSTOM_PRESET.into();
        Ok(())
    }

    /// Copy a preset's values into this record, keeping the enabled flag.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        let upper = name.to_ascii_uppercase();
        let Some(preset) = find_preset(&upper) else {
            return false;
        };
        self.bp_low = preset.bp_low;
        self.bp_high = preset.bp_high;
        self.reverb_room = preset.reverb_room;
        self.reverb_damping = preset.reverb_damping;
        self.reverb_wet = preset.reverb_wet;
        self.reverb_dry = preset.reverb_dry;
        self.contrast = preset.contrast;
        self.pre_gain_db = preset.pre_gain_db;
        self.post_gain_db = preset.post_gain_db;
        self.preset = upper;
        true
    }
}

fn check_range(param: FxParam, value: i32, (lo, hi): (i32, i32)) -> Result<(), CommandError> {
    if value < lo || value > hi {
        return Err(CommandError::OutOfRange {
            what: param.name(),
            min: lo,
            max: hi,
        });
    }
    Ok(())
}

/// A named parameter set for the effects chain.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FxPreset {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub bp_low: i32,
    pub bp_high: i32,
    pub reverb_room: i32,
    pub reverb_damping: i32,
    pub reverb_wet: i32,
    pub reverb_dry: i32,
    pub contrast: i32,
    pub pre_gain_db: i32,
    pub post_gain_db: i32,
}

const fn preset(
    name: &'static str,
    category: &'static str,
    description: &'static str,
    bands: (i32, i32),
    reverb: (i32, i32, i32, i32),
    contrast: i32,
    gains: (i32, i32),
) -> FxPreset {
    FxPreset {
        name,
        category,
        description,
        bp_low: bands.0,
        bp_high: bands.1,
        reverb_room: reverb.0,
        reverb_damping: reverb.1,
        reverb_wet: reverb.2,
        reverb_dry: reverb.3,
        contrast,
        pre_gain_db: gains.0,
        post_gain_db: gains.1,
    }
}

/// Built-in presets. The EXT_* group targets an external receiver fed in
/// through the capture device; the rest are tuned for the on-board tuner.
pub const FX_PRESETS: &[FxPreset] = &[
    preset(
        "RAW_PORTAL",
        "FM",
        "Clean voice isolation - the default chain",
        (500, 2600),
        (30, 45, 85, 65),
        18,
        (-6, 8),
    ),
    preset(
        "CRYSTAL_CLEAR",
        "FM",
        "Maximum voice clarity - tight vocal range, minimal noise",
        (550, 2400),
        (28, 48, 80, 70),
        15,
        (-7, 7),
    ),
    preset(
        "DEEP_VOICE",
        "FM",
        "Enhanced low frequencies for deeper voices",
        (400, 2200),
        (32, 42, 90, 60),
        16,
        (-6, 9),
    ),
    preset(
        "HIGH_VOICE",
        "FM",
        "Enhanced high frequencies for lighter voices",
        (600, 2800),
        (30, 46, 85, 65),
        17,
        (-6, 8),
    ),
    preset(
        "DYNAMIC_GATE",
        "FM",
        "Multi-stage processing with a compression gate",
        (450, 2400),
        (20, 35, 45, 40),
        12,
        (-6, 8),
    ),
    preset(
        "CLARITY_MAX",
        "FM",
        "High-clarity filter - balanced intelligibility",
        (460, 2750),
        (26, 40, 58, 52),
        15,
        (-6, 11),
    ),
    preset(
        "VOICE_ONLY",
        "FM",
        "Maximum noise reduction - loud voices, minimal static",
        (520, 2550),
        (18, 40, 48, 55),
        14,
        (-7, 12),
    ),
    preset(
        "EXTREME_VOICE_ONLY",
        "FM",
        "Aggressive static removal with maximum voice boost",
        (600, 2400),
        (10, 45, 35, 65),
        20,
        (-9, 12),
    ),
    preset(
        "EXT_CLASSIC",
        "EXT",
        "Balanced chain for an external receiver",
        (500, 2600),
        (35, 40, 100, 55),
        20,
        (-6, 8),
    ),
    preset(
        "EXT_CRYSTAL_CLEAR",
        "EXT",
        "Tight vocal range for an external receiver",
        (550, 2400),
        (32, 42, 95, 60),
        17,
        (-7, 7),
    ),
    preset(
        "EXT_DEEP_VOICE",
        "EXT",
        "Low-frequency emphasis for an external receiver",
        (400, 2200),
        (33, 38, 98, 57),
        19,
        (-6, 9),
    ),
    preset(
        "EXT_STATIC_KILLER",
        "EXT",
        "Static reduction with enhanced voice punch",
        (480, 2700),
        (22, 38, 70, 50),
        19,
        (-5, 10),
    ),
];

pub fn find_preset(name: &str) -> Option<&'static FxPreset> {
    FX_PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}
