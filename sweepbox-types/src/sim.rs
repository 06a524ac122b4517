//! Simulation trigger state for the companion prop modes.
//!
//! Both records are volatile: they exist for the lifetime of the process and
//! are reported over the wire, but never persisted.

use serde::Serialize;

pub const SENSITIVITY_RANGE: (i32, i32) = (1, 5);

/// EM-field prop simulation: when armed and simulating, the trigger loop
/// fires an LED flourish and an alert clip on an interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemPodState {
    pub armed: bool,
    /// 1-5, display-only granularity for the prop's indicator ring.
    pub sensitivity: i32,
    pub alert_sound: String,
    pub temp_alerts: bool,
    pub simulating: bool,
    pub interval_secs: f32,
}

impl Default for RemPodState {
    fn default() -> Self {
        Self {
            armed: false,
            sensitivity: 3,
            alert_sound: "default.wav".into(),
            temp_alerts: true,
            simulating: false,
            interval_secs: 5.0,
        }
    }
}

/// Kinds of alert the trigger loop can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemPodTrigger {
    Field,
    TempHot,
    TempCold,
}

/// Motion-box simulation: plays a clip when "motion" fires.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicBoxState {
    pub active: bool,
    pub calibrated: bool,
    pub trigger_sound: String,
    pub detection_range_m: f32,
    pub simulating: bool,
    pub interval_secs: f32,
}

impl Default for MusicBoxState {
    fn default() -> Self {
        Self {
            active: false,
            calibrated: false,
            trigger_sound: "default.wav".into(),
            detection_range_m: 5.0,
            simulating: false,
            interval_secs: 10.0,
        }
    }
}
