//! Sweep state: speed table, direction, and the running flag.

use serde::{Deserialize, Serialize};

use crate::led::LedMode;

/// Step delays for the frequency sweep, in milliseconds, slowest index last.
/// Commands address speeds by value; the state stores an index into this table.
pub const SWEEP_SPEEDS_MS: [u64; 7] = [50, 100, 150, 200, 250, 300, 350];

/// Sweep direction across the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Runtime sweep state. `running` is volatile: it is reported over the wire
/// but never persisted as true, so the device always boots silent.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepState {
    /// Index into [`SWEEP_SPEEDS_MS`].
    pub speed_index: usize,
    pub direction: Direction,
    pub running: bool,
    pub sweep_led_mode: LedMode,
    pub box_led_mode: LedMode,
    /// Sound clip played at boot; empty string means none configured.
    pub startup_sound: String,
}

impl Default for SweepState {
    fn default() -> Self {
        Self {
            speed_index: 2,
            direction: Direction::Up,
            running: false,
            sweep_led_mode: LedMode::On,
            box_led_mode: LedMode::Flicker,
            startup_sound: String::new(),
        }
    }
}

impl SweepState {
    pub fn speed_ms(&self) -> u64 {
        SWEEP_SPEEDS_MS[self.speed_index]
    }
}

/// Index of the table entry closest to the requested delay.
pub fn closest_speed_index(ms: u64) -> usize {
    let mut closest = 0;
    let mut best_diff = u64::MAX;
    for (i, preset) in SWEEP_SPEEDS_MS.iter().enumerate() {
        let diff = ms.abs_diff(*preset);
        if diff < best_diff {
            best_diff = diff;
            closest = i;
        }
    }
    closest
}

/// On-disk shape of the sweep record. Stores the resolved delay rather than
/// the table index so hand-edited files stay meaningful, and omits `running`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SweepFile {
    pub speed_ms: u64,
    pub direction: Direction,
    pub sweep_led_mode: LedMode,
    pub box_led_mode: LedMode,
    #[serde(default)]
    pub startup_sound: String,
}

impl From<&SweepState> for SweepFile {
    fn from(state: &SweepState) -> Self {
        Self {
            speed_ms: state.speed_ms(),
            direction: state.direction,
            sweep_led_mode: state.sweep_led_mode,
            box_led_mode: state.box_led_mode,
            startup_sound: state.startup_sound.clone(),
        }
    }
}

impl From<SweepFile> for SweepState {
    fn from(file: SweepFile) -> Self {
        Self {
            speed_index: closest_speed_index(file.speed_ms),
            direction: file.direction,
            // Never restored as true: sweeps only start on command.
            running: false,
            sweep_led_mode: file.sweep_led_mode,
            box_led_mode: file.box_led_mode,
            startup_sound: file.startup_sound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_index_snaps_to_table_entries() {
        assert_eq!(closest_speed_index(50), 0);
        assert_eq!(closest_speed_index(149), 2);
        assert_eq!(closest_speed_index(160), 2);
        assert_eq!(closest_speed_index(10_000), 6);
        assert_eq!(closest_speed_index(0), 0);
    }

    #[test]
    fn file_roundtrip_drops_running() {
        let mut state = SweepState::default();
        state.running = true;
        state.direction = Direction::Down;
        state.startup_sound = "chime.wav".into();

        let file = SweepFile::from(&state);
        let json = serde_json::to_string(&file).unwrap();
        let restored: SweepState = serde_json::from_str::<SweepFile>(&json).unwrap().into();

        assert!(!restored.running);
        assert_eq!(restored.direction, Direction::Down);
        assert_eq!(restored.speed_index, state.speed_index);
        assert_eq!(restored.startup_sound, "chime.wav");
    }
}
