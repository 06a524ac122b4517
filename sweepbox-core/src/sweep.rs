//! The sweep controller.
//!
//! Two states: idle and sweeping, switched only by commands. While sweeping
//! the loop walks a full band ramp in the configured direction, tuning and
//! optionally pulsing the indicator LED on every step. The ramp always runs
//! edge to edge: a direction change mid-flight takes effect on the next full
//! ramp, never as a mid-band ping-pong. The loop never touches the audio
//! device: it only writes the state the arbiter reads on its own cadence.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info};

use sweepbox_types::{Direction, LedMode, LedTarget};

use crate::led::LedHandle;
use crate::state::SharedState;
use crate::tuner::Tuner;

/// Band edges and step, in tenths of a MHz.
pub const BAND_LOW: u32 = 880;
pub const BAND_HIGH: u32 = 1080;
pub const STEP: u32 = 2;

/// Poll cadence while idle.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// The frequencies of one full ramp, in sweep order.
pub fn ramp(direction: Direction) -> Vec<f64> {
    let tenths: Vec<u32> = match direction {
        Direction::Up => (BAND_LOW..BAND_HIGH).step_by(STEP as usize).collect(),
        Direction::Down => (BAND_LOW + STEP..=BAND_HIGH)
            .rev()
            .step_by(STEP as usize)
            .collect(),
    };
    tenths.into_iter().map(|t| t as f64 / 10.0).collect()
}

/// Indicator pulse length at a 1-10 animation speed.
fn pulse_duration(speed: i32) -> Duration {
    let ms = 10 + (11 - speed.clamp(1, 10)) * 3;
    Duration::from_millis(ms as u64)
}

pub struct SweepController {
    state: Arc<SharedState>,
    tuner: Arc<Tuner>,
    leds: LedHandle,
}

impl SweepController {
    pub fn new(state: Arc<SharedState>, tuner: Arc<Tuner>, leds: LedHandle) -> Self {
        Self { state, tuner, leds }
    }

    pub fn run(self, shutdown: Receiver<()>) {
        info!(target: "sweep", "controller started");
        loop {
            match shutdown.recv_timeout(IDLE_POLL) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            let (running, direction) = {
                let guard = self.state.sweep();
                (guard.running, guard.direction)
            };
            if !running {
                continue;
            }

            info!(target: "sweep", "starting {} ramp", direction);
            if !self.run_ramp(direction, &shutdown) {
                break;
            }
        }
        info!(target: "sweep", "controller stopped");
    }

    /// Walk one full ramp. Returns false if shutdown was requested.
    fn run_ramp(&self, direction: Direction, shutdown: &Receiver<()>) -> bool {
        let mut steps = 0u32;
        for freq in ramp(direction) {
            let (running, sweep_mode, box_mode, delay_ms) = {
                let guard = self.state.sweep();
                (
                    guard.running,
                    guard.sweep_led_mode,
                    guard.box_led_mode,
                    guard.speed_ms(),
                )
            };
            if !running {
                debug!(target: "sweep", "ramp aborted after {} steps", steps);
                return true;
            }

            self.tuner.tune(freq);
            steps += 1;

            // Per-step indicator flash, when the mode calls for it.
            let pulse = {
                let speed = self.state.led().sweep_speed;
                pulse_duration(speed)
            };
            let mut pulsed = false;
            if sweep_mode == LedMode::On {
                self.leds.pulse(LedTarget::Sweep, pulse);
                pulsed = true;
            }
            if box_mode == LedMode::Sweep {
                self.leds.pulse(LedTarget::Box, pulse);
                pulsed = true;
            }
            if pulsed && !sleep_or_shutdown(shutdown, pulse) {
                return false;
            }

            if !sleep_or_shutdown(shutdown, Duration::from_millis(delay_ms)) {
                return false;
            }
        }
        debug!(target: "sweep", "ramp complete ({} steps)", steps);
        true
    }
}

/// Sleep that stays responsive to shutdown. Returns false on shutdown.
fn sleep_or_shutdown(shutdown: &Receiver<()>, duration: Duration) -> bool {
    match shutdown.recv_timeout(duration) {
        Err(RecvTimeoutError::Timeout) => true,
        Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_ramp_covers_the_band_low_to_high() {
        let steps = ramp(Direction::Up);
        assert_eq!(steps.len(), 100);
        assert_eq!(steps[0], 88.0);
        assert_eq!(*steps.last().unwrap(), 107.8);
        assert!(steps.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn down_ramp_covers_the_band_high_to_low() {
        let steps = ramp(Direction::Down);
        assert_eq!(steps.len(), 100);
        assert_eq!(steps[0], 108.0);
        assert_eq!(*steps.last().unwrap(), 88.2);
        assert!(steps.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn pulse_scales_with_speed() {
        assert_eq!(pulse_duration(1), Duration::from_millis(40));
        assert_eq!(pulse_duration(10), Duration::from_millis(13));
        assert!(pulse_duration(10) < pulse_duration(1));
    }
}
