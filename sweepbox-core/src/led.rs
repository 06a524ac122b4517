//! LED pattern engine.
//!
//! Patterns are explicit state machines: each call to `next` yields the
//! following brightness level, and the driver thread advances the active
//! pattern at its own cadence. Pulses (per sweep step, simulation
//! flourishes) are short overrides with an expiry, layered on top of
//! whatever pattern is running. Actual rendering goes through [`LedSink`];
//! GPIO details stay behind that seam.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::trace;

use sweepbox_types::{LedConfig, LedMode, LedTarget};

use crate::state::SharedState;

/// How often the driver re-renders and re-checks modes.
pub const DRIVER_TICK: Duration = Duration::from_millis(20);

/// Rendering backend for the three LED groups.
pub trait LedSink: Send {
    /// Sweep indicator; digital, treat >= 0.5 as on.
    fn set_sweep(&mut self, level: f32);
    /// Ambient box LED; PWM level 0.0-1.0.
    fn set_box(&mut self, level: f32);
    /// Shared RGB indicator used by the simulation triggers.
    fn set_rgb(&mut self, r: f32, g: f32, b: f32);
}

/// Sink for hosts without GPIO: renders to trace logs.
pub struct LogSink;

impl LedSink for LogSink {
    fn set_sweep(&mut self, level: f32) {
        trace!(target: "led", "sweep {}", if level >= 0.5 { "on" } else { "off" });
    }
    fn set_box(&mut self, level: f32) {
        trace!(target: "led", "box {:.2}", level);
    }
    fn set_rgb(&mut self, r: f32, g: f32, b: f32) {
        trace!(target: "led", "rgb {:.1} {:.1} {:.1}", r, g, b);
    }
}

/// Brightness window a pattern scales into.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub min: f32,
    pub max: f32,
}

impl Window {
    fn from_config(min_brightness: i32, max_brightness: i32) -> Self {
        Self {
            min: min_brightness as f32 / 255.0,
            max: max_brightness as f32 / 255.0,
        }
    }

    fn scale(&self, unit: f32) -> f32 {
        let span = (self.max - self.min).max(0.0);
        (self.min + unit * span).clamp(0.0, 1.0)
    }
}

/// Multiplicative-congruential generator; good enough for flicker, and
/// keeps the engine deterministic under test.
#[derive(Debug, Clone)]
struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 40) & 0xFFFFFF) as f32 / 0xFFFFFF as f32
    }
}

const HEARTBEAT_STEPS: [f32; 9] = [1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0];

/// One LED animation, advanced externally.
#[derive(Debug, Clone)]
pub enum Pattern {
    Steady(f32),
    Breath { phase: f32, fast: bool },
    Heartbeat { index: usize },
    Strobe { lit: bool },
    Flicker { rng: Lcg },
    RandomBurst { rng: Lcg },
    /// Idle; the owner pulses the LED explicitly.
    Idle,
}

impl Pattern {
    pub fn for_mode(mode: LedMode) -> Self {
        match mode {
            LedMode::On => Pattern::Steady(1.0),
            LedMode::Off => Pattern::Steady(0.0),
            LedMode::Breath => Pattern::Breath {
                phase: 0.0,
                fast: false,
            },
            LedMode::BreathFast => Pattern::Breath {
                phase: 0.0,
                fast: true,
            },
            LedMode::Heartbeat => Pattern::Heartbeat { index: 0 },
            LedMode::Strobe => Pattern::Strobe { lit: false },
            LedMode::Flicker => Pattern::Flicker { rng: Lcg(0x5eed) },
            LedMode::RandomBurst => Pattern::RandomBurst { rng: Lcg(0xb00c) },
            LedMode::Sweep => Pattern::Idle,
        }
    }

    /// Advance one step and yield the next level.
    pub fn next(&mut self, window: Window) -> f32 {
        match self {
            Pattern::Steady(level) => *level,
            Pattern::Breath { phase, fast } => {
                let rate: f32 = if *fast { 3.0 } else { 1.0 };
                let unit = ((*phase * rate).sin() + 1.0) / 2.0;
                *phase += 0.1;
                window.scale(unit)
            }
            Pattern::Heartbeat { index } => {
                let level = HEARTBEAT_STEPS[*index];
                *index = (*index + 1) % HEARTBEAT_STEPS.len();
                level
            }
            Pattern::Strobe { lit } => {
                *lit = !*lit;
                if *lit {
                    1.0
                } else {
                    0.0
                }
            }
            Pattern::Flicker { rng } => window.scale(0.2 + rng.next_unit() * 0.8),
            Pattern::RandomBurst { rng } => {
                if rng.next_unit() < 0.1 {
                    window.max
                } else {
                    window.scale(rng.next_unit() * 0.3)
                }
            }
            Pattern::Idle => 0.0,
        }
    }

    /// Step delay for this pattern at a 1-10 animation speed.
    pub fn cadence(&self, speed: i32) -> Duration {
        let factor = (11 - speed.clamp(1, 10)) as f32 / 6.0;
        let base_ms = match self {
            Pattern::Steady(_) | Pattern::Idle => return Duration::from_millis(200),
            Pattern::Breath { fast: false, .. } => return Duration::from_millis(50),
            Pattern::Breath { fast: true, .. } => return Duration::from_millis(30),
            Pattern::Heartbeat { .. } => 80.0,
            Pattern::Strobe { .. } => 50.0,
            Pattern::Flicker { .. } => 80.0,
            Pattern::RandomBurst { .. } => 150.0,
        };
        Duration::from_millis((base_ms * factor) as u64)
    }
}

#[derive(Default)]
struct Overrides {
    sweep_until: Option<Instant>,
    box_until: Option<Instant>,
    rgb: Option<(f32, f32, f32, Instant)>,
}

struct LedShared {
    sink: Mutex<Box<dyn LedSink>>,
    overrides: Mutex<Overrides>,
}

/// Cross-thread interface: pulses and flourishes.
#[derive(Clone)]
pub struct LedHandle {
    shared: Arc<LedShared>,
}

impl LedHandle {
    /// Hold a target at full for `duration`, over whatever pattern runs.
    pub fn pulse(&self, target: LedTarget, duration: Duration) {
        let until = Instant::now() + duration;
        let mut ov = self.shared.overrides.lock().unwrap();
        match target {
            LedTarget::Sweep => ov.sweep_until = Some(until),
            LedTarget::Box => ov.box_until = Some(until),
            LedTarget::All => {
                ov.sweep_until = Some(until);
                ov.box_until = Some(until);
            }
        }
    }

    /// Show a colour on the RGB indicator for `duration`.
    pub fn flash_rgb(&self, r: f32, g: f32, b: f32, duration: Duration) {
        let until = Instant::now() + duration;
        self.shared.overrides.lock().unwrap().rgb = Some((r, g, b, until));
    }

    pub fn rgb_off(&self) {
        self.shared.overrides.lock().unwrap().rgb = None;
    }
}

struct TargetState {
    mode: LedMode,
    pattern: Pattern,
    next_step: Instant,
    level: f32,
}

impl TargetState {
    fn new(mode: LedMode) -> Self {
        Self {
            mode,
            pattern: Pattern::for_mode(mode),
            next_step: Instant::now(),
            level: 0.0,
        }
    }

    fn advance(&mut self, mode: LedMode, window: Window, speed: i32, now: Instant) -> f32 {
        if mode != self.mode {
            *self = TargetState::new(mode);
        }
        if now >= self.next_step {
            self.level = self.pattern.next(window);
            self.next_step = now + self.pattern.cadence(speed);
        }
        self.level
    }
}

/// The driving timer: polls modes from shared state, advances patterns,
/// applies pulse overrides, renders through the sink.
pub struct LedDriver {
    state: Arc<SharedState>,
    shared: Arc<LedShared>,
}

impl LedDriver {
    pub fn new(state: Arc<SharedState>, sink: Box<dyn LedSink>) -> Self {
        Self {
            state,
            shared: Arc::new(LedShared {
                sink: Mutex::new(sink),
                overrides: Mutex::new(Overrides::default()),
            }),
        }
    }

    pub fn handle(&self) -> LedHandle {
        LedHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn run(self, shutdown: Receiver<()>) {
        let mut sweep = TargetState::new(LedMode::Off);
        let mut boxled = TargetState::new(LedMode::Off);

        loop {
            match shutdown.recv_timeout(DRIVER_TICK) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            let (sweep_mode, box_mode) = {
                let guard = self.state.sweep();
                (guard.sweep_led_mode, guard.box_led_mode)
            };
            let cfg: LedConfig = self.state.led().clone();
            let now = Instant::now();

            let sweep_window = Window::from_config(cfg.sweep_min_brightness, cfg.sweep_max_brightness);
            let box_window = Window::from_config(cfg.box_min_brightness, cfg.box_max_brightness);

            let mut sweep_level = sweep.advance(sweep_mode, sweep_window, cfg.sweep_speed, now);
            let mut box_level = boxled.advance(box_mode, box_window, cfg.box_speed, now);

            {
                let mut ov = self.shared.overrides.lock().unwrap();
                if let Some(until) = ov.sweep_until {
                    if now < until {
                        sweep_level = 1.0;
                    } else {
                        ov.sweep_until = None;
                    }
                }
                if let Some(until) = ov.box_until {
                    if now < until {
                        box_level = box_window.max;
                    } else {
                        ov.box_until = None;
                    }
                }
                let mut sink = self.shared.sink.lock().unwrap();
                sink.set_sweep(sweep_level);
                sink.set_box(box_level);
                match ov.rgb {
                    Some((r, g, b, until)) if now < until => sink.set_rgb(r, g, b),
                    Some(_) => {
                        ov.rgb = None;
                        sink.set_rgb(0.0, 0.0, 0.0);
                    }
                    None => sink.set_rgb(0.0, 0.0, 0.0),
                }
            }
        }

        // Leave everything dark on the way out.
        let mut sink = self.shared.sink.lock().unwrap();
        sink.set_sweep(0.0);
        sink.set_box(0.0);
        sink.set_rgb(0.0, 0.0, 0.0);
    }
}
