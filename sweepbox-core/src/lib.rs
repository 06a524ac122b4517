//! # sweepbox-core
//!
//! The controller's runtime: shared state records behind per-record locks,
//! the command dispatch layer, and the hardware-facing workers (sweep loop,
//! tuner driver, LED engine, simulation triggers). The audio-device
//! machinery itself lives in `sweepbox-audio`; this crate feeds it state and
//! commands.

pub mod dispatch;
pub mod led;
pub mod library;
pub mod paths;
pub mod sim;
pub mod state;
pub mod sweep;
pub mod tuner;

pub use dispatch::Dispatcher;
pub use led::{LedDriver, LedHandle, LedSink, LogSink};
pub use library::SoundLibrary;
pub use paths::BoxPaths;
pub use state::SharedState;
pub use sweep::SweepController;
pub use tuner::{Tuner, TunerBus};
