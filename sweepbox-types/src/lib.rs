//! # sweepbox-types
//!
//! Shared type definitions for the sweepbox controller: the runtime state
//! records, the FX preset table, and the request/reply vocabulary of the
//! command surface. This crate holds data and validation only: no I/O,
//! no locking, no process control.

pub mod action;
pub mod fx;
pub mod led;
pub mod route;
pub mod sim;
pub mod sweep;

pub use action::{
    CommandError, DirectionCmd, FxRequest, MixerRequest, MusicBoxRequest, RemPodRequest, Reply,
    Request, SoundFolder, SoundRequest,
};
pub use fx::{find_preset, EffectsParams, FxParam, FxPreset, FX_PRESETS};
pub use led::{LedCfgField, LedConfig, LedMode, LedTarget};
pub use route::AudioRoute;
pub use sim::{MusicBoxState, RemPodState, RemPodTrigger};
pub use sweep::{closest_speed_index, Direction, SweepFile, SweepState, SWEEP_SPEEDS_MS};
