//! # sweepbox-audio
//!
//! Ownership of the audio output device. Three producers compete for it,
//! all external processes: the effects pipeline, the raw passthrough, and
//! one-shot clip playback. The arbiter decides once per tick which (if any)
//! continuous pipeline should run; the playback path pre-empts it for the
//! duration of a clip; the process supervisor guarantees clean teardown so
//! the device is actually free before the next owner starts.

pub mod arbiter;
pub mod mixer;
pub mod pipeline;
pub mod playback;
pub mod process;

pub use arbiter::{desired_pipeline, Arbiter, ArbiterHandle, ControlState, PipelineKind, Snapshot};
pub use mixer::{Mixer, MixerStatus};
pub use playback::PlaybackPath;
pub use process::{ManagedProcess, OutputSink};
