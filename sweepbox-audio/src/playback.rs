//! One-shot clip playback.
//!
//! A clip pre-empts whatever continuous pipeline owns the device: the
//! arbiter is suspended (stopping the pipeline), the player runs to
//! completion, and the arbiter is resumed so its next tick rebuilds the
//! pipeline from the current snapshot. Overlapping requests serialize on a
//! dedicated gate; two players on one device is never supported.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::arbiter::ArbiterHandle;
use crate::process::{ManagedProcess, OutputSink};

const WAIT_POLL: Duration = Duration::from_millis(50);

/// Resolve the player argv for a clip, by extension.
pub fn player_command(path: &Path) -> Option<Vec<String>> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let path = path.to_str()?.to_string();
    match ext.as_str() {
        "wav" => Some(vec!["aplay".into(), "-q".into(), path]),
        "mp3" => Some(vec!["mpg123".into(), "-q".into(), path]),
        _ => None,
    }
}

/// Serialized access to the device for one-shot clips.
pub struct PlaybackPath {
    arbiter: ArbiterHandle,
    /// Clip search path, most specific folder first.
    search_dirs: Vec<PathBuf>,
    gate: Mutex<()>,
}

impl PlaybackPath {
    pub fn new(arbiter: ArbiterHandle, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            arbiter,
            search_dirs,
            gate: Mutex::new(()),
        }
    }

    /// Find a clip by name across the search directories.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.search_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Play a clip to completion, pre-empting any continuous pipeline.
    ///
    /// Blocks until the player exits or `timeout` elapses. The pipeline is
    /// never restarted from here: the arbiter rebuilds it on its own tick.
    pub fn play(&self, name: &str, timeout: Option<Duration>) -> Result<(), String> {
        let _gate = self.gate.lock().unwrap();

        let path = self
            .resolve(name)
            .ok_or_else(|| format!("sound file not found: {name}"))?;
        let argv =
            player_command(&path).ok_or_else(|| format!("unsupported sound format: {name}"))?;

        let was_running = self.arbiter.suspend();
        if was_running {
            info!(target: "playback", "paused continuous pipeline for {}", name);
        }

        let result = run_player(&argv, timeout);

        if was_running {
            info!(target: "playback", "resuming continuous pipeline");
        }
        self.arbiter.resume(was_running);

        result
    }
}

/// Run a player process synchronously, group-killing it on timeout.
fn run_player(argv: &[String], timeout: Option<Duration>) -> Result<(), String> {
    let mut player = ManagedProcess::spawn(argv, OutputSink::Discard)
        .map_err(|e| format!("could not start player: {e}"))?;
    info!(target: "playback", "playing: {}", player.command());

    let started = Instant::now();
    while player.is_running() {
        if let Some(limit) = timeout {
            if started.elapsed() > limit {
                warn!(target: "playback", "player timed out after {:?}, stopping", limit);
                player.stop();
                return Err("playback timed out".into());
            }
        }
        thread::sleep(WAIT_POLL);
    }
    Ok(())
}
