//! Shared runtime state: one lock per record, persistence with rollback.
//!
//! Workers never hold a record lock across a sleep or a process action;
//! they snapshot under the lock and act on the copy. There is deliberately
//! no cross-record transaction: the arbiter re-evaluates every tick, so a
//! transition missed between two records is caught on the next one.

pub mod persistence;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::info;

use sweepbox_audio::arbiter::{ControlState, Snapshot};
use sweepbox_types::{
    AudioRoute, CommandError, EffectsParams, LedConfig, MusicBoxState, RemPodState, SweepFile,
    SweepState,
};

use crate::paths::BoxPaths;
use self::persistence::{load_json, save_json};

pub struct SharedState {
    paths: BoxPaths,
    sweep: Mutex<SweepState>,
    fx: Mutex<EffectsParams>,
    route: Mutex<AudioRoute>,
    led: Mutex<LedConfig>,
    rempod: Mutex<RemPodState>,
    musicbox: Mutex<MusicBoxState>,
    /// Consumed by the arbiter tick; set by FX edits, device changes, and
    /// the playback path's resume.
    restart_flag: AtomicBool,
}

impl SharedState {
    /// Load every persisted record, defaulting whatever is missing. Volatile
    /// flags (`running`, `enabled`, `bt_connected`) always come up false.
    pub fn load(paths: BoxPaths) -> Self {
        let sweep: SweepState = load_json::<SweepFile>(&paths.sweep_file())
            .map(SweepState::from)
            .unwrap_or_default();
        let fx = load_json::<EffectsParams>(&paths.fx_file())
            .map(|mut fx| {
                fx.enabled = false;
                fx
            })
            .unwrap_or_default();
        let route = load_json::<AudioRoute>(&paths.route_file()).unwrap_or_default();
        let led = load_json::<LedConfig>(&paths.led_file()).unwrap_or_default();

        info!(
            target: "state",
            "loaded: speed {} ms, direction {}, device {}",
            sweep.speed_ms(),
            sweep.direction,
            route.current_device
        );

        Self {
            paths,
            sweep: Mutex::new(sweep),
            fx: Mutex::new(fx),
            route: Mutex::new(route),
            led: Mutex::new(led),
            rempod: Mutex::new(RemPodState::default()),
            musicbox: Mutex::new(MusicBoxState::default()),
            restart_flag: AtomicBool::new(false),
        }
    }

    pub fn paths(&self) -> &BoxPaths {
        &self.paths
    }

    pub fn sweep(&self) -> MutexGuard<'_, SweepState> {
        self.sweep.lock().unwrap()
    }

    pub fn fx(&self) -> MutexGuard<'_, EffectsParams> {
        self.fx.lock().unwrap()
    }

    pub fn route(&self) -> MutexGuard<'_, AudioRoute> {
        self.route.lock().unwrap()
    }

    pub fn led(&self) -> MutexGuard<'_, LedConfig> {
        self.led.lock().unwrap()
    }

    pub fn rempod(&self) -> MutexGuard<'_, RemPodState> {
        self.rempod.lock().unwrap()
    }

    pub fn musicbox(&self) -> MutexGuard<'_, MusicBoxState> {
        self.musicbox.lock().unwrap()
    }

    /// Mutate the sweep record and persist it. The mutation runs on a copy:
    /// a rejected command or a failed save leaves the record untouched, so
    /// memory and disk never diverge after an error.
    pub fn update_sweep<R>(
        &self,
        f: impl FnOnce(&mut SweepState) -> Result<R, CommandError>,
    ) -> Result<R, CommandError> {
        let mut guard = self.sweep();
        let mut updated = guard.clone();
        let out = f(&mut updated)?;
        save_json(&self.paths.sweep_file(), &SweepFile::from(&updated))
            .map_err(|e| CommandError::Persist(e.to_string()))?;
        *guard = updated;
        Ok(out)
    }

    pub fn update_fx<R>(
        &self,
        f: impl FnOnce(&mut EffectsParams) -> Result<R, CommandError>,
    ) -> Result<R, CommandError> {
        let mut guard = self.fx();
        let mut updated = guard.clone();
        let out = f(&mut updated)?;
        save_json(&self.paths.fx_file(), &updated)
            .map_err(|e| CommandError::Persist(e.to_string()))?;
        *guard = updated;
        Ok(out)
    }

    pub fn update_led<R>(
        &self,
        f: impl FnOnce(&mut LedConfig) -> Result<R, CommandError>,
    ) -> Result<R, CommandError> {
        let mut guard = self.led();
        let mut updated = guard.clone();
        let out = f(&mut updated)?;
        save_json(&self.paths.led_file(), &updated)
            .map_err(|e| CommandError::Persist(e.to_string()))?;
        *guard = updated;
        Ok(out)
    }

    pub fn update_route<R>(
        &self,
        f: impl FnOnce(&mut AudioRoute) -> Result<R, CommandError>,
    ) -> Result<R, CommandError> {
        let mut guard = self.route();
        let mut updated = guard.clone();
        let out = f(&mut updated)?;
        save_json(&self.paths.route_file(), &updated)
            .map_err(|e| CommandError::Persist(e.to_string()))?;
        *guard = updated;
        Ok(out)
    }
}

impl ControlState for SharedState {
    fn snapshot(&self) -> Snapshot {
        // Per-record locks, taken one at a time; each record is internally
        // consistent, which is all the arbiter's rules need.
        let sweep_running = self.sweep().running;
        let fx = self.fx().clone();
        let route = self.route();
        Snapshot {
            sweep_running,
            fx,
            capture_device: route.capture_device.clone(),
            output_device: route.current_device.clone(),
        }
    }

    fn take_restart_flag(&self) -> bool {
        self.restart_flag.swap(false, Ordering::SeqCst)
    }

    fn flag_restart(&self) {
        self.restart_flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepbox_types::Direction;

    fn temp_state() -> (tempfile::TempDir, SharedState) {
        let dir = tempfile::tempdir().unwrap();
        let paths = BoxPaths::at(dir.path().join("config"), dir.path().join("sounds"));
        let state = SharedState::load(paths);
        (dir, state)
    }

    #[test]
    fn update_persists_and_reloads() {
        let (dir, state) = temp_state();
        state
            .update_sweep(|s| {
                s.direction = Direction::Down;
                s.speed_index = 5;
                Ok(())
            })
            .unwrap();

        let paths = BoxPaths::at(dir.path().join("config"), dir.path().join("sounds"));
        let reloaded = SharedState::load(paths);
        assert_eq!(reloaded.sweep().direction, Direction::Down);
        assert_eq!(reloaded.sweep().speed_index, 5);
    }

    #[test]
    fn failed_save_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // Using a regular file as the config "directory" makes every
        // save fail while loads still default cleanly.
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"").unwrap();
        let paths = BoxPaths::at(blocker.join("config"), dir.path().join("sounds"));
        let state = SharedState::load(paths);

        let err = state
            .update_sweep(|s| {
                s.direction = Direction::Down;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, CommandError::Persist(_)));
        assert_eq!(state.sweep().direction, Direction::Up);
    }

    #[test]
    fn restart_flag_is_consumed_once() {
        let (_dir, state) = temp_state();
        state.flag_restart();
        state.flag_restart();
        assert!(state.take_restart_flag());
        assert!(!state.take_restart_flag());
    }

    #[test]
    fn snapshot_reflects_records() {
        let (_dir, state) = temp_state();
        state.sweep().running = true;
        state.fx().enabled = true;
        state.route().current_device = "bt-sink-1".into();

        let snap = state.snapshot();
        assert!(snap.sweep_running);
        assert!(snap.fx.enabled);
        assert_eq!(snap.output_device, "bt-sink-1");
    }

    #[test]
    fn volatile_flags_never_load_true() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BoxPaths::at(dir.path().join("config"), dir.path().join("sounds"));
        {
            let state = SharedState::load(paths.clone());
            state.sweep().running = true;
            state
                .update_fx(|fx| {
                    fx.enabled = true;
                    Ok(())
                })
                .unwrap();
            state.update_sweep(|_| Ok(())).unwrap();
        }
        let reloaded = SharedState::load(paths);
        assert!(!reloaded.sweep().running);
        assert!(!reloaded.fx().enabled);
    }
}
