//! Filesystem layout: config records and the sound library.

use std::path::PathBuf;

/// Resolved locations for config files and sound folders.
///
/// Defaults to `~/.config/sweepbox`; `SWEEPBOX_CONFIG_DIR` and
/// `SWEEPBOX_SOUNDS_DIR` override for tests and non-standard installs.
#[derive(Debug, Clone)]
pub struct BoxPaths {
    config_dir: PathBuf,
    sounds_dir: PathBuf,
}

impl BoxPaths {
    pub fn resolve() -> Self {
        let config_dir = std::env::var_os("SWEEPBOX_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("sweepbox")
            });
        let sounds_dir = std::env::var_os("SWEEPBOX_SOUNDS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("sounds"));
        Self {
            config_dir,
            sounds_dir,
        }
    }

    /// Explicit roots, for tests.
    pub fn at(config_dir: PathBuf, sounds_dir: PathBuf) -> Self {
        Self {
            config_dir,
            sounds_dir,
        }
    }

    pub fn sweep_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    pub fn fx_file(&self) -> PathBuf {
        self.config_dir.join("fx.json")
    }

    pub fn led_file(&self) -> PathBuf {
        self.config_dir.join("led.json")
    }

    pub fn route_file(&self) -> PathBuf {
        self.config_dir.join("audio.json")
    }

    pub fn sounds_dir(&self) -> &PathBuf {
        &self.sounds_dir
    }

    pub fn announcements_dir(&self) -> PathBuf {
        self.sounds_dir.join("Announcements")
    }

    pub fn startup_dir(&self) -> PathBuf {
        self.sounds_dir.join("Startup")
    }

    pub fn rempod_dir(&self) -> PathBuf {
        self.sounds_dir.join("RemPod")
    }

    pub fn musicbox_dir(&self) -> PathBuf {
        self.sounds_dir.join("MusicBox")
    }

    /// Clip lookup order: specific folders first, library root last.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.announcements_dir(),
            self.startup_dir(),
            self.rempod_dir(),
            self.musicbox_dir(),
            self.sounds_dir.clone(),
        ]
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        for dir in self.search_dirs() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
