//! Sound library: listing and existence checks over the clip folders.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use sweepbox_types::SoundFolder;

use crate::paths::BoxPaths;

pub const SOUND_EXTENSIONS: [&str; 2] = ["wav", "mp3"];

#[derive(Clone)]
pub struct SoundLibrary {
    paths: BoxPaths,
}

impl SoundLibrary {
    pub fn new(paths: BoxPaths) -> Self {
        Self { paths }
    }

    /// Clip names in one folder, or deduplicated across the whole library.
    pub fn list(&self, folder: Option<SoundFolder>) -> Vec<String> {
        let dirs = match folder {
            Some(SoundFolder::Announcements) => vec![self.paths.announcements_dir()],
            Some(SoundFolder::Startup) => vec![self.paths.startup_dir()],
            Some(SoundFolder::RemPod) => vec![self.paths.rempod_dir()],
            Some(SoundFolder::MusicBox) => vec![self.paths.musicbox_dir()],
            None => self.paths.search_dirs(),
        };

        let mut names = BTreeSet::new();
        for dir in dirs {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() && has_sound_extension(&path) {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        names.insert(name.to_string());
                    }
                }
            }
        }
        names.into_iter().collect()
    }

    /// Whether a clip of this name exists anywhere in the library.
    pub fn exists(&self, name: &str) -> bool {
        self.paths
            .search_dirs()
            .iter()
            .any(|dir| dir.join(name).is_file())
    }
}

fn has_sound_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SOUND_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_are_filtered_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BoxPaths::at(dir.path().join("config"), dir.path().join("sounds"));
        paths.ensure_dirs().unwrap();

        fs::write(paths.startup_dir().join("b.wav"), b"").unwrap();
        fs::write(paths.startup_dir().join("notes.txt"), b"").unwrap();
        fs::write(paths.rempod_dir().join("a.mp3"), b"").unwrap();
        fs::write(paths.sounds_dir().join("b.wav"), b"").unwrap();

        let library = SoundLibrary::new(paths);
        assert_eq!(library.list(None), vec!["a.mp3", "b.wav"]);
        assert_eq!(library.list(Some(SoundFolder::RemPod)), vec!["a.mp3"]);
        assert!(library.list(Some(SoundFolder::MusicBox)).is_empty());
        assert!(library.exists("b.wav"));
        assert!(!library.exists("nope.wav"));
    }
}
