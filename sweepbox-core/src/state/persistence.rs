//! JSON record files: tolerant loads, explicit saves.

use std::fs;
use std::io;
use std::path::Path;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Load a record, falling back to `None` on a missing, unreadable, or
/// malformed file. A corrupt config must never keep the daemon from booting.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        return None;
    }
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(target: "config", "could not read {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(target: "config", "ignoring malformed {}: {}", path.display(), e);
            None
        }
    }
}

/// Write a record as pretty JSON, creating parent directories as needed.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Rec {
        value: u32,
    }

    #[test]
    fn roundtrip_and_tolerant_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rec.json");

        assert_eq!(load_json::<Rec>(&path), None);

        save_json(&path, &Rec { value: 7 }).unwrap();
        assert_eq!(load_json::<Rec>(&path), Some(Rec { value: 7 }));

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_json::<Rec>(&path), None);
    }
}
