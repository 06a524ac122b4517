//! Audio routing: which devices the pipelines capture from and play to.

use serde::{Deserialize, Serialize};

/// Audio device routing. Device identifiers are opaque ALSA-style strings;
/// the arbiter treats any change of `current_device` as a pipeline rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRoute {
    /// Receiver capture device the continuous pipelines record from.
    pub capture_device: String,
    /// Output used when nothing else is selected.
    pub default_device: String,
    /// Output all pipelines currently bind to.
    pub current_device: String,
    /// Last selected wireless sink, if any.
    pub bt_device: Option<String>,
    /// Volatile: never restored as true across a boot.
    #[serde(default, skip_serializing)]
    pub bt_connected: bool,
}

impl Default for AudioRoute {
    fn default() -> Self {
        Self {
            capture_device: "plughw:3,0".into(),
            default_device: "plughw:3,0".into(),
            current_device: "plughw:3,0".into(),
            bt_device: None,
            bt_connected: false,
        }
    }
}
