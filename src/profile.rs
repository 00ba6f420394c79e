//! Lighting profiles: the user's steady-state colors and effect settings,
//! loaded from a JSON file.
//!
//! Every field is optional; missing fields take the defaults below.
//!
//! ```json
//! {
//!   "zones": [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 0, 255]],
//!   "speed": 2,
//!   "direction": "left",
//!   "swipe_mode": "fill",
//!   "ambient": { "fps": 30, "saturation_boost": 1.5 }
//! }
//! ```

use crate::ambient::AmbientSettings;
use crate::frame::{clamp_brightness, clamp_speed};
use crate::keymap::KeyZoneMap;
use crate::swipe::{Direction, SwipeMode};
use crate::{BoxError, Color, ZoneColors};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Read-only input to every effect driver. A driver takes its own copy when
/// it starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub zones: ZoneColors,
    /// Effect speed, 1 (slow) to 4 (fast).
    pub speed: u8,
    /// Keyboard brightness applied when the profile is loaded, 1 or 2.
    pub brightness: u8,
    pub direction: Direction,
    pub swipe_mode: SwipeMode,
    pub clean_with_black: bool,
    pub ambient: AmbientSettings,
    pub keymap: KeyZoneMap,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            zones: ZoneColors::new([
                Color::new(255, 0, 0),
                Color::new(0, 255, 0),
                Color::new(0, 0, 255),
                Color::new(255, 0, 255),
            ]),
            speed: 2,
            brightness: 2,
            direction: Direction::Left,
            swipe_mode: SwipeMode::Change,
            clean_with_black: false,
            ambient: AmbientSettings::default(),
            keymap: KeyZoneMap::default(),
        }
    }
}

impl Profile {
    /// Parse a profile. Out-of-range speed and brightness are clamped.
    pub fn from_json(json: &str) -> Result<Self, BoxError> {
        let mut profile: Self = serde_json::from_str(json)?;
        profile.speed = clamp_speed(profile.speed);
        profile.brightness = clamp_brightness(profile.brightness);
        profile.keymap.warn_suspicious();
        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self, BoxError> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read profile {}: {}", path.display(), e))?;
        let profile = Self::from_json(&json)
            .map_err(|e| format!("Invalid profile {}: {}", path.display(), e))?;
        tracing::info!("Loaded profile {}", path.display());
        Ok(profile)
    }

    /// Load `path` if given, otherwise use the built-in default.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, BoxError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
