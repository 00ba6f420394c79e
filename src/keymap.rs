//! Key-to-zone mapping: which keyboard zone a physical key lights up.
//!
//! Key codes are Linux input event codes (`KEY_*` in
//! `linux/input-event-codes.h`), which is what the evdev key input reports.
//! The table is an ordered list of inclusive code ranges; the first range
//! containing a code wins. Codes outside every range belong to no zone.

use crate::ZONE_COUNT;
use serde::{Deserialize, Serialize};

/// Inclusive range of key codes mapped to one zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct KeyRange {
    pub first: u16,
    pub last: u16,
    pub zone: usize,
}

impl KeyRange {
    pub const fn new(first: u16, last: u16, zone: usize) -> Self {
        Self { first, last, zone }
    }

    pub fn contains(&self, code: u16) -> bool {
        self.first <= code && code <= self.last
    }

    /// A range that can never match anything, or points at a missing zone.
    pub fn is_suspicious(&self) -> bool {
        self.first > self.last || self.zone >= ZONE_COUNT
    }
}

/// Laptop 4-zone layout: left half of the main block, right half,
/// navigation cluster, numeric keypad.
const DEFAULT_RANGES: &[KeyRange] = &[
    // Zone 0: Esc, 1-5, Tab, Q-T, LeftCtrl, A-G, `, LeftShift, Z-B, LeftAlt, CapsLock, F1-F4
    KeyRange::new(1, 6, 0),
    KeyRange::new(15, 20, 0),
    KeyRange::new(29, 34, 0),
    KeyRange::new(41, 42, 0),
    KeyRange::new(44, 48, 0),
    KeyRange::new(56, 56, 0),
    KeyRange::new(58, 62, 0),
    KeyRange::new(125, 125, 0), // LeftMeta
    // Zone 1: 6-0, -, =, Backspace, Y-P, [, ], Enter, H-L, ;, ', \, N-/, RightShift, Space
    KeyRange::new(7, 14, 1),
    KeyRange::new(21, 28, 1),
    KeyRange::new(35, 40, 1),
    KeyRange::new(43, 43, 1),
    KeyRange::new(49, 54, 1),
    KeyRange::new(57, 57, 1),
    KeyRange::new(63, 68, 1), // F5-F10
    KeyRange::new(87, 88, 1), // F11, F12
    KeyRange::new(97, 97, 1), // RightCtrl
    KeyRange::new(100, 100, 1), // RightAlt
    // Zone 2: SysRq, Home..Delete, arrows
    KeyRange::new(99, 99, 2),
    KeyRange::new(102, 111, 2),
    // Zone 3: keypad
    KeyRange::new(55, 55, 3),
    KeyRange::new(69, 69, 3),
    KeyRange::new(71, 83, 3),
    KeyRange::new(96, 96, 3),
    KeyRange::new(98, 98, 3),
];

/// Static partition of key codes into zones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyZoneMap {
    ranges: Vec<KeyRange>,
}

impl Default for KeyZoneMap {
    fn default() -> Self {
        Self::new(DEFAULT_RANGES.to_vec())
    }
}

impl KeyZoneMap {
    pub fn new(ranges: Vec<KeyRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[KeyRange] {
        &self.ranges
    }

    /// Zone a key belongs to, if any.
    pub fn zone_of(&self, code: u16) -> Option<usize> {
        self.ranges
            .iter()
            .find(|r| r.contains(code) && r.zone < ZONE_COUNT)
            .map(|r| r.zone)
    }

    /// Which zones have at least one of `pressed` mapped to them.
    pub fn pressed_zones<'a>(
        &self,
        pressed: impl IntoIterator<Item = &'a u16>,
    ) -> [bool; ZONE_COUNT] {
        let mut zones = [false; ZONE_COUNT];
        for zone in pressed.into_iter().filter_map(|&code| self.zone_of(code)) {
            zones[zone] = true;
        }
        zones
    }

    /// Ranges that look like mistakes (reversed bounds, unknown zone).
    ///
    /// They are kept as configured, never "fixed" here.
    pub fn suspicious_ranges(&self) -> Vec<KeyRange> {
        self.ranges.iter().copied().filter(KeyRange::is_suspicious).collect()
    }

    /// Log every suspicious range once, at load time.
    pub fn warn_suspicious(&self) {
        for range in self.suspicious_ranges() {
            tracing::warn!(
                "Key range {}..={} -> zone {} can never match",
                range.first,
                range.last,
                range.zone
            );
        }
    }
}
