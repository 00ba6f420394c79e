//! Lighting effect engine for 4-zone RGB keyboards.
//!
//! This module provides the types every other module shares:
//! - Device configuration (which HID device to drive)
//! - The `Color` and `ZoneColors` types
//! - A cancellation token for long-running animations
//! - Signal handling for clean shutdown
//!
//! It also re-exports the frame, transition, effect driver, render and
//! server modules used by the main binary.

pub mod ambient;
pub mod capture;
pub mod fade;
pub mod frame;
pub mod input;
pub mod keyboard;
pub mod keymap;
pub mod pacing;
pub mod profile;
pub mod render;
pub mod ripple;
pub mod server;
pub mod swipe;
pub mod transition;
pub mod transport;

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Error type for fallible setup operations (device open, profile load, ...).
///
/// The lighting core itself never returns errors; see `keyboard::Outcome`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Number of independently colorable keyboard regions.
pub const ZONE_COUNT: usize = 4;

// ── Device configuration ───────────────────────────────────────────

/// Which HID device to open.
///
/// # Rust concept: derive macros
/// `Clone, Copy` make this cheaply copyable (it's just a few integers).
/// Passing it explicitly keeps device selection testable, with no hidden
/// global state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Restrict matching to one HID usage page. The controller exposes
    /// several interfaces under the same VID/PID and only the vendor page
    /// accepts lighting frames.
    pub usage_page: Option<u16>,
    /// Restrict matching to one HID usage within the usage page.
    pub usage: Option<u16>,
}

impl DeviceConfig {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            usage_page: None,
            usage: None,
        }
    }

    /// Accept any interface with the right VID/PID.
    pub fn any_interface(self) -> Self {
        Self {
            usage_page: None,
            usage: None,
            ..self
        }
    }

    /// Whether a HID interface with these identifiers is the one we want.
    pub fn matches(&self, vendor_id: u16, product_id: u16, usage_page: u16, usage: u16) -> bool {
        self.vendor_id == vendor_id
            && self.product_id == product_id
            && self.usage_page.is_none_or(|page| page == usage_page)
            && self.usage.is_none_or(|u| u == usage)
    }
}

impl Default for DeviceConfig {
    /// Lenovo 4-zone controller, lighting interface (vendor page 0xff89,
    /// usage 0x00cc).
    fn default() -> Self {
        Self {
            usage_page: Some(0xff89),
            usage: Some(0x00cc),
            ..Self::new(0x048d, 0xc993)
        }
    }
}

// ── Color ──────────────────────────────────────────────────────────

/// One RGB triple, 0-255 per channel.
///
/// Serialized as a `[r, g, b]` array so profiles and API requests stay terse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b]
    }
}

/// The color of every zone, in zone order.
///
/// On the wire this is 12 raw bytes (`r0 g0 b0 r1 g1 b1 ...`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneColors(pub [Color; ZONE_COUNT]);

impl ZoneColors {
    pub const BYTE_LEN: usize = ZONE_COUNT * 3;

    pub const fn new(zones: [Color; ZONE_COUNT]) -> Self {
        Self(zones)
    }

    /// Every zone set to the same color.
    pub const fn solid(color: Color) -> Self {
        Self([color; ZONE_COUNT])
    }

    pub fn to_bytes(&self) -> [u8; Self::BYTE_LEN] {
        let mut bytes = [0u8; Self::BYTE_LEN];
        for (chunk, c) in bytes.chunks_exact_mut(3).zip(self.0.iter()) {
            chunk.copy_from_slice(&[c.r, c.g, c.b]);
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8; Self::BYTE_LEN]) -> Self {
        let mut zones = [Color::BLACK; ZONE_COUNT];
        for (zone, chunk) in zones.iter_mut().zip(bytes.chunks_exact(3)) {
            *zone = Color::new(chunk[0], chunk[1], chunk[2]);
        }
        Self(zones)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Color> {
        self.0.iter()
    }
}

impl Index<usize> for ZoneColors {
    type Output = Color;

    fn index(&self, zone: usize) -> &Color {
        &self.0[zone]
    }
}

impl IndexMut<usize> for ZoneColors {
    fn index_mut(&mut self, zone: usize) -> &mut Color {
        &mut self.0[zone]
    }
}

// ── Cancellation ───────────────────────────────────────────────────

/// Cooperative stop signal for a running effect driver.
///
/// # Rust concept: Arc and AtomicBool
/// The token is cloned into whoever may want to stop the animation (the
/// HTTP server, the Ctrl+C handler). `Arc` shares one flag between all
/// clones; `AtomicBool` makes it safe to flip from another thread without
/// a mutex. A token never resets: to run again, make a new one.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Set up a Ctrl+C handler that cancels the returned token.
pub fn setup_signal_handler() -> Result<CancelToken, BoxError> {
    let token = CancelToken::new();
    let handler_token = token.clone(); // Clone the Arc, not the flag

    ctrlc::set_handler(move || {
        handler_token.cancel();
    })?;

    Ok(token)
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const RED: Color = Color::new(255, 0, 0);
    const GREEN: Color = Color::new(0, 255, 0);
    const BLUE: Color = Color::new(0, 0, 255);
    const YELLOW: Color = Color::new(255, 255, 0);

    #[test]
    fn device_config_default_is_legion_lighting_interface() {
        let config = DeviceConfig::default();
        assert_eq!(config.vendor_id, 0x048d);
        assert_eq!(config.product_id, 0xc993);
        assert_eq!(config.usage_page, Some(0xff89));
        assert_eq!(config.usage, Some(0x00cc));
    }

    #[rstest]
    // lighting interface
    #[case(0x048d, 0xc993, 0xff89, 0x00cc, true)]
    // keyboard and consumer-control interfaces of the same device
    #[case(0x048d, 0xc993, 0x0001, 0x0006, false)]
    #[case(0x048d, 0xc993, 0x000c, 0x0001, false)]
    #[case(0x048d, 0xc993, 0xff89, 0x0001, false)]
    // other devices
    #[case(0x048d, 0xc965, 0xff89, 0x00cc, false)]
    #[case(0x1234, 0xc993, 0xff89, 0x00cc, false)]
    fn test_default_config_matches(
        #[case] vid: u16,
        #[case] pid: u16,
        #[case] page: u16,
        #[case] usage: u16,
        #[case] expected: bool,
    ) {
        assert_eq!(DeviceConfig::default().matches(vid, pid, page, usage), expected);
    }

    #[rstest]
    #[case(0xff89, 0x00cc)]
    #[case(0x0001, 0x0006)]
    fn test_any_interface_matches_every_usage(#[case] page: u16, #[case] usage: u16) {
        let config = DeviceConfig::default().any_interface();
        assert!(config.matches(0x048d, 0xc993, page, usage));
        assert!(!config.matches(0x048d, 0xc965, page, usage));
    }

    #[test]
    fn zone_colors_bytes_are_zone_ordered_rgb() {
        let zones = ZoneColors::new([RED, GREEN, BLUE, YELLOW]);
        assert_eq!(
            zones.to_bytes(),
            [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 0]
        );
        assert_eq!(ZoneColors::from_bytes(&zones.to_bytes()), zones);
    }

    #[test]
    fn solid_fills_every_zone() {
        let zones = ZoneColors::solid(GREEN);
        assert!(zones.iter().all(|c| *c == GREEN));
    }

    #[test]
    fn color_serializes_as_array() {
        let json = serde_json::to_string(&RED).unwrap();
        assert_eq!(json, "[255,0,0]");
        let back: Color = serde_json::from_str("[0,0,255]").unwrap();
        assert_eq!(back, BLUE);
    }

    #[test]
    fn zone_colors_deserialize_from_nested_arrays() {
        let zones: ZoneColors =
            serde_json::from_str("[[255,0,0],[0,255,0],[0,0,255],[255,255,0]]").unwrap();
        assert_eq!(zones, ZoneColors::new([RED, GREEN, BLUE, YELLOW]));
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
