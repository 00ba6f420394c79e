//! Lighting frame: the full state pushed to the keyboard in one update,
//! and its 33-byte feature-report encoding.
//!
//! The payload layout is fixed by the keyboard controller firmware:
//!
//! | byte    | content |
//! |---------|---------|
//! | 0       | `0xCC` frame marker |
//! | 1       | `0x16` command id |
//! | 2       | effect code |
//! | 3       | speed (1-4) |
//! | 4       | brightness (1-2) |
//! | 5..17   | 12 zone color bytes (Static/Breath only) |
//! | 18      | wave direction flag: right |
//! | 19      | wave direction flag: left |

use crate::ZoneColors;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const PAYLOAD_LEN: usize = 33;

pub const SPEED_RANGE: RangeInclusive<u8> = 1..=4;
pub const BRIGHTNESS_RANGE: RangeInclusive<u8> = 1..=2;

const FRAME_MARKER: u8 = 0xcc;
const COMMAND_ID: u8 = 0x16;
const COLOR_OFFSET: usize = 5;
const RIGHT_WAVE_FLAG: usize = 18;
const LEFT_WAVE_FLAG: usize = 19;

/// Device-level animation behavior.
///
/// Only `Static` and `Breath` show the per-zone colors; the other modes
/// are animated by the keyboard firmware itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    #[default]
    Static,
    Breath,
    Smooth,
    LeftWave,
    RightWave,
}

impl Effect {
    /// Whether software controls zone colors in this mode.
    pub fn uses_zone_colors(self) -> bool {
        matches!(self, Effect::Static | Effect::Breath)
    }

    fn code(self) -> u8 {
        match self {
            Effect::Static => 0x01,
            Effect::Breath => 0x03,
            Effect::Smooth => 0x06,
            Effect::LeftWave | Effect::RightWave => 0x04,
        }
    }
}

pub fn clamp_speed(speed: u8) -> u8 {
    speed.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end())
}

pub fn clamp_brightness(brightness: u8) -> u8 {
    brightness.clamp(*BRIGHTNESS_RANGE.start(), *BRIGHTNESS_RANGE.end())
}

/// Authoritative lighting state of one keyboard.
///
/// Speed and brightness are clamped on the way in, so a frame is always
/// encodable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightingFrame {
    effect: Effect,
    speed: u8,
    brightness: u8,
    zones: ZoneColors,
}

impl Default for LightingFrame {
    fn default() -> Self {
        Self {
            effect: Effect::Static,
            speed: 1,
            brightness: 1,
            zones: ZoneColors::default(),
        }
    }
}

impl LightingFrame {
    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn zones(&self) -> &ZoneColors {
        &self.zones
    }

    pub(crate) fn set_effect(&mut self, effect: Effect) {
        self.effect = effect;
    }

    pub(crate) fn set_speed(&mut self, speed: u8) {
        self.speed = clamp_speed(speed);
    }

    pub(crate) fn set_brightness(&mut self, brightness: u8) {
        self.brightness = clamp_brightness(brightness);
    }

    pub(crate) fn zones_mut(&mut self) -> &mut ZoneColors {
        &mut self.zones
    }

    /// Encode into the feature report the controller expects.
    pub fn encode(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = FRAME_MARKER;
        payload[1] = COMMAND_ID;
        payload[2] = self.effect.code();
        payload[3] = self.speed;
        payload[4] = self.brightness;

        match self.effect {
            Effect::LeftWave => payload[LEFT_WAVE_FLAG] = 0x01,
            Effect::RightWave => payload[RIGHT_WAVE_FLAG] = 0x01,
            _ => {}
        }

        if self.effect.uses_zone_colors() {
            payload[COLOR_OFFSET..COLOR_OFFSET + ZoneColors::BYTE_LEN]
                .copy_from_slice(&self.zones.to_bytes());
        }

        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn frame_with(effect: Effect) -> LightingFrame {
        let mut frame = LightingFrame::default();
        frame.set_effect(effect);
        frame.set_speed(3);
        frame.set_brightness(2);
        *frame.zones_mut() = ZoneColors::new([
            Color::new(1, 2, 3),
            Color::new(4, 5, 6),
            Color::new(7, 8, 9),
            Color::new(10, 11, 12),
        ]);
        frame
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(4, 4)]
    #[case(5, 4)]
    #[case(255, 4)]
    fn test_clamp_speed(#[case] input: u8, #[case] expected: u8) {
        assert_eq!(clamp_speed(input), expected);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 2)]
    fn test_clamp_brightness(#[case] input: u8, #[case] expected: u8) {
        assert_eq!(clamp_brightness(input), expected);
    }

    #[test]
    fn static_frame_layout() {
        let payload = frame_with(Effect::Static).encode();

        let mut expected = [0u8; PAYLOAD_LEN];
        expected[..17].copy_from_slice(&[
            0xcc, 0x16, 0x01, 3, 2, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
        ]);
        assert_eq!(payload, expected);
    }

    #[test]
    fn breath_frame_carries_colors() {
        let payload = frame_with(Effect::Breath).encode();
        assert_eq!(payload[2], 0x03);
        assert_eq!(&payload[5..17], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[rstest]
    #[case(Effect::Smooth, 0x06, 0, 0)]
    #[case(Effect::LeftWave, 0x04, 0, 1)]
    #[case(Effect::RightWave, 0x04, 1, 0)]
    fn test_firmware_effects_omit_colors(
        #[case] effect: Effect,
        #[case] code: u8,
        #[case] right_flag: u8,
        #[case] left_flag: u8,
    ) {
        let payload = frame_with(effect).encode();
        assert_eq!(payload[2], code);
        assert_eq!(payload[3], 3);
        assert_eq!(payload[4], 2);
        assert_eq!(&payload[5..17], &[0u8; 12]);
        assert_eq!(payload[18], right_flag);
        assert_eq!(payload[19], left_flag);
    }

    #[test]
    fn setters_clamp_before_commit() {
        let mut frame = LightingFrame::default();
        frame.set_speed(9);
        frame.set_brightness(0);
        assert_eq!(frame.speed(), 4);
        assert_eq!(frame.brightness(), 1);
    }

    #[test]
    fn effect_names_are_snake_case() {
        let json = serde_json::to_string(&Effect::LeftWave).unwrap();
        assert_eq!(json, "\"left_wave\"");
    }
}
