//! Ripple effect: key presses send a wave of light outward across zones.
//!
//! Every tick (`200ms / speed`) the wavefronts move one zone:
//! - a `Left` front moves to the zone below it, a `Right` front to the zone
//!   above; fronts leaving the keyboard disappear;
//! - a `Center` zone spawns a `Left` and a `Right` front next to it and goes
//!   dark itself;
//! - any zone with a key held down is `Center` again, whatever arrived there.
//!
//! Lit zones show the profile's color for that zone.

use crate::frame::clamp_speed;
use crate::input::KeyInput;
use crate::keyboard::{Keyboard, Outcome};
use crate::pacing::FramePacer;
use crate::profile::Profile;
use crate::transport::Transport;
use crate::{CancelToken, ZONE_COUNT, ZoneColors};
use std::time::{Duration, Instant};

const BASE_TICK: Duration = Duration::from_millis(200);
/// Each tick snaps to its mask with a very short fade.
const SNAP_STEPS: u32 = 2;
const SNAP_STEP_DELAY: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RippleState {
    #[default]
    Off,
    /// A key in this zone is held down.
    Center,
    /// A wavefront moving toward zone 0.
    Left,
    /// A wavefront moving toward the last zone.
    Right,
}

/// Tick interval for a profile speed, clamped to 1-4.
pub fn tick_interval(speed: u8) -> Duration {
    BASE_TICK / u32::from(clamp_speed(speed))
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RipplePropagator {
    zones: [RippleState; ZONE_COUNT],
}

impl RipplePropagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> &[RippleState; ZONE_COUNT] {
        &self.zones
    }

    /// Move every wavefront one zone, then re-center zones with held keys.
    pub fn advance(&mut self, pressed: [bool; ZONE_COUNT]) {
        let mut next = [RippleState::Off; ZONE_COUNT];

        for (zone, state) in self.zones.iter().enumerate() {
            let spread_left = matches!(state, RippleState::Left | RippleState::Center);
            let spread_right = matches!(state, RippleState::Right | RippleState::Center);

            if spread_left && zone > 0 {
                next[zone - 1] = RippleState::Left;
            }
            if spread_right && zone + 1 < ZONE_COUNT {
                next[zone + 1] = RippleState::Right;
            }
        }

        for (state, held) in next.iter_mut().zip(pressed) {
            if held {
                *state = RippleState::Center;
            }
        }

        self.zones = next;
    }

    /// Zone colors for the current states: the profile color where a zone
    /// is lit, black elsewhere.
    pub fn mask(&self, colors: &ZoneColors) -> ZoneColors {
        let mut mask = ZoneColors::default();
        for (zone, state) in self.zones.iter().enumerate() {
            if *state != RippleState::Off {
                mask[zone] = colors[zone];
            }
        }
        mask
    }
}

/// Play the ripple effect, one tick per `tick_interval(profile.speed)`.
///
/// Runs until cancelled, or for `ticks` ticks when given. Key-state read
/// failures count as "nothing pressed" for that tick.
pub fn play<T, K>(
    keyboard: &mut Keyboard<T>,
    profile: &Profile,
    input: &mut K,
    ticks: Option<u32>,
    cancel: &CancelToken,
) where
    T: Transport,
    K: KeyInput + ?Sized,
{
    let mut propagator = RipplePropagator::new();
    let mut pacer = FramePacer::new("Ripple", tick_interval(profile.speed));
    let mut tick = 0u32;

    tracing::info!("Ripple: tick every {}ms", pacer.budget().as_millis());

    while ticks.is_none_or(|n| tick < n) {
        if cancel.is_cancelled() {
            return;
        }
        let tick_start = Instant::now();

        let pressed = match input.pressed_keys() {
            Ok(keys) => profile.keymap.pressed_zones(&keys),
            Err(e) => {
                tracing::debug!("Key state read failed: {}", e);
                [false; ZONE_COUNT]
            }
        };
        propagator.advance(pressed);

        let mask = propagator.mask(&profile.zones);
        match keyboard.transition_to(mask, SNAP_STEPS, SNAP_STEP_DELAY, cancel) {
            Outcome::Applied => {}
            Outcome::Cancelled => return,
            Outcome::Ignored => {
                tracing::warn!(
                    "Ripple needs static or breath effect, current is {:?}",
                    keyboard.frame().effect()
                );
                return;
            }
        }

        tick += 1;
        pacer.finish_frame(tick_start);
    }
}

#[cfg(test)]
mod tests {
    use super::RippleState::{Center, Left, Off, Right};
    use super::*;
    use crate::Color;
    use crate::input::UnavailableKeyInput;
    use crate::input::testing::ScriptedKeys;
    use crate::transport::testing::RecordingTransport;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const NONE: [bool; ZONE_COUNT] = [false; ZONE_COUNT];

    fn pressed(zone: usize) -> [bool; ZONE_COUNT] {
        let mut zones = NONE;
        zones[zone] = true;
        zones
    }

    #[test]
    fn single_press_spreads_then_leaves_keyboard() {
        let mut ripple = RipplePropagator::new();

        ripple.advance(pressed(1));
        assert_eq!(ripple.states(), &[Off, Center, Off, Off]);

        ripple.advance(NONE);
        assert_eq!(ripple.states(), &[Left, Off, Right, Off]);

        ripple.advance(NONE);
        assert_eq!(ripple.states(), &[Off, Off, Off, Right]);

        ripple.advance(NONE);
        assert_eq!(ripple.states(), &[Off; ZONE_COUNT]);
    }

    #[test]
    fn edge_press_only_spreads_inward() {
        let mut ripple = RipplePropagator::new();
        ripple.advance(pressed(0));
        ripple.advance(NONE);
        assert_eq!(ripple.states(), &[Off, Right, Off, Off]);

        let mut ripple = RipplePropagator::new();
        ripple.advance(pressed(3));
        ripple.advance(NONE);
        assert_eq!(ripple.states(), &[Off, Off, Left, Off]);
    }

    #[test]
    fn held_key_stays_centered_and_keeps_spawning() {
        let mut ripple = RipplePropagator::new();
        ripple.advance(pressed(2));
        ripple.advance(pressed(2));
        assert_eq!(ripple.states(), &[Off, Left, Center, Right]);

        ripple.advance(pressed(2));
        assert_eq!(ripple.states(), &[Left, Left, Center, Right]);
    }

    #[test]
    fn press_overrides_arriving_front() {
        let mut ripple = RipplePropagator::new();
        ripple.advance(pressed(0));
        ripple.advance(pressed(1));
        assert_eq!(ripple.states(), &[Off, Center, Off, Off]);
    }

    #[rstest]
    #[case(1, 200)]
    #[case(2, 100)]
    #[case(4, 50)]
    #[case(0, 200)]
    #[case(9, 50)]
    fn test_tick_interval(#[case] speed: u8, #[case] millis: u64) {
        assert_eq!(tick_interval(speed), Duration::from_millis(millis));
    }

    #[test]
    fn mask_copies_lit_zone_colors() {
        let colors = ZoneColors::new([
            Color::new(255, 0, 0),
            Color::new(0, 255, 0),
            Color::new(0, 0, 255),
            Color::new(255, 255, 0),
        ]);
        let mut ripple = RipplePropagator::new();
        ripple.advance(pressed(1));
        ripple.advance(NONE);

        assert_eq!(
            ripple.mask(&colors),
            ZoneColors::new([colors[0], Color::BLACK, colors[2], Color::BLACK])
        );
    }

    fn fast_profile() -> Profile {
        Profile {
            speed: 4,
            ..Profile::default()
        }
    }

    #[test]
    fn driver_lights_pressed_zone() {
        let transport = RecordingTransport::new();
        let mut keyboard = Keyboard::new(transport.clone());
        let profile = fast_profile();
        // KEY_Q is in zone 0
        let mut keys = ScriptedKeys::new(vec![vec![16]]);

        play(&mut keyboard, &profile, &mut keys, Some(1), &CancelToken::new());

        let mut expected = ZoneColors::default();
        expected[0] = profile.zones[0];
        assert_eq!(*keyboard.zones(), expected);
    }

    #[test]
    fn driver_wave_dies_out() {
        let transport = RecordingTransport::new();
        let mut keyboard = Keyboard::new(transport);
        let profile = fast_profile();
        let mut keys = ScriptedKeys::new(vec![vec![16]]);

        play(&mut keyboard, &profile, &mut keys, Some(5), &CancelToken::new());

        assert_eq!(*keyboard.zones(), ZoneColors::default());
    }

    #[test]
    fn driver_survives_broken_input() {
        let transport = RecordingTransport::new();
        let mut keyboard = Keyboard::new(transport.clone());

        let cancel = CancelToken::new();
        play(&mut keyboard, &fast_profile(), &mut UnavailableKeyInput, Some(2), &cancel);

        // initial + 2 ticks * (2 steps + final commit)
        assert_eq!(transport.frames().len(), 1 + 2 * 3);
        assert_eq!(*keyboard.zones(), ZoneColors::default());
    }

    #[test]
    fn driver_stops_in_firmware_effect() {
        let transport = RecordingTransport::new();
        let mut keyboard = Keyboard::new(transport.clone());
        keyboard.set_effect(crate::frame::Effect::LeftWave);
        let mut keys = ScriptedKeys::new(vec![vec![16]]);

        // Endless run: only the gate can end it.
        play(&mut keyboard, &fast_profile(), &mut keys, None, &CancelToken::new());

        // initial frame + effect change, no color pushes
        assert_eq!(transport.frames().len(), 2);
    }
}
